//! Left and right environments of a sweep
//!
//! A single array `LR` of length `N + 1` holds both kinds of environment.
//! `LR[0]` and `LR[N]` are the fixed boundaries built from the MPO channels.
//! Slot `k` with `0 < k < N` is the environment of bond `k` (between sites
//! `k-1` and `k`): a left environment while the sweep moves right and a right
//! environment while it moves left. For the two-site problem on bond `p` the
//! engine reads `LR[p]` (left) and `LR[p+2]` (right).
//!
//! Each slot is tagged with the side it holds. Changing a site tensor clears
//! the tags of every slot that contracted it, so a bond can only be read from
//! environments that match the current state.

use crate::contraction::{extend_left, extend_right};
use crate::error::{DmrgError, Result};
use crate::mpo::Mpo;
use crate::mps::Mps;
use crate::types::{Environment, Tensor3};

/// Which half of the chain an environment slot summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentSide {
    /// Contraction of the sites to the left of the slot
    Left,
    /// Contraction of the sites to the right of the slot
    Right,
}

impl EnvironmentSide {
    /// Lower-case name, used in error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Environment array `LR[0..=N]` for one MPS/MPO pair.
///
/// Every slot carries the side it currently summarizes, or nothing if it
/// has not been computed or a site it depends on has changed since.
#[derive(Debug, Clone)]
pub struct Environments {
    blocks: Vec<Environment>,
    sides: Vec<Option<EnvironmentSide>>,
}

impl Environments {
    /// Create the array with its two boundaries set.
    ///
    /// Interior slots hold placeholders until they are computed with
    /// [`Environments::update_left`] or [`Environments::update_right`].
    pub fn new(mpo: &Mpo) -> Self {
        let n = mpo.len();
        let mut blocks = Vec::with_capacity(n + 1);
        let mut sides = vec![None; n + 1];
        blocks.push(mpo.left_boundary());
        for _ in 1..n {
            blocks.push(Environment::from_elem([1, 1, 1], 0.0));
        }
        blocks.push(mpo.right_boundary());
        sides[0] = Some(EnvironmentSide::Left);
        sides[n] = Some(EnvironmentSide::Right);
        Self { blocks, sides }
    }

    /// Number of sites `N` (the array has `N + 1` slots)
    pub fn n_sites(&self) -> usize {
        self.blocks.len() - 1
    }

    /// Environment in slot `k`
    pub fn get(&self, k: usize) -> &Environment {
        &self.blocks[k]
    }

    /// Side summarized by slot `k`, or `None` if the slot is not valid
    pub fn side(&self, k: usize) -> Option<EnvironmentSide> {
        self.sides[k]
    }

    /// Left and right environments of the two-site problem on bond `p`
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidBond`] for `p + 1 >= N` and
    /// [`DmrgError::StaleEnvironment`] unless `LR[p]` holds a valid left
    /// environment and `LR[p + 2]` a valid right environment.
    pub fn bond(&self, p: usize) -> Result<(&Environment, &Environment)> {
        if p + 1 >= self.n_sites() {
            return Err(DmrgError::InvalidBond {
                bond: p,
                n_sites: self.n_sites(),
            });
        }
        self.expect_side(p, EnvironmentSide::Left)?;
        self.expect_side(p + 2, EnvironmentSide::Right)?;
        Ok((&self.blocks[p], &self.blocks[p + 2]))
    }

    fn expect_side(&self, slot: usize, side: EnvironmentSide) -> Result<()> {
        if self.sides[slot] == Some(side) {
            Ok(())
        } else {
            Err(DmrgError::StaleEnvironment {
                slot,
                expected: side.as_str(),
            })
        }
    }

    /// Drop every interior slot that contracts the tensor at `site`.
    ///
    /// Left slots `k > site` and right slots `k <= site` are marked invalid;
    /// the stored tensors are kept until they are recomputed.
    pub fn invalidate_site(&mut self, site: usize) {
        let n = self.n_sites();
        for k in 1..n {
            let stale = match self.sides[k] {
                Some(EnvironmentSide::Left) => k > site,
                Some(EnvironmentSide::Right) => k <= site,
                None => false,
            };
            if stale {
                self.sides[k] = None;
            }
        }
    }

    /// Set `LR[site + 1]` from `LR[site]` and the left-isometric tensor at `site`.
    ///
    /// # Errors
    /// Returns [`DmrgError::StaleEnvironment`] if `LR[site]` is not a valid
    /// left environment.
    pub fn update_left(&mut self, site: usize, tensor: &Tensor3<f64>, mpo: &Mpo) -> Result<()> {
        if site >= self.n_sites() {
            return Err(DmrgError::InvalidBond {
                bond: site,
                n_sites: self.n_sites(),
            });
        }
        self.expect_side(site, EnvironmentSide::Left)?;
        self.blocks[site + 1] = extend_left(&self.blocks[site], tensor, mpo.site_tensor(site))?;
        self.sides[site + 1] = Some(EnvironmentSide::Left);
        Ok(())
    }

    /// Set `LR[site]` from `LR[site + 1]` and the right-isometric tensor at `site`.
    ///
    /// # Errors
    /// Returns [`DmrgError::StaleEnvironment`] if `LR[site + 1]` is not a
    /// valid right environment.
    pub fn update_right(&mut self, site: usize, tensor: &Tensor3<f64>, mpo: &Mpo) -> Result<()> {
        if site >= self.n_sites() {
            return Err(DmrgError::InvalidBond {
                bond: site,
                n_sites: self.n_sites(),
            });
        }
        self.expect_side(site + 1, EnvironmentSide::Right)?;
        self.blocks[site] = extend_right(&self.blocks[site + 1], tensor, mpo.site_tensor(site))?;
        self.sides[site] = Some(EnvironmentSide::Right);
        Ok(())
    }
}

/// Contract `LR[0]` with sites `0..k` of the chain, giving the left
/// environment of bond `k`.
pub fn left_environment(mps: &Mps, mpo: &Mpo, k: usize) -> Result<Environment> {
    check_lengths(mps, mpo)?;
    let mut env = mpo.left_boundary();
    for site in 0..k.min(mps.len()) {
        env = extend_left(&env, mps.site_tensor(site), mpo.site_tensor(site))?;
    }
    Ok(env)
}

/// Contract `LR[N]` with sites `k..N` of the chain, giving the right
/// environment of bond `k`.
pub fn right_environment(mps: &Mps, mpo: &Mpo, k: usize) -> Result<Environment> {
    check_lengths(mps, mpo)?;
    let mut env = mpo.right_boundary();
    for site in (k..mps.len()).rev() {
        env = extend_right(&env, mps.site_tensor(site), mpo.site_tensor(site))?;
    }
    Ok(env)
}

/// `<psi|H|psi> / <psi|psi>` for the full chain.
pub fn expectation_value(mps: &Mps, mpo: &Mpo) -> Result<f64> {
    let full = left_environment(mps, mpo, mps.len())?;
    let numerator = full[[0, mpo.end_channel(), 0]];
    Ok(numerator / mps.norm_squared())
}

fn check_lengths(mps: &Mps, mpo: &Mpo) -> Result<()> {
    if mps.len() != mpo.len() {
        return Err(DmrgError::LengthMismatch {
            expected: mpo.len(),
            got: mps.len(),
        });
    }
    Ok(())
}
