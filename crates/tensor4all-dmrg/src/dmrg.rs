//! Two-site DMRG sweep engine
//!
//! [`Dmrg`] owns the ansatz, the operator and the environment array, and
//! drives the sweep schedule:
//!
//! 1. Bring the initial MPS into left-canonical form and build `LR[1..N-1]`.
//! 2. Repeat `num_sweeps + 1` times: a right-to-left half sweep over bonds
//!    `N-2, ..., 0` followed by a left-to-right half sweep over `0, ..., N-2`.
//!    Each bond is one local update followed by one environment update.
//! 3. At the end of each half sweep, re-isometrize the terminal site.
//!
//! Every local update appends its Ritz value to the energy log, so a full
//! run logs `2 (N - 1) (num_sweeps + 1)` energies.
//!
//! # Example
//!
//! ```ignore
//! use tensor4all_dmrg::{Dmrg, DmrgOptions, Mpo};
//!
//! let mpo = Mpo::xx_chain(20)?;
//! let result = Dmrg::new(mpo, DmrgOptions::default())?.run()?;
//! println!("E0 = {}", result.energy);
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::decomposition::{absorb_into_left_bond, left_isometry, left_orthogonalize, right_isometry};
use crate::environment::{expectation_value, Environments};
use crate::error::{DmrgError, Result};
use crate::mpo::Mpo;
use crate::mps::Mps;
use crate::options::DmrgOptions;
use crate::projector::EffectiveHamiltonian;
use crate::types::Tensor3Ops;
use crate::update::{update_two_site, SweepDirection};

/// Record of one local update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Double-sweep index, starting at 1
    pub sweep: usize,
    /// Direction of the half sweep
    pub direction: SweepDirection,
    /// Bond `p`; the update acted on sites `p` and `p + 1`
    pub bond: usize,
    /// Lowest Ritz value of the local problem
    pub energy: f64,
    /// Retained bond dimension after truncation
    pub bond_dim: usize,
    /// Truncated weight
    pub discarded: f64,
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct DmrgResult {
    /// Final state; left-canonical with unit norm
    pub mps: Mps,
    /// Energy after every local update, in update order
    pub energies: Vec<f64>,
    /// One report per local update, parallel to `energies`
    pub reports: Vec<UpdateReport>,
    /// Last logged energy
    pub energy: f64,
}

/// Bonds visited by a half sweep on a chain of `n_sites` sites.
pub fn sweep_bonds(n_sites: usize, direction: SweepDirection) -> Vec<usize> {
    let n_bonds = n_sites.saturating_sub(1);
    match direction {
        SweepDirection::RightToLeft => (0..n_bonds).rev().collect(),
        SweepDirection::LeftToRight => (0..n_bonds).collect(),
    }
}

/// Two-site DMRG engine for the ground state of an MPO.
#[derive(Debug, Clone)]
pub struct Dmrg {
    mpo: Mpo,
    mps: Mps,
    envs: Environments,
    options: DmrgOptions,
    energies: Vec<f64>,
    reports: Vec<UpdateReport>,
    sweep: usize,
}

impl Dmrg {
    /// Create an engine starting from a random MPS drawn with `options.seed`.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] for invalid options (see
    /// [`DmrgOptions::validate`]) or a Krylov dimension larger than some
    /// local two-site space.
    pub fn new(mpo: Mpo, options: DmrgOptions) -> Result<Self> {
        options.validate(mpo.len())?;
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let mps = Mps::random(&mpo.site_dims(), options.max_bond_dim, &mut rng)?;
        Self::with_initial_state(mpo, mps, options)
    }

    /// Create an engine starting from a given MPS.
    ///
    /// The MPS is left-canonicalized (without truncation) and normalized
    /// before the first sweep.
    ///
    /// # Errors
    /// Returns [`DmrgError::LengthMismatch`] or
    /// [`DmrgError::DimensionMismatch`] if the MPS does not fit the MPO, and
    /// [`DmrgError::InvalidConfig`] as in [`Dmrg::new`].
    pub fn with_initial_state(mpo: Mpo, mps: Mps, options: DmrgOptions) -> Result<Self> {
        options.validate(mpo.len())?;
        if mps.len() != mpo.len() {
            return Err(DmrgError::LengthMismatch {
                expected: mpo.len(),
                got: mps.len(),
            });
        }
        for (i, tensor) in mps.site_tensors().iter().enumerate() {
            DmrgError::check_dim("initial state: site", mpo.site_dim(i), tensor.site_dim())?;
        }

        let envs = Environments::new(&mpo);
        let mut engine = Self {
            mpo,
            mps,
            envs,
            options,
            energies: Vec::new(),
            reports: Vec::new(),
            sweep: 0,
        };
        engine.left_canonicalize()?;
        engine.check_krylov_dim()?;
        Ok(engine)
    }

    fn left_canonicalize(&mut self) -> Result<()> {
        let n = self.mps.len();
        for p in 0..n - 1 {
            let (u, rest) = left_orthogonalize(self.mps.site_tensor(p))?;
            let next = absorb_into_left_bond(&rest, self.mps.site_tensor(p + 1))?;
            self.mps.set_site_tensor(p, u);
            self.mps.set_site_tensor(p + 1, next);
            self.envs.invalidate_site(p);
            self.envs.invalidate_site(p + 1);
            self.envs.update_left(p, self.mps.site_tensor(p), &self.mpo)?;
        }
        let last = left_isometry(self.mps.site_tensor(n - 1))?;
        self.mps.set_site_tensor(n - 1, last);
        self.envs.invalidate_site(n - 1);
        Ok(())
    }

    fn check_krylov_dim(&self) -> Result<()> {
        let krylov_dim = self.options.lanczos.krylov_dim;
        for p in 0..self.mps.len() - 1 {
            let a = self.mps.site_tensor(p);
            let b = self.mps.site_tensor(p + 1);
            let local_dim = a.left_dim() * a.site_dim() * b.site_dim() * b.right_dim();
            if krylov_dim > local_dim {
                return Err(DmrgError::invalid_config(format!(
                    "Krylov subspace dimension {} exceeds the two-site dimension {} at bond {}",
                    krylov_dim, local_dim, p
                )));
            }
        }
        Ok(())
    }

    /// Optimize bond `bond` and update the environment behind it.
    ///
    /// For [`SweepDirection::RightToLeft`] the right site becomes
    /// right-isometric and `LR[bond + 1]` is rebuilt from `LR[bond + 2]`;
    /// for [`SweepDirection::LeftToRight`] the left site becomes
    /// left-isometric and `LR[bond + 1]` is rebuilt from `LR[bond]`.
    ///
    /// # Errors
    /// Returns [`DmrgError::StaleEnvironment`] unless `LR[bond]` is a valid
    /// left environment and `LR[bond + 2]` a valid right environment, as after
    /// the previous update of a half sweep in the same direction. Nothing is
    /// logged or changed in that case.
    pub fn local_update(&mut self, bond: usize, direction: SweepDirection) -> Result<UpdateReport> {
        let (left_env, right_env) = self.envs.bond(bond)?;
        let op = EffectiveHamiltonian::new(
            left_env,
            self.mpo.site_tensor(bond),
            self.mpo.site_tensor(bond + 1),
            right_env,
        )?;
        let update = update_two_site(
            self.mps.site_tensor(bond),
            self.mps.site_tensor(bond + 1),
            &op,
            direction,
            self.options.max_bond_dim,
            &self.options.lanczos,
        )?;

        let report = UpdateReport {
            sweep: self.sweep,
            direction,
            bond,
            energy: update.energy,
            bond_dim: update.bond_dim(),
            discarded: update.discarded,
        };

        self.mps.set_site_tensor(bond, update.left);
        self.mps.set_site_tensor(bond + 1, update.right);
        self.envs.invalidate_site(bond);
        self.envs.invalidate_site(bond + 1);
        match direction {
            SweepDirection::RightToLeft => {
                self.envs
                    .update_right(bond + 1, self.mps.site_tensor(bond + 1), &self.mpo)?;
            }
            SweepDirection::LeftToRight => {
                self.envs
                    .update_left(bond, self.mps.site_tensor(bond), &self.mpo)?;
            }
        }

        debug!(
            sweep = report.sweep,
            direction = %direction,
            bond,
            energy = report.energy,
            bond_dim = report.bond_dim,
            discarded = report.discarded,
            "local update"
        );
        self.energies.push(report.energy);
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Run one half sweep and re-isometrize the terminal site.
    pub fn half_sweep(&mut self, direction: SweepDirection) -> Result<()> {
        let n = self.mps.len();
        for bond in sweep_bonds(n, direction) {
            self.local_update(bond, direction)?;
        }
        match direction {
            SweepDirection::RightToLeft => {
                let first = right_isometry(self.mps.site_tensor(0))?;
                self.mps.set_site_tensor(0, first);
                self.envs.invalidate_site(0);
            }
            SweepDirection::LeftToRight => {
                let last = left_isometry(self.mps.site_tensor(n - 1))?;
                self.mps.set_site_tensor(n - 1, last);
                self.envs.invalidate_site(n - 1);
            }
        }
        info!(
            sweep = self.sweep,
            direction = %direction,
            energy = self.energies.last().copied().unwrap_or(f64::NAN),
            max_bond_dim = self.mps.max_bond_dim(),
            "half sweep finished"
        );
        Ok(())
    }

    /// Run one double sweep: right-to-left, then left-to-right.
    pub fn double_sweep(&mut self) -> Result<()> {
        self.sweep += 1;
        self.half_sweep(SweepDirection::RightToLeft)?;
        self.half_sweep(SweepDirection::LeftToRight)
    }

    /// Run `num_sweeps + 1` double sweeps and return the result.
    pub fn run(mut self) -> Result<DmrgResult> {
        for _ in 0..self.options.double_sweeps() {
            self.double_sweep()?;
        }
        let energy = match self.energies.last() {
            Some(&e) => e,
            None => expectation_value(&self.mps, &self.mpo)?,
        };
        Ok(DmrgResult {
            mps: self.mps,
            energies: self.energies,
            reports: self.reports,
            energy,
        })
    }

    /// Current state
    pub fn mps(&self) -> &Mps {
        &self.mps
    }

    /// The operator being minimized
    pub fn mpo(&self) -> &Mpo {
        &self.mpo
    }

    /// Current environment array
    pub fn environments(&self) -> &Environments {
        &self.envs
    }

    /// Options of this run
    pub fn options(&self) -> &DmrgOptions {
        &self.options
    }

    /// Energies logged so far
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Energy logged by local update number `step` (0-based)
    pub fn energy_at(&self, step: usize) -> Option<f64> {
        self.energies.get(step).copied()
    }

    /// Reports of the local updates so far
    pub fn reports(&self) -> &[UpdateReport] {
        &self.reports
    }

    /// Number of double sweeps started so far
    pub fn sweeps_started(&self) -> usize {
        self.sweep
    }

    /// `<psi|H|psi> / <psi|psi>` of the current state
    pub fn energy(&self) -> Result<f64> {
        expectation_value(&self.mps, &self.mpo)
    }
}
