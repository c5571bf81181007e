//! Matrix product states
//!
//! An [`Mps`] is a chain of [`Tensor3`] site tensors `(left, site, right)`
//! with trivial outer bonds (`left_dim` of site 0 and `right_dim` of the
//! last site are 1).

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::backend::matmul;
use crate::error::{DmrgError, Result};
use crate::types::{tensor3_zeros, Matrix2, Tensor3, Tensor3Ops};

/// A matrix product state on an open chain.
#[derive(Debug, Clone)]
pub struct Mps {
    tensors: Vec<Tensor3<f64>>,
}

impl Mps {
    /// Create an MPS from site tensors.
    ///
    /// # Errors
    /// Returns an error if the chain is empty, an outer bond is not 1, or
    /// adjacent bond dimensions differ.
    pub fn new(tensors: Vec<Tensor3<f64>>) -> Result<Self> {
        let (first, last) = match (tensors.first(), tensors.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DmrgError::invalid_config("MPS must have at least one site")),
        };
        DmrgError::check_dim("mps: left boundary", 1, first.left_dim())?;
        DmrgError::check_dim("mps: right boundary", 1, last.right_dim())?;
        for pair in tensors.windows(2) {
            DmrgError::check_dim("mps: bond", pair[0].right_dim(), pair[1].left_dim())?;
        }
        Ok(Self { tensors })
    }

    /// Random MPS with standard-normal entries.
    ///
    /// Bond `k` (to the right of site `k`) has dimension
    /// `min(max_bond_dim, r_{k-1} * d_k, d_{k+1} * ... * d_{N-1})` with
    /// `r_{-1} = 1`, so no bond exceeds what either side can support.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] for an empty chain, a zero site
    /// dimension, or `max_bond_dim == 0`.
    pub fn random<R: Rng + ?Sized>(
        site_dims: &[usize],
        max_bond_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if site_dims.is_empty() {
            return Err(DmrgError::invalid_config("MPS must have at least one site"));
        }
        if site_dims.contains(&0) {
            return Err(DmrgError::invalid_config("Site dimensions must be positive"));
        }
        if max_bond_dim == 0 {
            return Err(DmrgError::invalid_config("Bond dimension cap must be positive"));
        }

        let mut tensors = Vec::with_capacity(site_dims.len());
        let mut left_dim: usize = 1;
        for (k, &d) in site_dims.iter().enumerate() {
            let remaining = site_dims[k + 1..]
                .iter()
                .fold(1usize, |acc, &dj| acc.saturating_mul(dj));
            let right_dim = max_bond_dim
                .min(left_dim.saturating_mul(d))
                .min(remaining);
            let tensor: Tensor3<f64> = Tensor3::from_fn([left_dim, d, right_dim], |_| {
                StandardNormal.sample(&mut *rng)
            });
            tensors.push(tensor);
            left_dim = right_dim;
        }
        Ok(Self { tensors })
    }

    /// Product state with every site in basis state `states[i]`.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] if a state index is out of range.
    pub fn product_state(site_dims: &[usize], states: &[usize]) -> Result<Self> {
        if site_dims.len() != states.len() {
            return Err(DmrgError::LengthMismatch {
                expected: site_dims.len(),
                got: states.len(),
            });
        }
        let mut tensors = Vec::with_capacity(site_dims.len());
        for (&d, &s) in site_dims.iter().zip(states) {
            if s >= d {
                return Err(DmrgError::invalid_config(format!(
                    "Basis state {} out of range for site dimension {}",
                    s, d
                )));
            }
            let mut t = tensor3_zeros(1, d, 1);
            t.set3(0, s, 0, 1.0);
            tensors.push(t);
        }
        Self::new(tensors)
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the chain is empty (never true for a constructed MPS)
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Site tensor at `i`
    pub fn site_tensor(&self, i: usize) -> &Tensor3<f64> {
        &self.tensors[i]
    }

    /// All site tensors
    pub fn site_tensors(&self) -> &[Tensor3<f64>] {
        &self.tensors
    }

    /// Replace the site tensor at `i`
    pub fn set_site_tensor(&mut self, i: usize, tensor: Tensor3<f64>) {
        self.tensors[i] = tensor;
    }

    /// Physical dimensions of all sites
    pub fn site_dims(&self) -> Vec<usize> {
        self.tensors.iter().map(|t| t.site_dim()).collect()
    }

    /// Bond dimensions between adjacent sites (length `N - 1`)
    pub fn bond_dims(&self) -> Vec<usize> {
        self.tensors
            .iter()
            .take(self.len().saturating_sub(1))
            .map(|t| t.right_dim())
            .collect()
    }

    /// Largest bond dimension
    pub fn max_bond_dim(&self) -> usize {
        self.bond_dims().into_iter().max().unwrap_or(1)
    }

    /// `<psi|psi>` by left-to-right transfer matrices
    pub fn norm_squared(&self) -> f64 {
        // transfer[a, a'] over the bond to the right of the last contracted site
        let mut transfer: Matrix2<f64> = Matrix2::from_elem([1, 1], 1.0);
        for t in &self.tensors {
            let (l, d, r) = (t.left_dim(), t.site_dim(), t.right_dim());
            // x[a', (s, b)] = sum_a transfer[a, a'] A[a, s, b]
            let transfer_t = Matrix2::from_fn([l, l], |idx| transfer[[idx[1], idx[0]]]);
            let x = matmul(&transfer_t, &t.as_right_matrix());
            // next[b, b'] = sum_{a', s} x[a', s, b] A[a', s, b']
            let x_t = Matrix2::from_fn([r, l * d], |idx| {
                x[[idx[1] / d, (idx[1] % d) * r + idx[0]]]
            });
            transfer = matmul(&x_t, &t.as_left_matrix());
        }
        let mut total = 0.0;
        for a in 0..transfer.dim(0) {
            for ap in 0..transfer.dim(1) {
                total += transfer[[a, ap]];
            }
        }
        total
    }

    /// `sqrt(<psi|psi>)`
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_bond_dims() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mps = Mps::random(&[2; 8], 5, &mut rng).unwrap();
        assert_eq!(mps.len(), 8);
        assert_eq!(mps.site_tensor(0).left_dim(), 1);
        assert_eq!(mps.site_tensor(7).right_dim(), 1);
        // Capped by the cap in the middle and by the remaining sites at the right end
        assert_eq!(mps.bond_dims(), vec![2, 4, 5, 5, 5, 4, 2]);
        assert_eq!(mps.max_bond_dim(), 5);
        assert!(Mps::new(mps.site_tensors().to_vec()).is_ok());
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Mps::random(&[2; 4], 4, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let b = Mps::random(&[2; 4], 4, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        for i in 0..4 {
            let (ta, tb) = (a.site_tensor(i), b.site_tensor(i));
            assert_eq!(ta.left_dim(), tb.left_dim());
            assert_eq!(ta.right_dim(), tb.right_dim());
            for l in 0..ta.left_dim() {
                for s in 0..ta.site_dim() {
                    for r in 0..ta.right_dim() {
                        assert_eq!(ta[[l, s, r]], tb[[l, s, r]]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_random_rejects_bad_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(Mps::random(&[], 4, &mut rng).is_err());
        assert!(Mps::random(&[2, 0], 4, &mut rng).is_err());
        assert!(Mps::random(&[2, 2], 0, &mut rng).is_err());
    }

    #[test]
    fn test_product_state_norm() {
        let mps = Mps::product_state(&[2, 3, 2], &[1, 2, 0]).unwrap();
        assert_eq!(mps.bond_dims(), vec![1, 1]);
        assert_abs_diff_eq!(mps.norm(), 1.0);
        assert!(Mps::product_state(&[2, 2], &[0, 2]).is_err());
    }

    #[test]
    fn test_new_rejects_broken_bond() {
        let a = tensor3_zeros::<f64>(1, 2, 2);
        let b = tensor3_zeros::<f64>(3, 2, 1);
        assert!(matches!(
            Mps::new(vec![a, b]),
            Err(DmrgError::DimensionMismatch { .. })
        ));
    }
}
