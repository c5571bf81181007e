//! Local two-site update
//!
//! One update merges the site tensors of a bond, minimizes the energy of the
//! merged tensor with the restarted Lanczos solver, and splits the minimizer
//! back into two site tensors with a truncated SVD. The singular values are
//! absorbed on the side the sweep is moving towards, so the site left behind
//! is an isometry.

use crate::contraction::merge_two_site;
use crate::decomposition::{scale_left_bond, scale_right_bond, split_two_site};
use crate::error::{DmrgError, Result};
use crate::krylov::{eig_lanczos, LanczosOptions};
use crate::projector::{EffectiveHamiltonian, LinearOperator};
use crate::types::{tensor4_from_data, tensor4_to_vec, Tensor3, Tensor3Ops};

/// Direction of a half sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepDirection {
    /// Bonds are visited from `N-2` down to `0`; weights go to the left site
    RightToLeft,
    /// Bonds are visited from `0` up to `N-2`; weights go to the right site
    LeftToRight,
}

impl SweepDirection {
    /// The opposite direction
    pub fn reverse(self) -> Self {
        match self {
            Self::RightToLeft => Self::LeftToRight,
            Self::LeftToRight => Self::RightToLeft,
        }
    }
}

impl std::fmt::Display for SweepDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RightToLeft => write!(f, "r->l"),
            Self::LeftToRight => write!(f, "l->r"),
        }
    }
}

/// Outcome of one local update.
#[derive(Debug, Clone)]
pub struct TwoSiteUpdate {
    /// New tensor for the left site, shape `(l, d, k)`
    pub left: Tensor3<f64>,
    /// New tensor for the right site, shape `(k, d, r)`
    pub right: Tensor3<f64>,
    /// Kept singular values, unit 2-norm, largest first
    pub singular_values: Vec<f64>,
    /// Lowest Ritz value returned by the eigensolver
    pub energy: f64,
    /// Truncated weight of the split
    pub discarded: f64,
}

impl TwoSiteUpdate {
    /// Retained bond dimension `k`
    pub fn bond_dim(&self) -> usize {
        self.singular_values.len()
    }
}

/// Optimize the two site tensors of one bond.
///
/// `left_site` and `right_site` are the current tensors at `p` and `p+1`;
/// their contraction seeds the eigensolver. `op` is the projected
/// Hamiltonian of the bond. For [`SweepDirection::RightToLeft`] the result
/// is `(U S, V^T)`, for [`SweepDirection::LeftToRight`] it is `(U, S V^T)`.
///
/// # Errors
/// Returns [`DmrgError::DimensionMismatch`] if the merged tensor does not fit
/// the projector and propagates eigensolver and factorization failures.
pub fn update_two_site(
    left_site: &Tensor3<f64>,
    right_site: &Tensor3<f64>,
    op: &EffectiveHamiltonian<'_>,
    direction: SweepDirection,
    max_bond_dim: usize,
    lanczos: &LanczosOptions,
) -> Result<TwoSiteUpdate> {
    let theta = merge_two_site(left_site, right_site)?;
    let [l_dim, s1_dim, s2_dim, r_dim] = op.shape();
    DmrgError::check_dim("local update: left bond", l_dim, left_site.left_dim())?;
    DmrgError::check_dim("local update: first site", s1_dim, left_site.site_dim())?;
    DmrgError::check_dim("local update: second site", s2_dim, right_site.site_dim())?;
    DmrgError::check_dim("local update: right bond", r_dim, right_site.right_dim())?;

    let start = tensor4_to_vec(&theta);
    let solution = eig_lanczos(op, &start, lanczos)?;
    debug_assert_eq!(solution.eigenvector.len(), op.dim());
    let psi = tensor4_from_data(&solution.eigenvector, l_dim, s1_dim, s2_dim, r_dim);

    let new_dim = (l_dim * s1_dim).min(s2_dim * r_dim).min(max_bond_dim);
    let split = split_two_site(&psi, new_dim)?;

    let (left, right) = match direction {
        SweepDirection::RightToLeft => (
            scale_right_bond(&split.left, &split.singular_values)?,
            split.right,
        ),
        SweepDirection::LeftToRight => (
            split.left,
            scale_left_bond(&split.right, &split.singular_values)?,
        ),
    };

    Ok(TwoSiteUpdate {
        left,
        right,
        singular_values: split.singular_values,
        energy: solution.eigenvalue,
        discarded: split.discarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::{is_left_isometric, is_right_isometric};
    use crate::types::{tensor4_zeros, Environment, Tensor4, Tensor4Ops};
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_tensor3(rng: &mut ChaCha8Rng, l: usize, s: usize, r: usize) -> Tensor3<f64> {
        Tensor3::from_fn([l, s, r], |_| rng.gen::<f64>() * 2.0 - 1.0)
    }

    /// Two-site Heisenberg bond `ZZ + XX + YY` with trivial environments.
    /// Its ground state is the singlet with energy -3. The spectrum has only
    /// two distinct levels, so a two-dimensional Krylov space is exact.
    fn heisenberg_bond() -> (Environment, Tensor4<f64>, Tensor4<f64>, Environment) {
        let paulis: [[[f64; 2]; 2]; 3] = [
            [[0.0, 1.0], [1.0, 0.0]],
            [[0.0, 1.0], [-1.0, 0.0]],
            [[1.0, 0.0], [0.0, -1.0]],
        ];
        let signs = [1.0, -1.0, 1.0];
        let mut w1 = tensor4_zeros(1, 2, 2, 3);
        let mut w2 = tensor4_zeros(3, 2, 2, 1);
        for (c, op) in paulis.iter().enumerate() {
            for s in 0..2 {
                for t in 0..2 {
                    w1.set4(0, s, t, c, op[s][t]);
                    w2.set4(c, s, t, 0, signs[c] * op[s][t]);
                }
            }
        }
        let env = Environment::from_elem([1, 1, 1], 1.0);
        (env.clone(), w1, w2, env)
    }

    #[test]
    fn test_update_finds_singlet() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let (left, w1, w2, right) = heisenberg_bond();
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        let a = random_tensor3(&mut rng, 1, 2, 2);
        let b = random_tensor3(&mut rng, 2, 2, 1);

        let update = update_two_site(
            &a,
            &b,
            &op,
            SweepDirection::LeftToRight,
            4,
            &LanczosOptions::new(2, 2),
        )
        .unwrap();

        assert_abs_diff_eq!(update.energy, -3.0, epsilon = 1e-10);
        // The singlet has two equal Schmidt values
        assert_eq!(update.bond_dim(), 2);
        assert_abs_diff_eq!(update.singular_values[0], 1.0 / 2f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(update.singular_values[1], 1.0 / 2f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(update.discarded, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_update_isometry_follows_direction() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (left, w1, w2, right) = heisenberg_bond();
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        let a = random_tensor3(&mut rng, 1, 2, 2);
        let b = random_tensor3(&mut rng, 2, 2, 1);
        let lanczos = LanczosOptions::new(2, 2);

        let rl = update_two_site(&a, &b, &op, SweepDirection::RightToLeft, 4, &lanczos).unwrap();
        assert!(is_right_isometric(&rl.right, 1e-10));

        let lr = update_two_site(&a, &b, &op, SweepDirection::LeftToRight, 4, &lanczos).unwrap();
        assert!(is_left_isometric(&lr.left, 1e-10));
    }

    #[test]
    fn test_update_respects_bond_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let (left, w1, w2, right) = heisenberg_bond();
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        let a = random_tensor3(&mut rng, 1, 2, 2);
        let b = random_tensor3(&mut rng, 2, 2, 1);

        let update = update_two_site(
            &a,
            &b,
            &op,
            SweepDirection::RightToLeft,
            1,
            &LanczosOptions::new(2, 2),
        )
        .unwrap();
        assert_eq!(update.bond_dim(), 1);
        assert_eq!(update.left.right_dim(), 1);
        assert_eq!(update.right.left_dim(), 1);
        assert_abs_diff_eq!(update.singular_values[0], 1.0, epsilon = 1e-12);
        assert!(update.discarded > 0.4);
    }

    #[test]
    fn test_update_rejects_mismatched_sites() {
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        let (left, w1, w2, right) = heisenberg_bond();
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        let a = random_tensor3(&mut rng, 2, 2, 2);
        let b = random_tensor3(&mut rng, 2, 2, 1);
        let err = update_two_site(
            &a,
            &b,
            &op,
            SweepDirection::LeftToRight,
            4,
            &LanczosOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DmrgError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_sweep_direction_reverse() {
        assert_eq!(
            SweepDirection::RightToLeft.reverse(),
            SweepDirection::LeftToRight
        );
        assert_eq!(SweepDirection::LeftToRight.to_string(), "l->r");
    }
}
