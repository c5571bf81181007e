//! Two-site effective Hamiltonian as a matrix-free linear operator

use crate::contraction::apply_two_site_hamiltonian;
use crate::error::{DmrgError, Result};
use crate::types::{tensor4_from_data, tensor4_to_vec, Environment, Tensor4, Tensor4Ops};

/// A linear map on flat real vectors of a fixed length.
///
/// The Krylov solver only needs matrix-vector products, so any operator
/// that can act on a vector of length [`LinearOperator::dim`] can be
/// handed to it.
pub trait LinearOperator {
    /// Length of the vectors the operator acts on
    fn dim(&self) -> usize;

    /// Compute `A x`
    fn apply(&self, x: &[f64]) -> Result<Vec<f64>>;
}

/// The Hamiltonian projected onto the two-site variational space of bond
/// `(p, p+1)`.
///
/// Borrows the left environment `L[p]`, the MPO tensors `W[p]` and
/// `W[p+1]`, and the right environment `R[p+2]`. Vectors are flattened
/// two-site tensors of shape `(left_dim, site_dim_1, site_dim_2, right_dim)`
/// in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveHamiltonian<'a> {
    left: &'a Environment,
    w1: &'a Tensor4<f64>,
    w2: &'a Tensor4<f64>,
    right: &'a Environment,
    shape: [usize; 4],
}

impl<'a> EffectiveHamiltonian<'a> {
    /// Build the projector for the given environments and MPO pair.
    ///
    /// # Errors
    /// Returns [`DmrgError::DimensionMismatch`] if the virtual legs do not
    /// chain or the ket and bra bonds of an environment differ.
    pub fn new(
        left: &'a Environment,
        w1: &'a Tensor4<f64>,
        w2: &'a Tensor4<f64>,
        right: &'a Environment,
    ) -> Result<Self> {
        DmrgError::check_dim("projector: left environment", left.dim(0), left.dim(2))?;
        DmrgError::check_dim("projector: right environment", right.dim(0), right.dim(2))?;
        DmrgError::check_dim("projector: left mpo bond", left.dim(1), w1.left_dim())?;
        DmrgError::check_dim("projector: inner mpo bond", w1.right_dim(), w2.left_dim())?;
        DmrgError::check_dim("projector: right mpo bond", right.dim(1), w2.right_dim())?;
        DmrgError::check_dim("projector: first site", w1.site_dim_1(), w1.site_dim_2())?;
        DmrgError::check_dim("projector: second site", w2.site_dim_1(), w2.site_dim_2())?;

        Ok(Self {
            left,
            w1,
            w2,
            right,
            shape: [left.dim(0), w1.site_dim_2(), w2.site_dim_2(), right.dim(0)],
        })
    }

    /// Shape `(left_dim, site_dim_1, site_dim_2, right_dim)` of the two-site tensor
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Apply the projector to a two-site tensor without flattening.
    pub fn apply_tensor(&self, psi: &Tensor4<f64>) -> Result<Tensor4<f64>> {
        apply_two_site_hamiltonian(psi, self.left, self.w1, self.w2, self.right)
    }
}

impl LinearOperator for EffectiveHamiltonian<'_> {
    fn dim(&self) -> usize {
        self.shape.iter().product()
    }

    fn apply(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.dim() {
            return Err(DmrgError::LengthMismatch {
                expected: self.dim(),
                got: x.len(),
            });
        }
        let [l, s1, s2, r] = self.shape;
        let psi = tensor4_from_data(x, l, s1, s2, r);
        let out = self.apply_tensor(&psi)?;
        Ok(tensor4_to_vec(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tensor4_zeros;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_vec(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
        (0..n).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect()
    }

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Symmetric environments and a Hermitian MPO pair give a symmetric projector
    fn symmetric_setup(rng: &mut ChaCha8Rng) -> (Environment, Tensor4<f64>, Tensor4<f64>, Environment) {
        let (a, b, d, dw) = (2, 3, 2, 2);
        let mut left = Environment::from_elem([a, dw, a], 0.0);
        let mut right = Environment::from_elem([b, dw, b], 0.0);
        for w in 0..dw {
            for i in 0..a {
                for j in 0..=i {
                    let v = rng.gen::<f64>() - 0.5;
                    left[[i, w, j]] = v;
                    left[[j, w, i]] = v;
                }
            }
            for i in 0..b {
                for j in 0..=i {
                    let v = rng.gen::<f64>() - 0.5;
                    right[[i, w, j]] = v;
                    right[[j, w, i]] = v;
                }
            }
        }
        let mut w1 = tensor4_zeros(1, d, d, dw);
        let mut w2 = tensor4_zeros(dw, d, d, 1);
        for w in 0..dw {
            for s in 0..d {
                for t in 0..=s {
                    let v1 = rng.gen::<f64>() - 0.5;
                    w1[[0, s, t, w]] = v1;
                    w1[[0, t, s, w]] = v1;
                    let v2 = rng.gen::<f64>() - 0.5;
                    w2[[w, s, t, 0]] = v2;
                    w2[[w, t, s, 0]] = v2;
                }
            }
        }
        // Left and right environments carry a one-dimensional MPO leg on
        // the boundary side of w1 and w2.
        let left = Environment::from_fn([a, 1, a], |idx| left[[idx[0], 0, idx[2]]]);
        let right = Environment::from_fn([b, 1, b], |idx| right[[idx[0], 1, idx[2]]]);
        (left, w1, w2, right)
    }

    #[test]
    fn test_projector_dim_and_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (left, w1, w2, right) = symmetric_setup(&mut rng);
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        assert_eq!(op.shape(), [2, 2, 2, 3]);
        assert_eq!(op.dim(), 24);
    }

    #[test]
    fn test_projector_is_symmetric() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (left, w1, w2, right) = symmetric_setup(&mut rng);
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();

        let x = random_vec(&mut rng, op.dim());
        let y = random_vec(&mut rng, op.dim());
        let ax = op.apply(&x).unwrap();
        let ay = op.apply(&y).unwrap();
        assert_abs_diff_eq!(dot(&y, &ax), dot(&x, &ay), epsilon = 1e-12);
    }

    #[test]
    fn test_projector_is_linear() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (left, w1, w2, right) = symmetric_setup(&mut rng);
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();

        let x = random_vec(&mut rng, op.dim());
        let y = random_vec(&mut rng, op.dim());
        let combo: Vec<f64> = x.iter().zip(&y).map(|(a, b)| 2.0 * a - 3.0 * b).collect();
        let ax = op.apply(&x).unwrap();
        let ay = op.apply(&y).unwrap();
        let acombo = op.apply(&combo).unwrap();
        for i in 0..op.dim() {
            assert_abs_diff_eq!(acombo[i], 2.0 * ax[i] - 3.0 * ay[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_projector_rejects_wrong_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (left, w1, w2, right) = symmetric_setup(&mut rng);
        let op = EffectiveHamiltonian::new(&left, &w1, &w2, &right).unwrap();
        let err = op.apply(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            DmrgError::LengthMismatch {
                expected: 24,
                got: 2
            }
        ));
    }

    #[test]
    fn test_projector_rejects_broken_mpo_chain() {
        let left = Environment::from_elem([1, 2, 1], 0.0);
        let right = Environment::from_elem([1, 1, 1], 0.0);
        let w1: Tensor4<f64> = tensor4_zeros(2, 2, 2, 3);
        let w2: Tensor4<f64> = tensor4_zeros(2, 2, 2, 1);
        assert!(matches!(
            EffectiveHamiltonian::new(&left, &w1, &w2, &right),
            Err(DmrgError::DimensionMismatch { .. })
        ));
    }
}
