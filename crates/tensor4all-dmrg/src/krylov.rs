//! Restarted Lanczos eigensolver for matrix-free symmetric operators.
//!
//! The solver finds the algebraically smallest eigenpair of a real symmetric
//! operator given only its action on vectors (see [`LinearOperator`]).
//!
//! # Algorithm
//!
//! Each restart round builds an orthonormal Krylov basis
//! `v_0, A v_0, ..., A^m v_0` (m = `krylov_dim`) with full Gram-Schmidt
//! re-orthogonalization against every earlier vector, accumulating the
//! projected `m × m` matrix from the inner products `<A v_{i-1}, v_j>`.
//! The projected matrix is diagonalized densely and the Ritz vector for its
//! lowest eigenvalue becomes the start vector of the next round. Exactly
//! `max_restarts` rounds are run.
//!
//! If `A v_{k-1}` already lies in the span of the basis (the start vector is
//! an eigenvector, or the space is exhausted) the round stops early and
//! diagonalizes the `k × k` block built so far.
//!
//! # Example
//!
//! ```ignore
//! use tensor4all_dmrg::krylov::{eig_lanczos, LanczosOptions};
//!
//! let result = eig_lanczos(&operator, &start, &LanczosOptions::default())?;
//! println!("lowest eigenvalue: {}", result.eigenvalue);
//! ```

use tracing::trace;

use crate::backend::eigh;
use crate::error::{DmrgError, Result};
use crate::projector::LinearOperator;
use crate::types::{matrix2_zeros, Matrix2};

/// Norm floor applied whenever a vector is normalized.
///
/// Vectors with a smaller norm are divided by this value instead, so a
/// Krylov space that closes early yields near-zero basis vectors rather
/// than NaNs.
pub const EPSILON: f64 = 1e-16;

/// Number of classical Gram-Schmidt passes per new basis vector.
///
/// A single pass leaves an overlap of order `eps * ||A v|| / ||residual||`
/// with the earlier vectors; the second pass removes it.
const GRAM_SCHMIDT_PASSES: usize = 2;

/// Relative residual below which the Krylov space is treated as closed.
///
/// When `||w_orth|| <= BREAKDOWN_TOL * ||A v_{k-1}||` the new direction is
/// rounding noise, so the basis stops growing and only the leading `k × k`
/// block of the projected matrix is used.
pub const BREAKDOWN_TOL: f64 = 1e-12;

/// Options for the restarted Lanczos solver.
#[derive(Debug, Clone)]
pub struct LanczosOptions {
    /// Number of restart rounds (`maxit`).
    /// Default: 2
    pub max_restarts: usize,

    /// Krylov subspace dimension per round (`krydim`).
    /// Default: 4
    pub krylov_dim: usize,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            max_restarts: 2,
            krylov_dim: 4,
        }
    }
}

impl LanczosOptions {
    /// Create options with the given restart count and subspace dimension.
    pub fn new(max_restarts: usize, krylov_dim: usize) -> Self {
        Self {
            max_restarts,
            krylov_dim,
        }
    }

    /// Set the number of restart rounds.
    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Set the Krylov subspace dimension.
    pub fn with_krylov_dim(mut self, krylov_dim: usize) -> Self {
        self.krylov_dim = krylov_dim;
        self
    }

    /// Check the options against the length of the vectors they will be used on.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] if `max_restarts` or `krylov_dim`
    /// is zero, or if `krylov_dim` exceeds `vector_len`.
    pub fn validate(&self, vector_len: usize) -> Result<()> {
        if self.max_restarts < 1 {
            return Err(DmrgError::invalid_config(
                "Lanczos needs at least one restart round (maxit >= 1)",
            ));
        }
        if self.krylov_dim < 1 {
            return Err(DmrgError::invalid_config(
                "Krylov subspace dimension must be at least 1",
            ));
        }
        if self.krylov_dim > vector_len {
            return Err(DmrgError::invalid_config(format!(
                "Krylov subspace dimension {} exceeds the vector length {}",
                self.krylov_dim, vector_len
            )));
        }
        Ok(())
    }
}

/// Result of the Lanczos solver.
#[derive(Debug, Clone)]
pub struct LanczosResult {
    /// Lowest Ritz value of the final round
    pub eigenvalue: f64,

    /// Corresponding Ritz vector, normalized
    pub eigenvector: Vec<f64>,
}

/// Orthonormal Krylov basis of one restart round together with the
/// projected operator.
#[derive(Debug, Clone)]
pub struct KrylovBasis {
    /// Basis vectors; the first is the normalized start vector. There are
    /// `krylov_dim + 1` of them unless the Krylov space closed early, in
    /// which case there are exactly as many as the projected matrix is wide.
    pub vectors: Vec<Vec<f64>>,

    /// Symmetric `m × m` projection of the operator onto the first `m`
    /// basis vectors, with `m = krylov_dim` or the size of a closed space
    pub projected: Matrix2<f64>,
}

impl KrylovBasis {
    /// Size `m` of the projected matrix
    pub fn subspace_dim(&self) -> usize {
        self.projected.dim(0)
    }

    /// Whether the Krylov space closed before reaching `krylov_dim`
    /// additional directions
    pub fn closed(&self) -> bool {
        self.vectors.len() == self.subspace_dim()
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Normalize `v` in place, dividing by `max(||v||, eps)`.
pub fn safe_normalize(v: &mut [f64], eps: f64) {
    let scale = norm(v).max(eps);
    for x in v.iter_mut() {
        *x /= scale;
    }
}

/// Build one round's Krylov basis from `start`.
///
/// Basis vector `k` is `A v_{k-1}` orthogonalized against all of
/// `v_0 .. v_{k-1}` in `GRAM_SCHMIDT_PASSES` classical Gram-Schmidt passes,
/// each followed by one normalization. Before orthogonalization, the raw
/// product supplies the projected-matrix entries
/// `K[k-1][j] = K[j][k-1] = <A v_{k-1}, v_j>` for `j < k`.
///
/// If the orthogonalized residual falls below [`BREAKDOWN_TOL`] relative to
/// `||A v_{k-1}||` (including an exactly zero product), the space is closed:
/// the basis stops at `k` vectors and `projected` is cut to its `k × k` block.
///
/// # Errors
/// Propagates operator failures and returns [`DmrgError::LengthMismatch`]
/// if `start` does not match the operator dimension.
pub fn krylov_basis<O: LinearOperator + ?Sized>(
    op: &O,
    start: &[f64],
    krylov_dim: usize,
) -> Result<KrylovBasis> {
    if start.len() != op.dim() {
        return Err(DmrgError::LengthMismatch {
            expected: op.dim(),
            got: start.len(),
        });
    }

    let mut vectors: Vec<Vec<f64>> = Vec::with_capacity(krylov_dim + 1);
    let mut projected = matrix2_zeros(krylov_dim, krylov_dim);

    let mut v0 = start.to_vec();
    safe_normalize(&mut v0, EPSILON);
    vectors.push(v0);

    for k in 1..=krylov_dim {
        let mut w = op.apply(&vectors[k - 1])?;
        for (j, v) in vectors.iter().enumerate() {
            let entry = dot(&w, v);
            projected[[k - 1, j]] = entry;
            projected[[j, k - 1]] = entry;
        }

        let product_norm = norm(&w);
        for pass in 0..GRAM_SCHMIDT_PASSES {
            for v in &vectors {
                let overlap = dot(v, &w);
                for (wi, vi) in w.iter_mut().zip(v) {
                    *wi -= overlap * vi;
                }
            }
            if pass == 0 && norm(&w) <= BREAKDOWN_TOL * product_norm {
                let projected = Matrix2::from_fn([k, k], |idx| projected[[idx[0], idx[1]]]);
                return Ok(KrylovBasis { vectors, projected });
            }
            safe_normalize(&mut w, EPSILON);
        }
        vectors.push(w);
    }

    Ok(KrylovBasis { vectors, projected })
}

/// Find the lowest eigenpair of a symmetric operator by restarted Lanczos.
///
/// # Arguments
///
/// * `op` - The symmetric operator
/// * `start` - Initial guess; need not be normalized but must be nonzero
/// * `options` - Restart count and subspace dimension
///
/// # Errors
///
/// Returns an error if the options are invalid for the operator dimension,
/// if the operator application fails, or if the dense eigendecomposition
/// of the projected matrix fails.
pub fn eig_lanczos<O: LinearOperator + ?Sized>(
    op: &O,
    start: &[f64],
    options: &LanczosOptions,
) -> Result<LanczosResult> {
    options.validate(op.dim())?;
    let krylov_dim = options.krylov_dim;

    let mut current = start.to_vec();
    let mut eigenvalue = 0.0;

    for round in 0..options.max_restarts {
        let basis = krylov_basis(op, &current, krylov_dim)?;
        let decomp = eigh(&basis.projected)?;
        eigenvalue = decomp.values[0];

        let mut next = vec![0.0; op.dim()];
        for (j, v) in basis.vectors.iter().take(basis.subspace_dim()).enumerate() {
            let coeff = decomp.vectors[[j, 0]];
            for (ni, vi) in next.iter_mut().zip(v) {
                *ni += coeff * vi;
            }
        }
        current = next;

        trace!(
            round,
            ritz_value = eigenvalue,
            subspace_dim = basis.subspace_dim(),
            "lanczos restart"
        );
    }

    safe_normalize(&mut current, EPSILON);
    Ok(LanczosResult {
        eigenvalue,
        eigenvector: current,
    })
}
