//! Backend helpers for dense linear algebra.
//!
//! This module provides the dense kernels the DMRG engine needs: matrix
//! multiplication for every pairwise contraction, a thin SVD for truncating
//! two-site tensors and a symmetric eigendecomposition for the projected
//! Krylov matrix.
//!
//! All faer types are wrapped to avoid exposing upstream API changes
//! to the rest of the crate. Inputs and outputs are row-major [`Matrix2`].

use faer::linalg::matmul::matmul as faer_matmul;
use faer::{Accum, Mat, Par, Side};

use crate::error::{DmrgError, Result};
use crate::types::Matrix2;

/// Result of a thin SVD.
///
/// For an m×n matrix A with k = min(m, n):
/// - `u`: m×k matrix with orthonormal columns
/// - `s`: k singular values in non-increasing order
/// - `vt`: k×n matrix with orthonormal rows
///
/// The decomposition satisfies: A = U × diag(S) × Vt
#[derive(Debug, Clone)]
pub struct SvdResult {
    /// Left singular vectors (m×k)
    pub u: Matrix2<f64>,
    /// Singular values, largest first
    pub s: Vec<f64>,
    /// Right singular vectors, transposed (k×n)
    pub vt: Matrix2<f64>,
}

/// Result of a symmetric eigendecomposition.
///
/// Eigenvalues are sorted in ascending order; column `j` of `vectors`
/// is the normalized eigenvector belonging to `values[j]`.
#[derive(Debug, Clone)]
pub struct EighResult {
    /// Eigenvalues, smallest first
    pub values: Vec<f64>,
    /// Eigenvectors stored as columns
    pub vectors: Matrix2<f64>,
}

fn to_faer(a: &Matrix2<f64>) -> Mat<f64> {
    Mat::<f64>::from_fn(a.dim(0), a.dim(1), |i, j| a[[i, j]])
}

/// Matrix product `C = A B` via faer GEMM.
///
/// Panics if the inner dimensions differ; callers check leg dimensions
/// before reshaping tensors into matrices.
pub fn matmul(a: &Matrix2<f64>, b: &Matrix2<f64>) -> Matrix2<f64> {
    let (m, k) = (a.dim(0), a.dim(1));
    let n = b.dim(1);
    assert_eq!(
        k,
        b.dim(0),
        "Contracted dimension sizes must match: {} vs {}",
        k,
        b.dim(0)
    );

    let a_mat = to_faer(a);
    let b_mat = to_faer(b);
    let mut c_mat = Mat::<f64>::zeros(m, n);
    let mut c_view = c_mat.as_mut();

    // C = 1.0 * A * B, overwriting C
    faer_matmul(
        &mut c_view,
        Accum::Replace,
        a_mat.as_ref(),
        b_mat.as_ref(),
        1.0,
        Par::Seq,
    );

    Matrix2::from_fn([m, n], |idx| c_mat[(idx[0], idx[1])])
}

/// Compute the thin SVD of a matrix.
///
/// # Errors
/// Returns [`DmrgError::Factorization`] for an empty matrix or when the
/// backend fails to converge.
pub fn svd(a: &Matrix2<f64>) -> Result<SvdResult> {
    let m = a.dim(0);
    let n = a.dim(1);
    if m == 0 || n == 0 {
        return Err(DmrgError::Factorization {
            message: "Cannot factorize empty matrix".to_string(),
        });
    }
    let k = m.min(n);

    let mat = to_faer(a);
    let decomp = mat
        .as_ref()
        .thin_svd()
        .map_err(|e| DmrgError::Factorization {
            message: format!("SVD computation failed: {:?}", e),
        })?;
    let u = decomp.U();
    let s = decomp.S().column_vector();
    let v = decomp.V();

    // faer returns the values sorted already; the explicit order keeps the
    // truncation independent of that convention.
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&i, &j| s[j].total_cmp(&s[i]));

    Ok(SvdResult {
        u: Matrix2::from_fn([m, k], |idx| u[(idx[0], order[idx[1]])]),
        s: order.iter().map(|&i| s[i]).collect(),
        vt: Matrix2::from_fn([k, n], |idx| v[(idx[1], order[idx[0]])]),
    })
}

/// Compute the full eigendecomposition of a real symmetric matrix.
///
/// Only the lower triangle is read.
///
/// # Errors
/// Returns [`DmrgError::Factorization`] for a non-square or empty matrix
/// or when the backend fails to converge.
pub fn eigh(a: &Matrix2<f64>) -> Result<EighResult> {
    let n = a.dim(0);
    if n == 0 || a.dim(1) != n {
        return Err(DmrgError::Factorization {
            message: format!(
                "Symmetric eigendecomposition needs a non-empty square matrix, got {}x{}",
                n,
                a.dim(1)
            ),
        });
    }

    let mat = to_faer(a);
    let evd = mat
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| DmrgError::Factorization {
            message: format!("Eigendecomposition failed: {:?}", e),
        })?;
    let values = evd.S().column_vector();
    let vectors = evd.U();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    Ok(EighResult {
        values: order.iter().map(|&i| values[i]).collect(),
        vectors: Matrix2::from_fn([n, n], |idx| vectors[(idx[0], order[idx[1]])]),
    })
}
