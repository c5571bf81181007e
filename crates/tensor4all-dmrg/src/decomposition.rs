//! Truncated factorizations of site tensors
//!
//! The two-site split turns an optimized `(l, s1, s2, r)` tensor back into two
//! site tensors joined by a bond of at most `max_dim`, keeping the leading
//! singular values. The single-site helpers are used to (re)canonicalize the
//! chain ends and to bring the initial ansatz into left-canonical form.

use crate::backend::svd;
use crate::error::{DmrgError, Result};
use crate::krylov::EPSILON;
use crate::types::{
    tensor3_from_left_matrix, tensor3_from_right_matrix, Matrix2, Tensor3, Tensor3Ops, Tensor4,
    Tensor4Ops,
};

/// Result of splitting a two-site tensor across its center bond.
#[derive(Debug, Clone)]
pub struct TwoSiteSplit {
    /// Left factor `U`, shape `(l, s1, k)`, left-isometric
    pub left: Tensor3<f64>,
    /// Kept singular values, renormalized to unit 2-norm
    pub singular_values: Vec<f64>,
    /// Right factor `V^T`, shape `(k, s2, r)`, right-isometric
    pub right: Tensor3<f64>,
    /// Discarded weight `1 - sum_kept s^2 / sum_all s^2`
    pub discarded: f64,
}

impl TwoSiteSplit {
    /// Retained bond dimension `k`
    pub fn bond_dim(&self) -> usize {
        self.singular_values.len()
    }
}

/// Split a two-site tensor by a truncated SVD.
///
/// The tensor is reshaped to `(l * s1, s2 * r)`, decomposed, and truncated to
/// the `max_dim` largest singular values. The kept values are divided by
/// their 2-norm (floored at [`EPSILON`]) so the state stays normalized.
///
/// # Errors
/// Returns [`DmrgError::InvalidConfig`] for `max_dim == 0` and propagates
/// backend failures.
pub fn split_two_site(theta: &Tensor4<f64>, max_dim: usize) -> Result<TwoSiteSplit> {
    if max_dim == 0 {
        return Err(DmrgError::invalid_config("Bond dimension cap must be positive"));
    }
    let (l_dim, s1_dim, s2_dim, r_dim) = (
        theta.left_dim(),
        theta.site_dim_1(),
        theta.site_dim_2(),
        theta.right_dim(),
    );

    let decomp = svd(&theta.as_center_matrix())?;
    let keep = max_dim.min(decomp.s.len());

    let total: f64 = decomp.s.iter().map(|s| s * s).sum();
    let kept: f64 = decomp.s[..keep].iter().map(|s| s * s).sum();
    let discarded = if total > 0.0 {
        (1.0 - kept / total).max(0.0)
    } else {
        0.0
    };

    let scale = kept.sqrt().max(EPSILON);
    let singular_values: Vec<f64> = decomp.s[..keep].iter().map(|s| s / scale).collect();

    let u = Matrix2::from_fn([l_dim * s1_dim, keep], |idx| decomp.u[[idx[0], idx[1]]]);
    let vt = Matrix2::from_fn([keep, s2_dim * r_dim], |idx| decomp.vt[[idx[0], idx[1]]]);

    Ok(TwoSiteSplit {
        left: tensor3_from_left_matrix(&u, l_dim, s1_dim),
        singular_values,
        right: tensor3_from_right_matrix(&vt, s2_dim, r_dim),
        discarded,
    })
}

/// Multiply the right bond of a site tensor by a diagonal: `A[l,s,k] * s_k`.
pub fn scale_right_bond(tensor: &Tensor3<f64>, weights: &[f64]) -> Result<Tensor3<f64>> {
    DmrgError::check_dim("scale_right_bond", tensor.right_dim(), weights.len())?;
    Ok(Tensor3::from_fn(
        [tensor.left_dim(), tensor.site_dim(), tensor.right_dim()],
        |idx| tensor[[idx[0], idx[1], idx[2]]] * weights[idx[2]],
    ))
}

/// Multiply the left bond of a site tensor by a diagonal: `s_k * B[k,s,r]`.
pub fn scale_left_bond(tensor: &Tensor3<f64>, weights: &[f64]) -> Result<Tensor3<f64>> {
    DmrgError::check_dim("scale_left_bond", tensor.left_dim(), weights.len())?;
    Ok(Tensor3::from_fn(
        [tensor.left_dim(), tensor.site_dim(), tensor.right_dim()],
        |idx| weights[idx[0]] * tensor[[idx[0], idx[1], idx[2]]],
    ))
}

/// Contract a `(k, m)` matrix into the left bond of a `(m, s, r)` site tensor.
pub fn absorb_into_left_bond(mat: &Matrix2<f64>, tensor: &Tensor3<f64>) -> Result<Tensor3<f64>> {
    DmrgError::check_dim("absorb_into_left_bond", mat.dim(1), tensor.left_dim())?;
    let (k_dim, m_dim) = (mat.dim(0), mat.dim(1));
    let (s_dim, r_dim) = (tensor.site_dim(), tensor.right_dim());

    let mut out = Tensor3::from_elem([k_dim, s_dim, r_dim], 0.0);
    for k in 0..k_dim {
        for m in 0..m_dim {
            let coeff = mat[[k, m]];
            if coeff == 0.0 {
                continue;
            }
            for s in 0..s_dim {
                for r in 0..r_dim {
                    out[[k, s, r]] += coeff * tensor[[m, s, r]];
                }
            }
        }
    }
    Ok(out)
}

/// Left-orthogonalize a site tensor by a full SVD of its `(l * s, r)` reshape.
///
/// Returns the left-isometric `U` as a `(l, s, k)` tensor and the remainder
/// `diag(S) V^T` as a `(k, r)` matrix, with `k = min(l * s, r)`.
pub fn left_orthogonalize(tensor: &Tensor3<f64>) -> Result<(Tensor3<f64>, Matrix2<f64>)> {
    let decomp = svd(&tensor.as_left_matrix())?;
    let remainder = Matrix2::from_fn([decomp.s.len(), decomp.vt.dim(1)], |idx| {
        decomp.s[idx[0]] * decomp.vt[[idx[0], idx[1]]]
    });
    Ok((
        tensor3_from_left_matrix(&decomp.u, tensor.left_dim(), tensor.site_dim()),
        remainder,
    ))
}

/// Replace a site tensor by the `U` factor of its `(l * s, r)` reshape.
///
/// Used on the last site, where `r = 1` and the result is the site tensor
/// normalized to unit norm.
pub fn left_isometry(tensor: &Tensor3<f64>) -> Result<Tensor3<f64>> {
    let decomp = svd(&tensor.as_left_matrix())?;
    Ok(tensor3_from_left_matrix(
        &decomp.u,
        tensor.left_dim(),
        tensor.site_dim(),
    ))
}

/// Replace a site tensor by the `V^T` factor of its `(l, s * r)` reshape.
///
/// Used on the first site, where `l = 1` and the result is the site tensor
/// normalized to unit norm.
pub fn right_isometry(tensor: &Tensor3<f64>) -> Result<Tensor3<f64>> {
    let decomp = svd(&tensor.as_right_matrix())?;
    Ok(tensor3_from_right_matrix(
        &decomp.vt,
        tensor.site_dim(),
        tensor.right_dim(),
    ))
}

/// Check `sum_{l,s} A[l,s,a] A[l,s,b] = delta_ab` within `tol`.
pub fn is_left_isometric(tensor: &Tensor3<f64>, tol: f64) -> bool {
    let mat = tensor.as_left_matrix();
    let (rows, cols) = (mat.dim(0), mat.dim(1));
    for a in 0..cols {
        for b in 0..cols {
            let overlap: f64 = (0..rows).map(|i| mat[[i, a]] * mat[[i, b]]).sum();
            let expected = if a == b { 1.0 } else { 0.0 };
            if (overlap - expected).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Check `sum_{s,r} B[a,s,r] B[b,s,r] = delta_ab` within `tol`.
pub fn is_right_isometric(tensor: &Tensor3<f64>, tol: f64) -> bool {
    let mat = tensor.as_right_matrix();
    let (rows, cols) = (mat.dim(0), mat.dim(1));
    for a in 0..rows {
        for b in 0..rows {
            let overlap: f64 = (0..cols).map(|j| mat[[a, j]] * mat[[b, j]]).sum();
            let expected = if a == b { 1.0 } else { 0.0 };
            if (overlap - expected).abs() > tol {
                return false;
            }
        }
    }
    true
}
