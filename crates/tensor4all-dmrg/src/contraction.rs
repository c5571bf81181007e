//! Fixed-order tensor contractions used by the sweep engine
//!
//! Every function here is a pure contraction of a small named network:
//! inputs are never mutated and the leg set of the output is fixed by the
//! function. Each network is evaluated as a chain of pairwise contractions
//! in the order that keeps the intermediate tensors smallest for bond
//! dimensions larger than the MPO dimension. Each pairwise step regroups
//! the legs of both operands into matrices (contracted legs last on the
//! left operand, first on the right one) and runs one GEMM through
//! [`backend::matmul`](crate::backend::matmul).
//!
//! All tensors are real, so the conjugated (bra) copy of a site tensor is
//! the tensor itself.
//!
//! ```text
//! two-site merge      environment extension (left)   effective Hamiltonian
//!
//!  -A-B-               +-A-                           +-psi-+
//!   | |                |  |                           | | | |
//!                      L--W-                          L-W-W-R
//!                      |  |                           | | | |
//!                      +-A-
//! ```

use crate::backend::matmul;
use crate::error::{DmrgError, Result};
use crate::types::{Environment, Matrix2, Tensor3, Tensor3Ops, Tensor4, Tensor4Ops};

/// Contract two adjacent site tensors over their shared bond.
///
/// A: (l, s1, m), B: (m, s2, r) -> theta: (l, s1, s2, r)
pub fn merge_two_site(a: &Tensor3<f64>, b: &Tensor3<f64>) -> Result<Tensor4<f64>> {
    DmrgError::check_dim("merge_two_site: shared bond", a.right_dim(), b.left_dim())?;

    let (l_dim, s1_dim) = (a.left_dim(), a.site_dim());
    let (s2_dim, r_dim) = (b.site_dim(), b.right_dim());

    // [(l, s1), m] x [m, (s2, r)]
    let c = matmul(&a.as_left_matrix(), &b.as_right_matrix());
    Ok(Tensor4::from_fn([l_dim, s1_dim, s2_dim, r_dim], |idx| {
        c[[idx[0] * s1_dim + idx[1], idx[2] * r_dim + idx[3]]]
    }))
}

/// Apply the two-site effective Hamiltonian to a two-site tensor.
///
/// psi: (a, s1, s2, b), L: (a, w, a'), W1: (w, s1', s1, w'),
/// W2: (w', s2', s2, w''), R: (b, w'', b') -> (a', s1', s2', b')
///
/// Contraction order: L·psi, then W1, then W2, then R.
pub fn apply_two_site_hamiltonian(
    psi: &Tensor4<f64>,
    left: &Environment,
    w1: &Tensor4<f64>,
    w2: &Tensor4<f64>,
    right: &Environment,
) -> Result<Tensor4<f64>> {
    DmrgError::check_dim("projector: left bond", left.dim(0), psi.left_dim())?;
    DmrgError::check_dim("projector: right bond", right.dim(0), psi.right_dim())?;
    DmrgError::check_dim("projector: left mpo bond", left.dim(1), w1.left_dim())?;
    DmrgError::check_dim("projector: inner mpo bond", w1.right_dim(), w2.left_dim())?;
    DmrgError::check_dim("projector: right mpo bond", right.dim(1), w2.right_dim())?;
    DmrgError::check_dim("projector: first site", w1.site_dim_2(), psi.site_dim_1())?;
    DmrgError::check_dim("projector: second site", w2.site_dim_2(), psi.site_dim_2())?;

    let a_dim = psi.left_dim();
    let b_dim = psi.right_dim();
    let s1_dim = psi.site_dim_1();
    let s2_dim = psi.site_dim_2();
    let s1o_dim = w1.site_dim_1();
    let s2o_dim = w2.site_dim_1();
    let wl_dim = w1.left_dim();
    let wm_dim = w1.right_dim();
    let wr_dim = w2.right_dim();
    let ap_dim = left.dim(2);
    let bp_dim = right.dim(2);

    // t1[(w, a'), (s1, s2, b)] = sum_a L[a, w, a'] psi[a, s1, s2, b]
    let l_mat = Matrix2::from_fn([wl_dim * ap_dim, a_dim], |idx| {
        left[[idx[1], idx[0] / ap_dim, idx[0] % ap_dim]]
    });
    let psi_mat = Matrix2::from_fn([a_dim, s1_dim * s2_dim * b_dim], |idx| {
        let (s1, rest) = (idx[1] / (s2_dim * b_dim), idx[1] % (s2_dim * b_dim));
        psi[[idx[0], s1, rest / b_dim, rest % b_dim]]
    });
    let t1 = matmul(&l_mat, &psi_mat);

    // t2[(a', s2, b), (s1', w')] = sum_{w, s1} t1[w, a', s1, s2, b] W1[w, s1', s1, w']
    let x = Matrix2::from_fn([ap_dim * s2_dim * b_dim, wl_dim * s1_dim], |idx| {
        let (ap, rest) = (idx[0] / (s2_dim * b_dim), idx[0] % (s2_dim * b_dim));
        let (w, s1) = (idx[1] / s1_dim, idx[1] % s1_dim);
        t1[[w * ap_dim + ap, s1 * s2_dim * b_dim + rest]]
    });
    let y = Matrix2::from_fn([wl_dim * s1_dim, s1o_dim * wm_dim], |idx| {
        w1[[
            idx[0] / s1_dim,
            idx[1] / wm_dim,
            idx[0] % s1_dim,
            idx[1] % wm_dim,
        ]]
    });
    let t2 = matmul(&x, &y);

    // t3[(a', s1', b), (s2', w'')] = sum_{w', s2} t2[a', s2, b, s1', w'] W2[w', s2', s2, w'']
    let x = Matrix2::from_fn([ap_dim * s1o_dim * b_dim, wm_dim * s2_dim], |idx| {
        let (ap, rest) = (idx[0] / (s1o_dim * b_dim), idx[0] % (s1o_dim * b_dim));
        let (s1o, b) = (rest / b_dim, rest % b_dim);
        let (wm, s2) = (idx[1] / s2_dim, idx[1] % s2_dim);
        t2[[(ap * s2_dim + s2) * b_dim + b, s1o * wm_dim + wm]]
    });
    let y = Matrix2::from_fn([wm_dim * s2_dim, s2o_dim * wr_dim], |idx| {
        w2[[
            idx[0] / s2_dim,
            idx[1] / wr_dim,
            idx[0] % s2_dim,
            idx[1] % wr_dim,
        ]]
    });
    let t3 = matmul(&x, &y);

    // out[(a', s1', s2'), b'] = sum_{b, w''} t3[a', s1', b, s2', w''] R[b, w'', b']
    let x = Matrix2::from_fn([ap_dim * s1o_dim * s2o_dim, b_dim * wr_dim], |idx| {
        let (ap, rest) = (idx[0] / (s1o_dim * s2o_dim), idx[0] % (s1o_dim * s2o_dim));
        let (s1o, s2o) = (rest / s2o_dim, rest % s2o_dim);
        let (b, wr) = (idx[1] / wr_dim, idx[1] % wr_dim);
        t3[[(ap * s1o_dim + s1o) * b_dim + b, s2o * wr_dim + wr]]
    });
    let y = Matrix2::from_fn([b_dim * wr_dim, bp_dim], |idx| {
        right[[idx[0] / wr_dim, idx[0] % wr_dim, idx[1]]]
    });
    let out = matmul(&x, &y);

    Ok(Tensor4::from_fn([ap_dim, s1o_dim, s2o_dim, bp_dim], |idx| {
        out[[(idx[0] * s1o_dim + idx[1]) * s2o_dim + idx[2], idx[3]]]
    }))
}

/// Extend a left environment by one site.
///
/// L: (a, w, a'), A: (a, s, b), W: (w, s', s, w'), A*: (a', s', b') -> (b, w', b')
pub fn extend_left(env: &Environment, a: &Tensor3<f64>, w: &Tensor4<f64>) -> Result<Environment> {
    DmrgError::check_dim("left environment: ket bond", env.dim(0), a.left_dim())?;
    DmrgError::check_dim("left environment: bra bond", env.dim(2), a.left_dim())?;
    DmrgError::check_dim("left environment: mpo bond", env.dim(1), w.left_dim())?;
    DmrgError::check_dim("left environment: site", w.site_dim_2(), a.site_dim())?;
    DmrgError::check_dim("left environment: site", w.site_dim_1(), a.site_dim())?;

    let (a_dim, s_dim, b_dim) = (a.left_dim(), a.site_dim(), a.right_dim());
    let wl_dim = w.left_dim();
    let wr_dim = w.right_dim();

    // t1[(w, a'), (s, b)] = sum_a L[a, w, a'] A[a, s, b]
    let l_mat = Matrix2::from_fn([wl_dim * a_dim, a_dim], |idx| {
        env[[idx[1], idx[0] / a_dim, idx[0] % a_dim]]
    });
    let t1 = matmul(&l_mat, &a.as_right_matrix());

    // t2[(a', b), (s', w')] = sum_{w, s} t1[w, a', s, b] W[w, s', s, w']
    let x = Matrix2::from_fn([a_dim * b_dim, wl_dim * s_dim], |idx| {
        let (ap, b) = (idx[0] / b_dim, idx[0] % b_dim);
        let (wl, s) = (idx[1] / s_dim, idx[1] % s_dim);
        t1[[wl * a_dim + ap, s * b_dim + b]]
    });
    let y = Matrix2::from_fn([wl_dim * s_dim, s_dim * wr_dim], |idx| {
        w[[idx[0] / s_dim, idx[1] / wr_dim, idx[0] % s_dim, idx[1] % wr_dim]]
    });
    let t2 = matmul(&x, &y);

    // out[(b, w'), b'] = sum_{a', s'} t2[a', b, s', w'] A*[a', s', b']
    let x = Matrix2::from_fn([b_dim * wr_dim, a_dim * s_dim], |idx| {
        let (b, wr) = (idx[0] / wr_dim, idx[0] % wr_dim);
        let (ap, so) = (idx[1] / s_dim, idx[1] % s_dim);
        t2[[ap * b_dim + b, so * wr_dim + wr]]
    });
    let out = matmul(&x, &a.as_left_matrix());

    Ok(Environment::from_fn([b_dim, wr_dim, b_dim], |idx| {
        out[[idx[0] * wr_dim + idx[1], idx[2]]]
    }))
}

/// Extend a right environment by one site.
///
/// B: (a, s, b), W: (w, s', s, w'), B*: (a', s', b'), R: (b, w', b') -> (a, w, a')
pub fn extend_right(env: &Environment, b: &Tensor3<f64>, w: &Tensor4<f64>) -> Result<Environment> {
    DmrgError::check_dim("right environment: ket bond", env.dim(0), b.right_dim())?;
    DmrgError::check_dim("right environment: bra bond", env.dim(2), b.right_dim())?;
    DmrgError::check_dim("right environment: mpo bond", env.dim(1), w.right_dim())?;
    DmrgError::check_dim("right environment: site", w.site_dim_2(), b.site_dim())?;
    DmrgError::check_dim("right environment: site", w.site_dim_1(), b.site_dim())?;

    let (a_dim, s_dim, b_dim) = (b.left_dim(), b.site_dim(), b.right_dim());
    let wl_dim = w.left_dim();
    let wr_dim = w.right_dim();

    // t1[(a, s), (w', b')] = sum_b B[a, s, b] R[b, w', b']
    let r_mat = Matrix2::from_fn([b_dim, wr_dim * b_dim], |idx| {
        env[[idx[0], idx[1] / b_dim, idx[1] % b_dim]]
    });
    let t1 = matmul(&b.as_left_matrix(), &r_mat);

    // t2[(a, b'), (w, s')] = sum_{s, w'} t1[a, s, w', b'] W[w, s', s, w']
    let x = Matrix2::from_fn([a_dim * b_dim, s_dim * wr_dim], |idx| {
        let (a_idx, bp) = (idx[0] / b_dim, idx[0] % b_dim);
        let (s, wr) = (idx[1] / wr_dim, idx[1] % wr_dim);
        t1[[a_idx * s_dim + s, wr * b_dim + bp]]
    });
    let y = Matrix2::from_fn([s_dim * wr_dim, wl_dim * s_dim], |idx| {
        w[[idx[1] / s_dim, idx[1] % s_dim, idx[0] / wr_dim, idx[0] % wr_dim]]
    });
    let t2 = matmul(&x, &y);

    // out[(a, w), a'] = sum_{s', b'} t2[a, b', w, s'] B*[a', s', b']
    let x = Matrix2::from_fn([a_dim * wl_dim, s_dim * b_dim], |idx| {
        let (a_idx, wl) = (idx[0] / wl_dim, idx[0] % wl_dim);
        let (so, bp) = (idx[1] / b_dim, idx[1] % b_dim);
        t2[[a_idx * b_dim + bp, wl * s_dim + so]]
    });
    let b_mat = Matrix2::from_fn([s_dim * b_dim, a_dim], |idx| {
        b[[idx[1], idx[0] / b_dim, idx[0] % b_dim]]
    });
    let out = matmul(&x, &b_mat);

    Ok(Environment::from_fn([a_dim, wl_dim, a_dim], |idx| {
        out[[idx[0] * wl_dim + idx[1], idx[2]]]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{tensor3_zeros, tensor4_zeros};
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_tensor3(rng: &mut ChaCha8Rng, l: usize, s: usize, r: usize) -> Tensor3<f64> {
        Tensor3::from_fn([l, s, r], |_| rng.gen::<f64>() * 2.0 - 1.0)
    }

    fn random_tensor4(rng: &mut ChaCha8Rng, dims: [usize; 4]) -> Tensor4<f64> {
        Tensor4::from_fn(dims, |_| rng.gen::<f64>() * 2.0 - 1.0)
    }

    fn random_env(rng: &mut ChaCha8Rng, dims: [usize; 3]) -> Environment {
        Environment::from_fn(dims, |_| rng.gen::<f64>() * 2.0 - 1.0)
    }

    /// Identity MPO site tensor with a single virtual channel
    fn identity_mpo(d: usize) -> Tensor4<f64> {
        let mut w = tensor4_zeros(1, d, d, 1);
        for s in 0..d {
            w.set4(0, s, s, 0, 1.0);
        }
        w
    }

    fn trivial_env() -> Environment {
        Environment::from_elem([1, 1, 1], 1.0)
    }

    #[test]
    fn test_merge_two_site_values() {
        let mut a: Tensor3<f64> = tensor3_zeros(1, 2, 2);
        let mut b: Tensor3<f64> = tensor3_zeros(2, 2, 1);
        a.set3(0, 0, 0, 1.0);
        a.set3(0, 1, 1, 2.0);
        b.set3(0, 1, 0, 3.0);
        b.set3(1, 0, 0, 5.0);

        let theta = merge_two_site(&a, &b).unwrap();
        assert_eq!(theta.dim(0), 1);
        assert_eq!(theta.dim(3), 1);
        assert_eq!(theta[[0, 0, 1, 0]], 3.0);
        assert_eq!(theta[[0, 1, 0, 0]], 10.0);
        assert_eq!(theta[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_merge_two_site_bond_mismatch() {
        let a: Tensor3<f64> = tensor3_zeros(1, 2, 3);
        let b: Tensor3<f64> = tensor3_zeros(2, 2, 1);
        let err = merge_two_site(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            DmrgError::DimensionMismatch {
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_identity_hamiltonian_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let psi = random_tensor4(&mut rng, [1, 2, 2, 1]);
        let w = identity_mpo(2);
        let out = apply_two_site_hamiltonian(&psi, &trivial_env(), &w, &w, &trivial_env())
            .unwrap();
        for s1 in 0..2 {
            for s2 in 0..2 {
                assert_abs_diff_eq!(out[[0, s1, s2, 0]], psi[[0, s1, s2, 0]], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_hamiltonian_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (a, b, d, dw) = (2, 3, 2, 3);
        let psi = random_tensor4(&mut rng, [a, d, d, b]);
        let left = random_env(&mut rng, [a, dw, a]);
        let right = random_env(&mut rng, [b, dw, b]);
        let w1 = random_tensor4(&mut rng, [dw, d, d, dw]);
        let w2 = random_tensor4(&mut rng, [dw, d, d, dw]);

        let out = apply_two_site_hamiltonian(&psi, &left, &w1, &w2, &right).unwrap();

        for ap in 0..a {
            for s1o in 0..d {
                for s2o in 0..d {
                    for bp in 0..b {
                        let mut expected = 0.0;
                        for ai in 0..a {
                            for s1 in 0..d {
                                for s2 in 0..d {
                                    for bi in 0..b {
                                        for wl in 0..dw {
                                            for wm in 0..dw {
                                                for wr in 0..dw {
                                                    expected += left[[ai, wl, ap]]
                                                        * psi[[ai, s1, s2, bi]]
                                                        * w1[[wl, s1o, s1, wm]]
                                                        * w2[[wm, s2o, s2, wr]]
                                                        * right[[bi, wr, bp]];
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        assert_abs_diff_eq!(out[[ap, s1o, s2o, bp]], expected, epsilon = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_hamiltonian_rejects_mismatched_environment() {
        let psi: Tensor4<f64> = tensor4_zeros(2, 2, 2, 1);
        let w = identity_mpo(2);
        let err = apply_two_site_hamiltonian(&psi, &trivial_env(), &w, &w, &trivial_env())
            .unwrap_err();
        assert!(matches!(err, DmrgError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_extend_left_of_isometry_is_identity() {
        // A left-orthogonal tensor with an identity MPO gives an identity environment
        let mut a: Tensor3<f64> = tensor3_zeros(1, 2, 2);
        a.set3(0, 0, 0, 1.0);
        a.set3(0, 1, 1, 1.0);
        let env = extend_left(&trivial_env(), &a, &identity_mpo(2)).unwrap();
        assert_eq!(env.dim(0), 2);
        assert_eq!(env.dim(1), 1);
        assert_abs_diff_eq!(env[[0, 0, 0]], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(env[[1, 0, 1]], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(env[[0, 0, 1]], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_extend_left_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (a_dim, d, b_dim, wl, wr) = (3, 2, 4, 2, 3);
        let env = random_env(&mut rng, [a_dim, wl, a_dim]);
        let a = random_tensor3(&mut rng, a_dim, d, b_dim);
        let w = random_tensor4(&mut rng, [wl, d, d, wr]);

        let out = extend_left(&env, &a, &w).unwrap();
        assert_eq!(out.dim(0), b_dim);
        assert_eq!(out.dim(1), wr);
        assert_eq!(out.dim(2), b_dim);

        for b in 0..b_dim {
            for w_out in 0..wr {
                for bp in 0..b_dim {
                    let mut expected = 0.0;
                    for ai in 0..a_dim {
                        for ap in 0..a_dim {
                            for w_in in 0..wl {
                                for s in 0..d {
                                    for so in 0..d {
                                        expected += env[[ai, w_in, ap]]
                                            * a[[ai, s, b]]
                                            * w[[w_in, so, s, w_out]]
                                            * a[[ap, so, bp]];
                                    }
                                }
                            }
                        }
                    }
                    assert_abs_diff_eq!(out[[b, w_out, bp]], expected, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_extend_right_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let (a_dim, d, b_dim, wl, wr) = (4, 2, 3, 3, 2);
        let env = random_env(&mut rng, [b_dim, wr, b_dim]);
        let b = random_tensor3(&mut rng, a_dim, d, b_dim);
        let w = random_tensor4(&mut rng, [wl, d, d, wr]);

        let out = extend_right(&env, &b, &w).unwrap();
        assert_eq!(out.dim(0), a_dim);
        assert_eq!(out.dim(1), wl);
        assert_eq!(out.dim(2), a_dim);

        for ai in 0..a_dim {
            for w_out in 0..wl {
                for ap in 0..a_dim {
                    let mut expected = 0.0;
                    for bi in 0..b_dim {
                        for bp in 0..b_dim {
                            for w_in in 0..wr {
                                for s in 0..d {
                                    for so in 0..d {
                                        expected += b[[ai, s, bi]]
                                            * w[[w_out, so, s, w_in]]
                                            * env[[bi, w_in, bp]]
                                            * b[[ap, so, bp]];
                                    }
                                }
                            }
                        }
                    }
                    assert_abs_diff_eq!(out[[ai, w_out, ap]], expected, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_left_and_right_extensions_agree_on_full_chain() {
        // <psi|H|psi> computed from the left and from the right must agree
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sites = [
            random_tensor3(&mut rng, 1, 2, 2),
            random_tensor3(&mut rng, 2, 2, 3),
            random_tensor3(&mut rng, 3, 2, 1),
        ];
        let w = random_tensor4(&mut rng, [2, 2, 2, 2]);
        let mut left = Environment::from_elem([1, 2, 1], 0.0);
        left[[0, 0, 0]] = 1.0;
        let mut right = Environment::from_elem([1, 2, 1], 0.0);
        right[[0, 1, 0]] = 1.0;

        let mut from_left = left.clone();
        for site in &sites {
            from_left = extend_left(&from_left, site, &w).unwrap();
        }
        let mut from_right = right.clone();
        for site in sites.iter().rev() {
            from_right = extend_right(&from_right, site, &w).unwrap();
        }

        let value_left = from_left[[0, 1, 0]];
        let value_right = from_right[[0, 0, 0]];
        assert_abs_diff_eq!(value_left, value_right, epsilon = 1e-12);
    }
}
