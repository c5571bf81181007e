//! Core tensor types for the DMRG engine
//!
//! All tensors are dense `mdarray` tensors stored in row-major order.
//!
//! - [`Tensor3`]: MPS site tensor, shape `(left, site, right)`
//! - [`Tensor4`]: MPO site tensor, shape `(left, site_out, site_in, right)`.
//!   The same layout `(left, s1, s2, right)` holds a merged two-site wavefunction.
//! - [`Environment`]: boundary tensor, shape `(ket, mpo, bra)`
//! - [`Matrix2`]: plain matrix used at the linear-algebra boundary

use mdarray::DTensor;

/// A 2D matrix represented using mdarray
pub type Matrix2<T> = DTensor<T, 2>;

/// A 3D tensor represented using mdarray
/// Shape is (left_dim, site_dim, right_dim)
pub type Tensor3<T> = DTensor<T, 3>;

/// A 4D tensor represented using mdarray
/// Shape is (left_dim, site_dim_1, site_dim_2, right_dim)
pub type Tensor4<T> = DTensor<T, 4>;

/// Boundary (environment) tensor with shape (ket_dim, mpo_dim, bra_dim)
pub type Environment = DTensor<f64, 3>;

/// Helper functions for Tensor3 operations
pub trait Tensor3Ops<T: Clone + Default> {
    /// Get the left (bond) dimension
    fn left_dim(&self) -> usize;

    /// Get the site (physical) dimension
    fn site_dim(&self) -> usize;

    /// Get the right (bond) dimension
    fn right_dim(&self) -> usize;

    /// Get element at (left, site, right)
    fn get3(&self, l: usize, s: usize, r: usize) -> &T;

    /// Set element at (left, site, right)
    fn set3(&mut self, l: usize, s: usize, r: usize, value: T);

    /// Reshape this tensor to a row-major matrix (left_dim * site_dim, right_dim)
    fn as_left_matrix(&self) -> Matrix2<T>;

    /// Reshape this tensor to a row-major matrix (left_dim, site_dim * right_dim)
    fn as_right_matrix(&self) -> Matrix2<T>;
}

impl<T: Clone + Default> Tensor3Ops<T> for Tensor3<T> {
    fn left_dim(&self) -> usize {
        self.dim(0)
    }

    fn site_dim(&self) -> usize {
        self.dim(1)
    }

    fn right_dim(&self) -> usize {
        self.dim(2)
    }

    fn get3(&self, l: usize, s: usize, r: usize) -> &T {
        &self[[l, s, r]]
    }

    fn set3(&mut self, l: usize, s: usize, r: usize, value: T) {
        self[[l, s, r]] = value;
    }

    fn as_left_matrix(&self) -> Matrix2<T> {
        let site_dim = self.site_dim();
        Matrix2::from_fn([self.left_dim() * site_dim, self.right_dim()], |idx| {
            self[[idx[0] / site_dim, idx[0] % site_dim, idx[1]]].clone()
        })
    }

    fn as_right_matrix(&self) -> Matrix2<T> {
        let right_dim = self.right_dim();
        Matrix2::from_fn([self.left_dim(), self.site_dim() * right_dim], |idx| {
            self[[idx[0], idx[1] / right_dim, idx[1] % right_dim]].clone()
        })
    }
}

/// Helper functions for Tensor4 operations
pub trait Tensor4Ops<T: Clone + Default> {
    /// Get the left (bond) dimension
    fn left_dim(&self) -> usize;

    /// Get the first site (physical) dimension
    fn site_dim_1(&self) -> usize;

    /// Get the second site (physical) dimension
    fn site_dim_2(&self) -> usize;

    /// Get the right (bond) dimension
    fn right_dim(&self) -> usize;

    /// Get element at (left, site1, site2, right)
    fn get4(&self, l: usize, s1: usize, s2: usize, r: usize) -> &T;

    /// Set element at (left, site1, site2, right)
    fn set4(&mut self, l: usize, s1: usize, s2: usize, r: usize, value: T);

    /// Reshape this tensor to a matrix (left_dim * site_dim_1, site_dim_2 * right_dim)
    fn as_center_matrix(&self) -> Matrix2<T>;
}

impl<T: Clone + Default> Tensor4Ops<T> for Tensor4<T> {
    fn left_dim(&self) -> usize {
        self.dim(0)
    }

    fn site_dim_1(&self) -> usize {
        self.dim(1)
    }

    fn site_dim_2(&self) -> usize {
        self.dim(2)
    }

    fn right_dim(&self) -> usize {
        self.dim(3)
    }

    fn get4(&self, l: usize, s1: usize, s2: usize, r: usize) -> &T {
        &self[[l, s1, s2, r]]
    }

    fn set4(&mut self, l: usize, s1: usize, s2: usize, r: usize, value: T) {
        self[[l, s1, s2, r]] = value;
    }

    fn as_center_matrix(&self) -> Matrix2<T> {
        let s1_dim = self.site_dim_1();
        let right_dim = self.right_dim();
        Matrix2::from_fn(
            [self.left_dim() * s1_dim, self.site_dim_2() * right_dim],
            |idx| {
                self[[
                    idx[0] / s1_dim,
                    idx[0] % s1_dim,
                    idx[1] / right_dim,
                    idx[1] % right_dim,
                ]]
                .clone()
            },
        )
    }
}

/// Create a zero-filled Matrix2
pub fn matrix2_zeros<T: Clone + Default>(rows: usize, cols: usize) -> Matrix2<T> {
    Matrix2::from_elem([rows, cols], T::default())
}

/// Create a zero-filled Tensor3
pub fn tensor3_zeros<T: Clone + Default>(
    left_dim: usize,
    site_dim: usize,
    right_dim: usize,
) -> Tensor3<T> {
    Tensor3::from_elem([left_dim, site_dim, right_dim], T::default())
}

/// Create a zero-filled Tensor4
pub fn tensor4_zeros<T: Clone + Default>(
    left_dim: usize,
    site_dim_1: usize,
    site_dim_2: usize,
    right_dim: usize,
) -> Tensor4<T> {
    Tensor4::from_elem([left_dim, site_dim_1, site_dim_2, right_dim], T::default())
}

/// Create a Tensor4 from flat data (row-major order)
///
/// Panics if `data.len()` does not match the shape.
pub fn tensor4_from_data<T: Clone>(
    data: &[T],
    left_dim: usize,
    site_dim_1: usize,
    site_dim_2: usize,
    right_dim: usize,
) -> Tensor4<T> {
    assert_eq!(data.len(), left_dim * site_dim_1 * site_dim_2 * right_dim);
    Tensor4::from_fn([left_dim, site_dim_1, site_dim_2, right_dim], |idx| {
        data[((idx[0] * site_dim_1 + idx[1]) * site_dim_2 + idx[2]) * right_dim + idx[3]].clone()
    })
}

/// Flatten a Tensor4 to a vector (row-major order)
pub fn tensor4_to_vec<T: Clone + Default>(tensor: &Tensor4<T>) -> Vec<T> {
    let (l_dim, s1_dim, s2_dim, r_dim) = (
        tensor.left_dim(),
        tensor.site_dim_1(),
        tensor.site_dim_2(),
        tensor.right_dim(),
    );
    let mut out = Vec::with_capacity(l_dim * s1_dim * s2_dim * r_dim);
    for l in 0..l_dim {
        for s1 in 0..s1_dim {
            for s2 in 0..s2_dim {
                for r in 0..r_dim {
                    out.push(tensor[[l, s1, s2, r]].clone());
                }
            }
        }
    }
    out
}

/// Create a Tensor3 from a row-major matrix of shape (left_dim * site_dim, right_dim)
pub fn tensor3_from_left_matrix<T: Clone>(
    mat: &Matrix2<T>,
    left_dim: usize,
    site_dim: usize,
) -> Tensor3<T> {
    Tensor3::from_fn([left_dim, site_dim, mat.dim(1)], |idx| {
        mat[[idx[0] * site_dim + idx[1], idx[2]]].clone()
    })
}

/// Create a Tensor3 from a row-major matrix of shape (left_dim, site_dim * right_dim)
pub fn tensor3_from_right_matrix<T: Clone>(
    mat: &Matrix2<T>,
    site_dim: usize,
    right_dim: usize,
) -> Tensor3<T> {
    Tensor3::from_fn([mat.dim(0), site_dim, right_dim], |idx| {
        mat[[idx[0], idx[1] * right_dim + idx[2]]].clone()
    })
}

/// Frobenius norm of a Tensor3
pub fn tensor3_norm(tensor: &Tensor3<f64>) -> f64 {
    let mut sum = 0.0;
    for l in 0..tensor.left_dim() {
        for s in 0..tensor.site_dim() {
            for r in 0..tensor.right_dim() {
                let v = tensor[[l, s, r]];
                sum += v * v;
            }
        }
    }
    sum.sqrt()
}
