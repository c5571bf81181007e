//! Matrix product operators
//!
//! An [`Mpo`] is a chain of [`Tensor4`] site tensors with layout
//! `(left_virtual, site_out, site_in, right_virtual)` together with the two
//! virtual channels that close the chain: the left boundary selects
//! `start_channel` of the first tensor's left leg and the right boundary
//! selects `end_channel` of the last tensor's right leg.

use crate::backend::matmul;
use crate::error::{DmrgError, Result};
use crate::types::{matrix2_zeros, tensor4_zeros, Environment, Matrix2, Tensor4, Tensor4Ops};

/// Largest `d^N` that [`Mpo::to_dense`] will expand.
pub const MAX_DENSE_DIM: usize = 1 << 12;

/// A matrix product operator on an open chain.
#[derive(Debug, Clone)]
pub struct Mpo {
    tensors: Vec<Tensor4<f64>>,
    start_channel: usize,
    end_channel: usize,
}

/// Spin-1/2 operator matrices indexed `[out][in]`, basis `(up, down)`
mod ops {
    pub const IDENTITY: [[f64; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];
    pub const S_PLUS: [[f64; 2]; 2] = [[0.0, 1.0], [0.0, 0.0]];
    pub const S_MINUS: [[f64; 2]; 2] = [[0.0, 0.0], [1.0, 0.0]];
    pub const PAULI_X: [[f64; 2]; 2] = [[0.0, 1.0], [1.0, 0.0]];
    /// `i * Y`, which is real
    pub const PAULI_IY: [[f64; 2]; 2] = [[0.0, 1.0], [-1.0, 0.0]];
    pub const PAULI_Z: [[f64; 2]; 2] = [[1.0, 0.0], [0.0, -1.0]];
}

fn set_block(w: &mut Tensor4<f64>, left: usize, right: usize, op: &[[f64; 2]; 2], scale: f64) {
    for (s_out, row) in op.iter().enumerate() {
        for (s_in, &value) in row.iter().enumerate() {
            w.set4(left, s_out, s_in, right, scale * value);
        }
    }
}

impl Mpo {
    /// Create an MPO from its site tensors and boundary channels.
    ///
    /// # Errors
    /// Returns an error if the chain is empty, adjacent virtual legs do not
    /// match, a site tensor is not square in its physical legs, or a
    /// boundary channel is out of range.
    pub fn new(tensors: Vec<Tensor4<f64>>, start_channel: usize, end_channel: usize) -> Result<Self> {
        let (first, last) = match (tensors.first(), tensors.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DmrgError::invalid_config("MPO must have at least one site")),
        };
        if start_channel >= first.left_dim() {
            return Err(DmrgError::invalid_config(format!(
                "Start channel {} out of range for left virtual dimension {}",
                start_channel,
                first.left_dim()
            )));
        }
        if end_channel >= last.right_dim() {
            return Err(DmrgError::invalid_config(format!(
                "End channel {} out of range for right virtual dimension {}",
                end_channel,
                last.right_dim()
            )));
        }
        for t in &tensors {
            DmrgError::check_dim("mpo: physical legs", t.site_dim_1(), t.site_dim_2())?;
        }
        for pair in tensors.windows(2) {
            DmrgError::check_dim("mpo: virtual bond", pair[0].right_dim(), pair[1].left_dim())?;
        }
        Ok(Self {
            tensors,
            start_channel,
            end_channel,
        })
    }

    /// Repeat one site tensor `n_sites` times.
    pub fn uniform(
        n_sites: usize,
        tensor: Tensor4<f64>,
        start_channel: usize,
        end_channel: usize,
    ) -> Result<Self> {
        Self::new(vec![tensor; n_sites], start_channel, end_channel)
    }

    /// XX chain `H = 2 sum_i (S+_i S-_{i+1} + S-_i S+_{i+1})` on spin-1/2 sites.
    ///
    /// Virtual dimension 4, start channel 0, end channel 3.
    pub fn xx_chain(n_sites: usize) -> Result<Self> {
        let sqrt2 = std::f64::consts::SQRT_2;
        let mut w = tensor4_zeros(4, 2, 2, 4);
        set_block(&mut w, 0, 0, &ops::IDENTITY, 1.0);
        set_block(&mut w, 3, 3, &ops::IDENTITY, 1.0);
        set_block(&mut w, 0, 1, &ops::S_PLUS, sqrt2);
        set_block(&mut w, 2, 3, &ops::S_PLUS, sqrt2);
        set_block(&mut w, 0, 2, &ops::S_MINUS, sqrt2);
        set_block(&mut w, 1, 3, &ops::S_MINUS, sqrt2);
        Self::uniform(n_sites, w, 0, 3)
    }

    /// Heisenberg chain `H = sum_i (X_i X_{i+1} + Y_i Y_{i+1} + Z_i Z_{i+1})`
    /// in Pauli matrices.
    ///
    /// Virtual dimension 5, start channel 0, end channel 4. The `YY` term is
    /// carried as `-(iY)(iY)` so every entry is real.
    pub fn heisenberg_chain(n_sites: usize) -> Result<Self> {
        let mut w = tensor4_zeros(5, 2, 2, 5);
        set_block(&mut w, 0, 0, &ops::IDENTITY, 1.0);
        set_block(&mut w, 0, 1, &ops::PAULI_X, 1.0);
        set_block(&mut w, 0, 2, &ops::PAULI_IY, 1.0);
        set_block(&mut w, 0, 3, &ops::PAULI_Z, 1.0);
        set_block(&mut w, 1, 4, &ops::PAULI_X, 1.0);
        set_block(&mut w, 2, 4, &ops::PAULI_IY, -1.0);
        set_block(&mut w, 3, 4, &ops::PAULI_Z, 1.0);
        set_block(&mut w, 4, 4, &ops::IDENTITY, 1.0);
        Self::uniform(n_sites, w, 0, 4)
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the chain is empty (never true for a constructed MPO)
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Site tensor at `i`
    pub fn site_tensor(&self, i: usize) -> &Tensor4<f64> {
        &self.tensors[i]
    }

    /// All site tensors
    pub fn site_tensors(&self) -> &[Tensor4<f64>] {
        &self.tensors
    }

    /// Physical dimension of site `i`
    pub fn site_dim(&self, i: usize) -> usize {
        self.tensors[i].site_dim_1()
    }

    /// Physical dimensions of all sites
    pub fn site_dims(&self) -> Vec<usize> {
        self.tensors.iter().map(|t| t.site_dim_1()).collect()
    }

    /// Left boundary channel
    pub fn start_channel(&self) -> usize {
        self.start_channel
    }

    /// Right boundary channel
    pub fn end_channel(&self) -> usize {
        self.end_channel
    }

    /// Left boundary environment `LR[0]`, shape `(1, D_left, 1)`
    pub fn left_boundary(&self) -> Environment {
        let dim = self.tensors[0].left_dim();
        let mut env = Environment::from_elem([1, dim, 1], 0.0);
        env[[0, self.start_channel, 0]] = 1.0;
        env
    }

    /// Right boundary environment `LR[N]`, shape `(1, D_right, 1)`
    pub fn right_boundary(&self) -> Environment {
        let dim = self.tensors[self.len() - 1].right_dim();
        let mut env = Environment::from_elem([1, dim, 1], 0.0);
        env[[0, self.end_channel, 0]] = 1.0;
        env
    }

    /// Expand the operator into a dense `prod(d_i) × prod(d_i)` matrix.
    ///
    /// Row and column indices enumerate site states with site 0 most
    /// significant.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] if the dense dimension exceeds
    /// [`MAX_DENSE_DIM`].
    pub fn to_dense(&self) -> Result<Matrix2<f64>> {
        let mut total = 1usize;
        for d in self.site_dims() {
            total = total.saturating_mul(d);
            if total > MAX_DENSE_DIM {
                return Err(DmrgError::invalid_config(format!(
                    "Dense expansion limited to dimension {}",
                    MAX_DENSE_DIM
                )));
            }
        }

        // acc[(row, col), w] for the sites contracted so far
        let mut dim = 1;
        let w_first = self.tensors[0].left_dim();
        let mut acc: Matrix2<f64> = matrix2_zeros(1, w_first);
        acc[[0, self.start_channel]] = 1.0;

        for t in &self.tensors {
            let (w_dim, d, w_next) = (t.left_dim(), t.site_dim_1(), t.right_dim());
            // [(row, col), w] x [w, (s_out, s_in, w')]
            let w_mat = Matrix2::from_fn([w_dim, d * d * w_next], |idx| {
                let (s_out, rest) = (idx[1] / (d * w_next), idx[1] % (d * w_next));
                t[[idx[0], s_out, rest / w_next, rest % w_next]]
            });
            let product = matmul(&acc, &w_mat);

            let new_dim = dim * d;
            acc = Matrix2::from_fn([new_dim * new_dim, w_next], |idx| {
                let (r, c) = (idx[0] / new_dim, idx[0] % new_dim);
                let (row, s_out) = (r / d, r % d);
                let (col, s_in) = (c / d, c % d);
                product[[row * dim + col, (s_out * d + s_in) * w_next + idx[1]]]
            });
            dim = new_dim;
        }

        let dense = Matrix2::from_fn([dim, dim], |idx| {
            acc[[idx[0] * dim + idx[1], self.end_channel]]
        });
        Ok(dense)
    }
}
