//! Options for the DMRG sweep engine.

use crate::error::{DmrgError, Result};
use crate::krylov::LanczosOptions;

/// Options for a two-site DMRG run.
#[derive(Debug, Clone)]
pub struct DmrgOptions {
    /// Maximum retained bond dimension (`chi`).
    pub max_bond_dim: usize,
    /// Number of sweeps after the first (`numsweeps`).
    ///
    /// `num_sweeps + 1` double sweeps are run, each a right-to-left half
    /// sweep followed by a left-to-right half sweep.
    pub num_sweeps: usize,
    /// Local eigensolver options (`maxit`, `krydim`).
    pub lanczos: LanczosOptions,
    /// Seed of the random initial state.
    pub seed: u64,
}

impl Default for DmrgOptions {
    fn default() -> Self {
        Self {
            max_bond_dim: 32,
            num_sweeps: 4,
            lanczos: LanczosOptions::default(),
            seed: 0,
        }
    }
}

impl DmrgOptions {
    /// Create new options with the given bond dimension cap.
    pub fn new(max_bond_dim: usize) -> Self {
        Self {
            max_bond_dim,
            ..Default::default()
        }
    }

    /// Set maximum bond dimension.
    pub fn with_max_bond_dim(mut self, max_bond_dim: usize) -> Self {
        self.max_bond_dim = max_bond_dim;
        self
    }

    /// Set number of sweeps.
    pub fn with_num_sweeps(mut self, num_sweeps: usize) -> Self {
        self.num_sweeps = num_sweeps;
        self
    }

    /// Set Lanczos options.
    pub fn with_lanczos(mut self, lanczos: LanczosOptions) -> Self {
        self.lanczos = lanczos;
        self
    }

    /// Set number of Lanczos restarts.
    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.lanczos = self.lanczos.with_max_restarts(max_restarts);
        self
    }

    /// Set Krylov subspace dimension.
    pub fn with_krylov_dim(mut self, krylov_dim: usize) -> Self {
        self.lanczos = self.lanczos.with_krylov_dim(krylov_dim);
        self
    }

    /// Set the seed of the random initial state.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of double sweeps that [`crate::Dmrg::run`] performs.
    pub fn double_sweeps(&self) -> usize {
        self.num_sweeps + 1
    }

    /// Check the options for a chain of `n_sites` sites.
    ///
    /// # Errors
    /// Returns [`DmrgError::InvalidConfig`] if `max_bond_dim < 1`,
    /// `n_sites < 2`, `max_restarts < 1` or `krylov_dim < 1`.
    pub fn validate(&self, n_sites: usize) -> Result<()> {
        if self.max_bond_dim < 1 {
            return Err(DmrgError::invalid_config(
                "Maximum bond dimension must be at least 1",
            ));
        }
        if n_sites < 2 {
            return Err(DmrgError::invalid_config(format!(
                "Two-site DMRG needs at least 2 sites, got {}",
                n_sites
            )));
        }
        if self.lanczos.max_restarts < 1 {
            return Err(DmrgError::invalid_config(
                "Lanczos needs at least one restart round (maxit >= 1)",
            ));
        }
        if self.lanczos.krylov_dim < 1 {
            return Err(DmrgError::invalid_config(
                "Krylov subspace dimension must be at least 1",
            ));
        }
        Ok(())
    }
}
