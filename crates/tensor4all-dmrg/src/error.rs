//! Error types for DMRG operations

use thiserror::Error;

/// Result type for DMRG operations
pub type Result<T> = std::result::Result<T, DmrgError>;

/// Errors that can occur during DMRG operations
#[derive(Error, Debug)]
pub enum DmrgError {
    /// Configuration rejected at setup
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the rejected option
        message: String,
    },

    /// Leg dimensions of tensors handed to a contraction do not match
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// The contraction or reshape where the mismatch occurred
        context: &'static str,
        /// The expected dimension
        expected: usize,
        /// The actual dimension
        got: usize,
    },

    /// Length mismatch between chains (MPS, MPO, environments)
    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// The expected length
        expected: usize,
        /// The actual length provided
        got: usize,
    },

    /// Bond index out of range
    #[error("Invalid bond {bond} for a chain of {n_sites} sites")]
    InvalidBond {
        /// The requested bond (between sites `bond` and `bond + 1`)
        bond: usize,
        /// Number of sites in the chain
        n_sites: usize,
    },

    /// An environment slot does not hold the side a bond needs
    #[error("Environment slot {slot} does not hold a valid {expected} environment")]
    StaleEnvironment {
        /// Index `k` of the slot in `LR[0..=N]`
        slot: usize,
        /// Side the slot was expected to summarize
        expected: &'static str,
    },

    /// Dense factorization failed in the linear-algebra backend
    #[error("Factorization failed: {message}")]
    Factorization {
        /// Description of the factorization failure
        message: String,
    },
}

impl DmrgError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn check_dim(context: &'static str, expected: usize, got: usize) -> Result<()> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                context,
                expected,
                got,
            })
        }
    }
}
