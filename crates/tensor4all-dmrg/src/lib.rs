#![warn(missing_docs)]
//! Two-site DMRG for ground states of matrix product operators
//!
//! This crate finds the lowest eigenpair of a Hamiltonian given as an MPO by
//! sweeping a two-site variational update along an MPS:
//! - `Dmrg`: the sweep engine (canonicalization, sweep schedule, energy log)
//! - `EffectiveHamiltonian`: the projected two-site Hamiltonian, matrix-free
//! - `eig_lanczos`: restarted Lanczos eigensolver with full re-orthogonalization
//! - `split_two_site`: truncated SVD split of an optimized two-site tensor
//! - `Environments`: the left/right environment array `LR[0..=N]`
//! - `Mpo` model builders (XX chain, Heisenberg chain) and exact references
//!
//! # Example
//!
//! ```
//! use tensor4all_dmrg::{exact, Dmrg, DmrgOptions, Mpo};
//!
//! let mpo = Mpo::heisenberg_chain(4).unwrap();
//! let options = DmrgOptions::new(8).with_num_sweeps(2);
//! let result = Dmrg::new(mpo.clone(), options).unwrap().run().unwrap();
//!
//! let exact = exact::dense_ground_energy(&mpo).unwrap();
//! assert!((result.energy - exact).abs() < 1e-8);
//! ```

pub mod backend;
pub mod contraction;
pub mod decomposition;
pub mod dmrg;
pub mod environment;
pub mod error;
pub mod exact;
pub mod krylov;
pub mod mpo;
pub mod mps;
pub mod options;
pub mod projector;
pub mod types;
pub mod update;

// Re-export main types
pub use decomposition::{split_two_site, TwoSiteSplit};
pub use dmrg::{sweep_bonds, Dmrg, DmrgResult, UpdateReport};
pub use environment::{expectation_value, EnvironmentSide, Environments};
pub use error::{DmrgError, Result};
pub use krylov::{eig_lanczos, safe_normalize, LanczosOptions, LanczosResult};
pub use mpo::Mpo;
pub use mps::Mps;
pub use options::DmrgOptions;
pub use projector::{EffectiveHamiltonian, LinearOperator};
pub use types::{Environment, Matrix2, Tensor3, Tensor3Ops, Tensor4, Tensor4Ops};
pub use update::{update_two_site, SweepDirection, TwoSiteUpdate};
