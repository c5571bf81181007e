//! Exact reference energies for small or free systems.

use crate::backend::eigh;
use crate::error::{DmrgError, Result};
use crate::mpo::Mpo;
use crate::types::matrix2_zeros;

/// Ground-state energy of [`Mpo::xx_chain`] on `n_sites` sites.
///
/// By a Jordan-Wigner transformation the chain maps to free fermions with
/// hopping amplitude 2; the ground state fills every negative level of the
/// open-chain hopping matrix.
pub fn xx_chain_ground_energy(n_sites: usize) -> Result<f64> {
    if n_sites == 0 {
        return Err(DmrgError::invalid_config("Chain must have at least one site"));
    }
    let mut hopping = matrix2_zeros(n_sites, n_sites);
    for i in 0..n_sites.saturating_sub(1) {
        hopping[[i, i + 1]] = 1.0;
        hopping[[i + 1, i]] = 1.0;
    }
    let levels = eigh(&hopping)?.values;
    Ok(2.0 * levels.iter().filter(|&&e| e < 0.0).sum::<f64>())
}

/// Lowest eigenvalue of the dense expansion of `mpo`.
///
/// # Errors
/// Fails if the chain is too long to expand (see [`Mpo::to_dense`]).
pub fn dense_ground_energy(mpo: &Mpo) -> Result<f64> {
    let dense = mpo.to_dense()?;
    let values = eigh(&dense)?.values;
    Ok(values[0])
}
