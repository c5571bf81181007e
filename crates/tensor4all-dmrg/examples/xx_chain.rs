//! Two-site DMRG for the XX chain, compared against the free-fermion energy.
//!
//! Usage: `cargo run --example xx_chain -- --sites 20 --chi 32`
//!
//! Set `RUST_LOG=tensor4all_dmrg=debug` to see every local update.

use anyhow::{Context, Result};
use clap::Parser;
use tensor4all_dmrg::{exact, Dmrg, DmrgOptions, Mpo};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xx_chain", about = "Two-site DMRG for the XX chain")]
struct Cli {
    /// Number of sites
    #[arg(long, default_value_t = 20)]
    sites: usize,

    /// Maximum bond dimension
    #[arg(long, default_value_t = 32)]
    chi: usize,

    /// Number of sweeps after the first double sweep
    #[arg(long, default_value_t = 4)]
    sweeps: usize,

    /// Lanczos restarts per local update
    #[arg(long, default_value_t = 2)]
    maxit: usize,

    /// Krylov subspace dimension
    #[arg(long, default_value_t = 4)]
    krydim: usize,

    /// Seed of the random initial state
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mpo = Mpo::xx_chain(cli.sites).context("Failed to build the XX chain MPO")?;
    let options = DmrgOptions::new(cli.chi)
        .with_num_sweeps(cli.sweeps)
        .with_max_restarts(cli.maxit)
        .with_krylov_dim(cli.krydim)
        .with_seed(cli.seed);

    let exact_energy =
        exact::xx_chain_ground_energy(cli.sites).context("Failed to compute the exact energy")?;

    let start = std::time::Instant::now();
    let result = Dmrg::new(mpo, options)
        .context("Invalid DMRG setup")?
        .run()
        .context("DMRG sweep failed")?;
    let elapsed = start.elapsed();

    println!("{:>6} {:>6} {:>5} {:>20} {:>12}", "step", "sweep", "dir", "energy", "error");
    for (step, report) in result.reports.iter().enumerate() {
        println!(
            "{:>6} {:>6} {:>5} {:>20.12} {:>12.3e}",
            step,
            report.sweep,
            report.direction.to_string(),
            report.energy,
            report.energy - exact_energy
        );
    }

    println!();
    println!("N = {}, chi = {}", cli.sites, cli.chi);
    println!("DMRG energy:  {:.12}", result.energy);
    println!("Exact energy: {:.12}", exact_energy);
    println!("Error:        {:.3e}", result.energy - exact_energy);
    println!("Bond dims:    {:?}", result.mps.bond_dims());
    println!("Elapsed:      {elapsed:.3?}");

    Ok(())
}
