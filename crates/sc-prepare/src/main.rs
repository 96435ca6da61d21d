// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Line Preparation CLI
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Load a configuration, prepare the line once, write it out.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sc_core::pipeline::prepare_line;
use sc_optics::session::OpticsSession;
use sc_types::config::SpaceChargeConfig;
use sc_types::error::SpaceChargeResult;

#[derive(Parser)]
#[command(name = "sc-prepare", about = "Insert and configure space-charge kicks in a ring lattice")]
struct Cli {
    /// JSON configuration file
    config: String,

    /// Lattice file, overriding `lattice_file` from the configuration
    #[arg(long)]
    lattice: Option<String>,

    /// Output line file, overriding `output_file` from the configuration
    #[arg(short, long)]
    output: Option<String>,
}

fn run(cli: Cli) -> SpaceChargeResult<()> {
    let mut config = SpaceChargeConfig::from_file(&cli.config)?;
    if let Some(lattice) = cli.lattice {
        config.lattice_file = lattice;
    }
    if let Some(output) = cli.output {
        config.output_file = output;
    }

    let mut session = OpticsSession::new();
    session.call(&config.lattice_file)?;
    let prepared = prepare_line(&mut session, &config)?;
    prepared.write_line(&config.output_file)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "preparation failed");
            eprintln!("sc-prepare: {e}");
            ExitCode::FAILURE
        }
    }
}
