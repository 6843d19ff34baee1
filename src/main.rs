//! # Submodule Reconcile CLI
//!
//! Binary entry point for the `submodule-reconcile` command-line tool.
//!
//! It parses the command line with `clap`, sets up logging and hands over to
//! [`submodule_reconcile::driver`]. Any error, including a run in which a
//! submodule failed to reconcile, ends the process with exit code 1.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
