use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use leoprobe::cli::Cli;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    leoprobe::run(cli)
}
