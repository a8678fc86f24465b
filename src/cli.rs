use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(Parser, Debug)]
#[command(name = "leoprobe")]
#[command(about = "Run scripted conformance probes against the LeoConnect API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Probe suite to run
    #[arg(value_enum, default_value_t = Suite::Basic)]
    pub suite: Suite,

    /// Bearer token; enables authenticated mode in the detailed suite
    #[arg(env = "LEOPROBE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the API under test
    #[arg(long, env = "LEOPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Exit with a non-zero status when any probe fails
    #[arg(long)]
    pub strict: bool,

    /// Print a JSON run report instead of streaming terminal output
    #[arg(long)]
    pub json: bool,

    /// Increase diagnostic logging on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Suite {
    /// Broad reachability sweep with lenient status expectations
    Basic,
    /// Deeper structural analysis, optionally authenticated
    Detailed,
}
