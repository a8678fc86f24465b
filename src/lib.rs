pub mod checks;
pub mod cli;
pub mod commands;
pub mod config;
pub mod helpers;
pub mod id;
pub mod models;
pub mod output;
pub mod runner;
pub mod transport;

#[cfg(test)]
mod test_support;

use std::process::ExitCode;

use anyhow::Result;
use jiff::Timestamp;
use tracing::{info, Level};

use cli::Cli;
use commands::{RunEnd, SuiteContext};
use config::Config;
use models::{Outcome, Summary};
use output::{Reporter, RunReport, SilentReporter, TerminalReporter};
use runner::ProbeRunner;
use transport::HttpTransport;

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn execute<R: Reporter>(
    cli: &Cli,
    transport: HttpTransport,
    reporter: R,
    ctx: &SuiteContext<'_>,
) -> (RunEnd, Vec<Outcome>) {
    let mut runner = ProbeRunner::new(transport, reporter);
    let end = commands::run_suite(cli.suite, &mut runner, ctx);
    (end, runner.into_outcomes())
}

/// Whether a finished run should end the process with a failure status.
pub fn fails_run(config: &Config, aborted: bool, summary: &Summary) -> bool {
    config.fail_on_error && (aborted || !summary.all_passed())
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    init_tracing(cli.verbose);

    let config = Config::resolve(&cli)?;
    let token = cli.token.as_deref().filter(|t| !t.is_empty());
    let transport = HttpTransport::new(&config, token)?;
    let run_id = id::run_id();
    let started_at = Timestamp::now();

    info!(
        suite = %cli.suite,
        base_url = %config.base_url,
        run_id = %run_id,
        authenticated = token.is_some(),
        "starting probe run"
    );

    let ctx = SuiteContext {
        config: &config,
        run_id: &run_id,
        authenticated: token.is_some(),
    };

    let (end, outcomes) = if cli.json {
        execute(&cli, transport, SilentReporter, &ctx)
    } else {
        execute(&cli, transport, TerminalReporter::stdout(), &ctx)
    };

    let aborted = end == RunEnd::Aborted;
    let summary = match end {
        RunEnd::Completed(summary) => summary,
        RunEnd::Aborted => Summary::of(&outcomes),
    };

    info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        aborted,
        "probe run finished"
    );

    if cli.json {
        output::print_json_report(&RunReport {
            suite: cli.suite,
            base_url: &config.base_url,
            run_id: &run_id,
            authenticated: token.is_some(),
            started_at,
            completed_at: Timestamp::now(),
            aborted,
            summary: &summary,
            outcomes: &outcomes,
        })?;
    }

    if fails_run(&config, aborted, &summary) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
