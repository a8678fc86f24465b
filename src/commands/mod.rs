pub mod basic;
pub mod detailed;

use crate::cli::Suite;
use crate::config::Config;
use crate::models::Summary;
use crate::output::{now_display, Reporter};
use crate::runner::{Probe, ProbeRunner};
use crate::transport::Transport;

pub const UNREACHABLE: &str = "API is not reachable. Stopping tests.";

/// Per-run inputs shared by every suite.
pub struct SuiteContext<'a> {
    pub config: &'a Config,
    pub run_id: &'a str,
    /// A bearer token was supplied.
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEnd {
    Completed(Summary),
    /// The health probe failed; nothing else ran.
    Aborted,
}

pub fn run_suite<T: Transport, R: Reporter>(
    suite: Suite,
    runner: &mut ProbeRunner<T, R>,
    ctx: &SuiteContext<'_>,
) -> RunEnd {
    match suite {
        Suite::Basic => basic::run(runner, ctx),
        Suite::Detailed => detailed::run(runner, ctx),
    }
}

/// What stops a run at the health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthGate {
    /// Only a transport failure.
    Reachable,
    /// A transport failure or a rejected status.
    Accepted,
}

/// Run the health probe; `false` means the run must stop.
fn health_gate<T: Transport, R: Reporter>(
    runner: &mut ProbeRunner<T, R>,
    probe: &Probe,
    gate: HealthGate,
) -> bool {
    let reachable = match runner.probe(probe) {
        None => false,
        Some(_) => {
            gate == HealthGate::Reachable || runner.outcomes().last().is_some_and(|o| o.passed)
        }
    };
    if !reachable {
        runner.abort(UNREACHABLE);
    }
    reachable
}

fn started_fields(base_url: &str, ctx: &SuiteContext<'_>) -> Vec<(&'static str, String)> {
    vec![
        ("Base URL", base_url.to_string()),
        ("Run ID", ctx.run_id.to_string()),
        ("Started at", now_display()),
    ]
}
