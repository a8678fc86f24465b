use std::io::{self, Write};

use anyhow::Result;
use console::{style, Term};
use serde::Serialize;
use textwrap::wrap;

use crate::cli::Suite;
use crate::models::{Outcome, Summary};

const RULE_WIDTH: usize = 60;
const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sink for everything a run wants to show a human.
///
/// Only [`Reporter::report`] is required; the other hooks are presentation
/// extras that quiet or capturing sinks can ignore.
pub trait Reporter {
    fn report(&mut self, outcome: &Outcome) -> Result<()>;

    fn banner(&mut self, _title: &str, _fields: &[(&str, String)]) -> Result<()> {
        Ok(())
    }

    fn section(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    /// Supplementary text shown under the preceding outcome.
    fn detail(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn note(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn abort(&mut self, _reason: &str) -> Result<()> {
        Ok(())
    }

    fn summary(&mut self, _summary: &Summary) -> Result<()> {
        Ok(())
    }
}

/// Discards everything. Used when the run ends in a JSON report instead.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&mut self, _outcome: &Outcome) -> Result<()> {
        Ok(())
    }
}

/// Colored, wrapped, print-as-you-go terminal output.
pub struct TerminalReporter<W: Write> {
    w: W,
    width: usize,
}

impl TerminalReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal_width())
    }
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(w: W, width: usize) -> Self {
        Self { w, width }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    fn rule(&mut self) -> Result<()> {
        writeln!(self.w, "{}", style("=".repeat(RULE_WIDTH)).blue())?;
        Ok(())
    }
}

impl<W: Write> Reporter for TerminalReporter<W> {
    fn report(&mut self, outcome: &Outcome) -> Result<()> {
        let status = if outcome.passed {
            style("✓ PASS").green()
        } else {
            style("✗ FAIL").red()
        };
        writeln!(self.w, "{} {}", status, style(&outcome.name).bold())?;
        if !outcome.message.is_empty() {
            write_wrapped(&mut self.w, "  ", &outcome.message, self.width)?;
        }
        Ok(())
    }

    fn banner(&mut self, title: &str, fields: &[(&str, String)]) -> Result<()> {
        writeln!(self.w)?;
        writeln!(self.w, "{}", style("=".repeat(RULE_WIDTH)).blue().bold())?;
        writeln!(self.w, "{}", style(title).bold())?;
        for (label, value) in fields {
            writeln!(self.w, "{}", style(format!("{label}: {value}")).bold())?;
        }
        writeln!(self.w, "{}", style("=".repeat(RULE_WIDTH)).blue().bold())?;
        Ok(())
    }

    fn section(&mut self, title: &str) -> Result<()> {
        writeln!(self.w)?;
        self.rule()?;
        writeln!(self.w, "{}", style(title).bold())?;
        self.rule()?;
        writeln!(self.w)?;
        Ok(())
    }

    fn detail(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            writeln!(self.w, "  {}", style(line).cyan())?;
        }
        Ok(())
    }

    fn note(&mut self, text: &str) -> Result<()> {
        writeln!(self.w, "  {}", style(text).yellow())?;
        Ok(())
    }

    fn abort(&mut self, reason: &str) -> Result<()> {
        writeln!(self.w)?;
        writeln!(self.w, "{}", style(reason).red())?;
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        self.section("Test Summary")?;

        writeln!(self.w, "Total Tests: {}", summary.total)?;
        writeln!(self.w, "{}", style(format!("Passed: {}", summary.passed)).green())?;
        writeln!(self.w, "{}", style(format!("Failed: {}", summary.failed)).red())?;
        writeln!(self.w, "Success Rate: {}", summary.rate_display())?;
        writeln!(self.w)?;

        if !summary.failures.is_empty() {
            writeln!(self.w, "{}", style("Failed Tests:").red())?;
            for failure in &summary.failures {
                writeln!(self.w, "  ✗ {}", failure.name)?;
                if !failure.message.is_empty() {
                    write_wrapped(&mut self.w, "    ", &failure.message, self.width)?;
                }
            }
            writeln!(self.w)?;
        }

        writeln!(
            self.w,
            "{}",
            style(format!("Completed at: {}", now_display())).bold()
        )?;
        self.rule()?;
        writeln!(self.w)?;
        Ok(())
    }
}

fn terminal_width() -> usize {
    let (_, cols) = Term::stdout().size();
    cols as usize
}

/// Write `text` under `prefix`, wrapping to `width` and keeping line breaks.
pub fn write_wrapped(w: &mut dyn Write, prefix: &str, text: &str, width: usize) -> Result<()> {
    let wrap_width = width.saturating_sub(prefix.len()).max(20);
    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            writeln!(w)?;
            continue;
        }
        for line in wrap(paragraph, wrap_width) {
            writeln!(w, "{prefix}{line}")?;
        }
    }
    Ok(())
}

/// Local wall-clock time in the format the banners use.
pub fn now_display() -> String {
    jiff::Zoned::now().strftime(CLOCK_FORMAT).to_string()
}

/// Machine-readable record of a whole run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub suite: Suite,
    pub base_url: &'a str,
    pub run_id: &'a str,
    pub authenticated: bool,
    pub started_at: jiff::Timestamp,
    pub completed_at: jiff::Timestamp,
    pub aborted: bool,
    pub summary: &'a Summary,
    pub outcomes: &'a [Outcome],
}

pub fn print_json_report(report: &RunReport<'_>) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, report)?;
    writeln!(stdout)?;
    Ok(())
}
