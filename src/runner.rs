use tracing::{debug, warn};

use crate::models::{HttpResponse, Outcome, RequestSpec, StatusExpectation, Summary};
use crate::output::Reporter;
use crate::transport::Transport;

/// How much of a response body ends up in the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPreview {
    /// Appended to the message: `Status: 200 | Response: <first n chars>`.
    Inline(usize),
    /// Shown as a detail line under the outcome, first n chars.
    Detail(usize),
    /// Whole body as a detail line.
    Full,
    Hidden,
}

/// One HTTP request paired with the statuses that count as passing.
#[derive(Debug, Clone)]
pub struct Probe {
    pub name: String,
    pub request: RequestSpec,
    pub accept: StatusExpectation,
    pub preview: BodyPreview,
    /// Appended to the status line, e.g. "Correctly requires authentication".
    pub remark: Option<String>,
}

impl Probe {
    pub fn new(name: impl Into<String>, request: RequestSpec, accept: StatusExpectation) -> Self {
        Self {
            name: name.into(),
            request,
            accept,
            preview: BodyPreview::Inline(100),
            remark: None,
        }
    }

    pub fn preview(mut self, preview: BodyPreview) -> Self {
        self.preview = preview;
        self
    }

    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    fn message_and_detail(&self, resp: &HttpResponse) -> (String, Option<String>) {
        let mut message = format!("Status: {}", resp.status);
        if let Some(remark) = &self.remark {
            message.push_str(" - ");
            message.push_str(remark);
        }
        match self.preview {
            BodyPreview::Inline(limit) => {
                message.push_str(" | Response: ");
                message.push_str(resp.preview(limit));
                (message, None)
            }
            BodyPreview::Detail(limit) => (message, Some(format!("Response: {}", resp.preview(limit)))),
            BodyPreview::Full => (message, Some(format!("Response: {}", resp.body))),
            BodyPreview::Hidden => (message, None),
        }
    }
}

/// Where structural checks put their sub-outcomes.
pub trait Recorder {
    fn record_outcome(&mut self, outcome: Outcome);

    /// Extra context shown alongside the most recent outcome.
    fn detail(&mut self, _text: &str) {}
}

/// Issues probes one at a time and keeps every outcome in recording order.
pub struct ProbeRunner<T: Transport, R: Reporter> {
    transport: T,
    reporter: R,
    outcomes: Vec<Outcome>,
}

impl<T: Transport, R: Reporter> ProbeRunner<T, R> {
    pub fn new(transport: T, reporter: R) -> Self {
        Self {
            transport,
            reporter,
            outcomes: Vec::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Append an outcome and show it right away.
    pub fn record(&mut self, name: impl Into<String>, passed: bool, message: impl Into<String>) {
        self.record_outcome(Outcome::new(name, passed, message));
    }

    pub fn record_with_detail(
        &mut self,
        name: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
        detail: &str,
    ) {
        self.record(name, passed, message);
        Recorder::detail(self, detail);
    }

    /// Run one probe. Exactly one outcome is recorded whatever happens; the
    /// response comes back only when the call reached the server.
    pub fn probe(&mut self, probe: &Probe) -> Option<HttpResponse> {
        let resp = self.fetch(&probe.name, &probe.request)?;
        let passed = probe.accept.matches(resp.status);
        if !passed {
            debug!(
                probe = %probe.name,
                status = resp.status,
                expected = %probe.accept.description(),
                "unexpected status"
            );
        }
        let (message, detail) = probe.message_and_detail(&resp);
        match detail {
            Some(detail) => self.record_with_detail(&probe.name, passed, message, &detail),
            None => self.record(&probe.name, passed, message),
        }
        Some(resp)
    }

    /// Send a request, recording an outcome only if it never got a response.
    pub fn fetch(&mut self, name: &str, request: &RequestSpec) -> Option<HttpResponse> {
        match self.transport.send(request) {
            Ok(resp) => Some(resp),
            Err(err) => {
                self.record(name, false, format!("Error: {err}"));
                None
            }
        }
    }

    /// Tally everything recorded so far and hand it to the reporter.
    pub fn summarize(&mut self) -> Summary {
        let summary = Summary::of(&self.outcomes);
        if let Err(err) = self.reporter.summary(&summary) {
            warn!(error = %err, "failed to write summary");
        }
        summary
    }

    pub fn banner(&mut self, title: &str, fields: &[(&str, String)]) {
        if let Err(err) = self.reporter.banner(title, fields) {
            warn!(error = %err, "failed to write banner");
        }
    }

    pub fn section(&mut self, title: &str) {
        if let Err(err) = self.reporter.section(title) {
            warn!(error = %err, "failed to write section header");
        }
    }

    pub fn note(&mut self, text: &str) {
        if let Err(err) = self.reporter.note(text) {
            warn!(error = %err, "failed to write note");
        }
    }

    pub fn abort(&mut self, reason: &str) {
        if let Err(err) = self.reporter.abort(reason) {
            warn!(error = %err, "failed to write abort notice");
        }
    }
}

impl<T: Transport, R: Reporter> Recorder for ProbeRunner<T, R> {
    fn record_outcome(&mut self, outcome: Outcome) {
        debug!(name = %outcome.name, passed = outcome.passed, "outcome recorded");
        if let Err(err) = self.reporter.report(&outcome) {
            warn!(error = %err, "failed to report outcome");
        }
        self.outcomes.push(outcome);
    }

    fn detail(&mut self, text: &str) {
        if let Err(err) = self.reporter.detail(text) {
            warn!(error = %err, "failed to write detail");
        }
    }
}
