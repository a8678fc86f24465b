//! In-memory transport and reporter for driving probes without a network.

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;

use crate::models::{HttpResponse, Outcome, RequestSpec, Summary};
use crate::output::Reporter;
use crate::transport::{Transport, TransportError};

/// Answers requests from a fixed route table keyed by `"METHOD /path"`.
/// Unknown routes get a 404. Every request is remembered for assertions.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, Result<HttpResponse, TransportError>>,
    sent: RefCell<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, method: &str, path: &str, response: HttpResponse) -> Self {
        self.routes.insert(format!("{method} {path}"), Ok(response));
        self
    }

    pub fn json(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        let response =
            HttpResponse::new(status, body).with_header("Content-Type", "application/json");
        self.respond(method, path, response)
    }

    pub fn fail(mut self, method: &str, path: &str, error: TransportError) -> Self {
        self.routes.insert(format!("{method} {path}"), Err(error));
        self
    }

    pub fn sent(&self) -> Vec<RequestSpec> {
        self.sent.borrow().clone()
    }

    /// Requests that went to `path`, in order.
    pub fn sent_to(&self, path: &str) -> Vec<RequestSpec> {
        self.sent
            .borrow()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &RequestSpec) -> Result<HttpResponse, TransportError> {
        self.sent.borrow_mut().push(request.clone());
        let key = format!("{} {}", request.method, request.path);
        self.routes
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "Not Found")))
    }

    fn base_url(&self) -> &str {
        "http://scripted.test"
    }
}

/// Keeps everything it is shown.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reported: Vec<Outcome>,
    pub sections: Vec<String>,
    pub details: Vec<String>,
    pub notes: Vec<String>,
    pub aborts: Vec<String>,
    pub summaries: usize,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, outcome: &Outcome) -> Result<()> {
        self.reported.push(outcome.clone());
        Ok(())
    }

    fn section(&mut self, title: &str) -> Result<()> {
        self.sections.push(title.to_string());
        Ok(())
    }

    fn detail(&mut self, text: &str) -> Result<()> {
        self.details.push(text.to_string());
        Ok(())
    }

    fn note(&mut self, text: &str) -> Result<()> {
        self.notes.push(text.to_string());
        Ok(())
    }

    fn abort(&mut self, reason: &str) -> Result<()> {
        self.aborts.push(reason.to_string());
        Ok(())
    }

    fn summary(&mut self, _summary: &Summary) -> Result<()> {
        self.summaries += 1;
        Ok(())
    }
}
