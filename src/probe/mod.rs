//! Probe execution: one HTTP request in, at most one observation out.
//!
//! The node that served a response is identified, in order of precedence, by:
//!
//! 1. the configured response header (e.g. `X-Node-ID`),
//! 2. a `node` field in a JSON response body,
//! 3. the [`UNDEFINED_NODE`] sentinel.

mod transport;

pub use transport::{HttpResponse, ProbeError, ReqwestTransport, Transport};

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::pool::{Task, TaskHandler};

/// Node id used when neither the header nor the body identify a node.
pub const UNDEFINED_NODE: &str = "Undefined";

/// Body field consulted when the identifying header is absent.
pub const BODY_NODE_FIELD: &str = "node";

/// Everything needed to issue one probe. Shared by all queued tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: Url,
    pub method: Method,
    pub header: HeaderName,
}

/// The result of one successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub node_id: String,
    pub status_code: u16,
}

/// Receives observations as probes complete.
///
/// Called from worker threads; implementations serialize internally.
pub trait ObservationSink: Send + Sync {
    fn observe(&self, observation: &Observation);
}

impl<T: ObservationSink + ?Sized> ObservationSink for Arc<T> {
    fn observe(&self, observation: &Observation) {
        (**self).observe(observation)
    }
}

/// Work out which node served a response.
pub fn identify_node(headers: &HeaderMap, body: &Value, header: &HeaderName) -> String {
    let from_header = headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(node) = from_header {
        return node.to_string();
    }

    match body.get(BODY_NODE_FIELD) {
        Some(Value::String(node)) if !node.is_empty() => node.clone(),
        Some(Value::Number(node)) => node.to_string(),
        _ => UNDEFINED_NODE.to_string(),
    }
}

/// Parse a response body, treating anything that is not JSON as `{}`.
fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Runs probes against a [`Transport`] and forwards observations to a sink.
#[derive(Debug)]
pub struct ProbeExecutor<T, S> {
    transport: T,
    sink: S,
}

impl<T: Transport, S: ObservationSink> ProbeExecutor<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self { transport, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Issue one request and classify it. Transport failures yield `None`.
    pub fn probe(&self, request: &ProbeRequest) -> Option<Observation> {
        let response = match self.transport.send(&request.method, &request.url) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "probe dropped");
                return None;
            }
        };

        let body = parse_body(&response.body);
        Some(Observation {
            node_id: identify_node(&response.headers, &body, &request.header),
            status_code: response.status,
        })
    }

    /// Probe and, on success, hand the observation to the sink before returning.
    pub fn execute(&self, request: &ProbeRequest) {
        if let Some(observation) = self.probe(request) {
            self.sink.observe(&observation);
        }
    }
}

impl<T: Transport, S: ObservationSink> TaskHandler for ProbeExecutor<T, S> {
    fn handle(&self, task: Task) {
        match task {
            Task::Probe(request) => self.execute(&request),
        }
    }
}
