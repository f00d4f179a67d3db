//! The HTTP collaborator behind each probe.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use thiserror::Error;

/// Why a probe produced no observation.
///
/// These never leave the probe executor: a failed probe is dropped.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Connection refused, reset or DNS failure.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Any other failure while sending or reading the response.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_connect() {
            ProbeError::Connection(err.to_string())
        } else {
            ProbeError::Http(err.to_string())
        }
    }
}

/// The parts of a response the probe cares about.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Issues one blocking HTTP request.
pub trait Transport: Send + Sync {
    fn send(&self, method: &Method, url: &Url) -> Result<HttpResponse, ProbeError>;
}

/// [`Transport`] backed by a shared blocking reqwest client.
///
/// The client pools connections internally and is safe to share across
/// worker threads.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hanalyzer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, method: &Method, url: &Url) -> Result<HttpResponse, ProbeError> {
        let response = self.client.request(method.clone(), url.clone()).send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
