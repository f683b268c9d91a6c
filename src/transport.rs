//! HTTP transport used by [crate::IrrExplorer].
//!
//! The [Transport] trait is the seam between the client and the network so the
//! retry and parsing logic can run against a scripted transport in tests.
use crate::IrrExplorerError;
use reqwest::header::ACCEPT;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of a single outbound request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// connection could not be established (refused, DNS failure, unreachable host)
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// connection dropped or request aborted after it was established
    #[error("connection reset: {0}")]
    Reset(String),

    /// the service answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("transport already closed")]
    Closed,
}

/// A blocking GET-only transport returning the response body.
pub trait Transport: Send + Sync {
    /// Issue one GET request and return the body of a successful response.
    fn get(&self, url: &str) -> Result<String, TransportError>;

    /// Release the underlying network resources. Must be idempotent.
    fn close(&mut self);
}

/// [Transport] backed by one pooled `reqwest` blocking client.
pub struct HttpTransport {
    client: Option<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, IrrExplorerError> {
        let client = reqwest::blocking::ClientBuilder::new()
            .user_agent(concat!("irr-explorer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(HttpTransport {
            client: Some(client),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else if let Some(status) = e.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Reset(e.to_string())
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;
        let response = client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response.text().map_err(classify)
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("released http client");
        }
    }
}
