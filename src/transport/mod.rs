//! Transport abstraction layer for outbound A2A calls

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use std::{
    collections::HashMap,
    task::{Context, Poll},
    time::Duration,
};

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::protocol::error::A2AError;

/// Protocol-agnostic transport request
///
/// Requests carry the full target URL: one transport serves every peer.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute target URL
    pub url: Url,

    /// HTTP method or equivalent operation (e.g., "POST", "GET")
    pub method: String,

    /// Headers or metadata for the request
    pub headers: HashMap<String, String>,

    /// Request body as bytes
    pub body: Bytes,

    /// Upper bound for the whole exchange
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Create a new transport request
    pub fn new(url: Url, method: impl Into<String>) -> Self {
        Self {
            url,
            method: method.into(),
            headers: HashMap::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Protocol-agnostic transport response
#[derive(Debug)]
pub struct TransportResponse {
    /// Status code (e.g., HTTP status code)
    pub status: u16,

    /// Response headers or metadata
    pub headers: HashMap<String, String>,

    /// Response body as bytes
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a new transport response
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the response body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Check if the response indicates success (2xx status code)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response indicates a client error (4xx status code)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Core transport trait for executing protocol-agnostic requests
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    /// Check if the transport is ready to accept requests
    ///
    /// This is used by Tower's Service trait to implement backpressure
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), A2AError>>;

    /// Execute a transport request asynchronously
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError>;
}
