//! HTTP transport implementation for A2A protocol

use std::task::{Context, Poll};

use async_trait::async_trait;

use crate::protocol::error::A2AError;

use super::{Transport, TransportRequest, TransportResponse};

/// HTTP transport implementation using reqwest
///
/// The underlying connection pool is shared between clones.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new HTTP transport with a custom reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        // HTTP client is always ready
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        let mut req_builder = match request.method.as_str() {
            "POST" => self.client.post(request.url.clone()),
            "GET" => self.client.get(request.url.clone()),
            _ => {
                return Err(A2AError::Transport(format!(
                    "Unsupported HTTP method: {}",
                    request.method
                )))
            }
        };

        for (key, value) in request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body);
        }

        tracing::trace!(url = %request.url, method = %request.method, "Sending peer request");
        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
