//! Core A2A protocol service implementation

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tower_service::Service;

use crate::{
    codec::Codec,
    protocol::{
        agent::{card_url, PROTOCOL_VERSION},
        error::A2AError,
        operation::A2AOperation,
    },
    service::{A2ARequest, A2AResponse},
    transport::{Transport, TransportRequest, TransportResponse},
};

/// Core A2A protocol service that wraps a transport
///
/// Turns an [`A2ARequest`] into one transport exchange: discovery is a GET of
/// the peer's agent card, every other operation is a JSON-RPC POST to the
/// peer's endpoint. The whole exchange is bounded by the request timeout.
pub struct A2AProtocolService<T> {
    transport: T,
    codec: Arc<dyn Codec>,
}

impl<T: Clone> Clone for A2AProtocolService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<T> A2AProtocolService<T>
where
    T: Transport,
{
    /// Create a new A2A protocol service
    ///
    /// # Arguments
    ///
    /// * `transport` - The underlying transport implementation
    /// * `codec` - The codec for serialization/deserialization
    pub fn new(transport: T, codec: Arc<dyn Codec>) -> Self {
        Self { transport, codec }
    }

    /// Build a transport request from an A2A operation
    fn build_transport_request(
        req: &A2ARequest,
        codec: &dyn Codec,
    ) -> Result<TransportRequest, A2AError> {
        let (url, method) = match &req.operation {
            A2AOperation::DiscoverAgent => {
                let url = card_url(&req.context.agent_url).map_err(|e| A2AError::Discovery {
                    url: req.context.agent_url.to_string(),
                    reason: e.to_string(),
                })?;
                (url, "GET")
            }
            _ => (req.context.agent_url.clone(), "POST"),
        };

        let mut transport_req = TransportRequest::new(url, method)
            .header("Accept", codec.content_type())
            .header("A2A-Version", PROTOCOL_VERSION)
            .timeout(Some(req.context.timeout));

        if let Some(auth) = &req.context.auth {
            let (header, value) = auth.to_header();
            transport_req = transport_req.header(header, value);
        }

        for (key, value) in &req.context.metadata {
            transport_req = transport_req.header(key.clone(), value.clone());
        }

        let body = codec.encode_request(&req.operation)?;
        if !body.is_empty() && method != "GET" {
            transport_req = transport_req
                .header("Content-Type", codec.content_type())
                .body(body);
        }

        Ok(transport_req)
    }

    /// Parse a transport response into an A2A response
    fn parse_transport_response(
        req: &A2ARequest,
        transport_resp: TransportResponse,
        codec: &dyn Codec,
    ) -> Result<A2AResponse, A2AError> {
        if !transport_resp.is_success() {
            let err = Self::handle_error_response(&transport_resp);
            return Err(match req.operation {
                A2AOperation::DiscoverAgent => A2AError::Discovery {
                    url: req.context.agent_url.to_string(),
                    reason: err.to_string(),
                },
                _ => err,
            });
        }

        codec.decode_response(&transport_resp.body, &req.operation)
    }

    /// Handle non-2xx responses from the transport
    fn handle_error_response(transport_resp: &TransportResponse) -> A2AError {
        let detail = serde_json::from_slice::<serde_json::Value>(&transport_resp.body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .or_else(|| json.pointer("/error/message"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "no error detail".to_string());

        match transport_resp.status {
            401 | 403 => A2AError::Auth(detail),
            status => A2AError::Transport(format!("HTTP {status}: {detail}")),
        }
    }
}

impl<T> Service<A2ARequest> for A2AProtocolService<T>
where
    T: Transport,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.transport.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        let transport = self.transport.clone();
        let codec = self.codec.clone();

        Box::pin(async move {
            let transport_req = Self::build_transport_request(&req, codec.as_ref())?;

            let exchange = transport.execute(transport_req);
            let transport_resp = tokio::time::timeout(req.context.timeout, exchange)
                .await
                .map_err(|_| A2AError::Timeout)??;

            Self::parse_transport_response(&req, transport_resp, codec.as_ref())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        codec::JsonRpcCodec,
        layer::AuthCredentials,
        protocol::message::Message,
        service::RequestContext,
        transport::{mock::MockTransport, TransportResponse},
    };

    fn service(transport: MockTransport) -> A2AProtocolService<MockTransport> {
        A2AProtocolService::new(transport, Arc::new(JsonRpcCodec))
    }

    fn send(url: &str) -> A2ARequest {
        A2ARequest::new(
            A2AOperation::SendMessage {
                message: Message::user("hello"),
            },
            RequestContext::new(url.parse().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_send_message_posts_jsonrpc() {
        let transport = MockTransport::json(
            200,
            json!({
                "jsonrpc": "2.0",
                "id": "1",
                "result": {
                    "id": "task-1",
                    "contextId": "ctx-1",
                    "status": {"state": "completed", "timestamp": "2025-01-01T00:00:00Z"},
                    "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "2025-01-01T00:00:00Z"
                }
            }),
        );
        let mut request = send("http://peer:4100/a2a");
        request.context = request.context.with_auth(AuthCredentials::bearer("t0k"));

        let response = service(transport.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.into_task().unwrap().id, "task-1");
        let seen = transport.requests();
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].url.as_str(), "http://peer:4100/a2a");
        assert_eq!(seen[0].headers["A2A-Version"], PROTOCOL_VERSION);
        assert_eq!(seen[0].headers["Authorization"], "Bearer t0k");
        let body: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
        assert_eq!(body["method"], "message/send");
    }

    #[tokio::test]
    async fn test_discovery_gets_card_path() {
        let transport = MockTransport::json(
            200,
            json!({
                "protocolVersion": "0.3.0",
                "name": "Peer",
                "description": "A peer",
                "url": "http://peer:4100/a2a",
                "skills": [{"id": "echo", "name": "Echo"}]
            }),
        );
        let request = A2ARequest::new(
            A2AOperation::DiscoverAgent,
            RequestContext::new("http://peer:4100".parse().unwrap()),
        );

        let response = service(transport.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.into_agent_card().unwrap().name, "Peer");
        let seen = transport.requests();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].url.path(), "/.well-known/agent.json");
        assert!(seen[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let unauthorized = MockTransport::json(401, json!({"message": "bad token"}));
        let err = service(unauthorized)
            .oneshot(send("http://peer/a2a"))
            .await
            .unwrap_err();
        assert!(matches!(err, A2AError::Auth(ref m) if m == "bad token"));

        let unavailable = MockTransport::new(|_| TransportResponse::new(503));
        let err = service(unavailable)
            .oneshot(send("http://peer/a2a"))
            .await
            .unwrap_err();
        assert!(matches!(err, A2AError::Transport(ref m) if m.starts_with("HTTP 503")));
    }

    #[tokio::test]
    async fn test_discovery_failure_is_discovery_error() {
        let transport = MockTransport::new(|_| TransportResponse::new(404));
        let request = A2ARequest::new(
            A2AOperation::DiscoverAgent,
            RequestContext::new("http://peer:4100".parse().unwrap()),
        );

        let err = service(transport).oneshot(request).await.unwrap_err();
        assert!(matches!(err, A2AError::Discovery { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let transport = MockTransport::json(200, json!({})).with_delay(Duration::from_secs(5));
        let mut request = send("http://peer/a2a");
        request.context.timeout = Duration::from_millis(20);

        let err = service(transport).oneshot(request).await.unwrap_err();
        assert!(matches!(err, A2AError::Timeout));
    }
}
