//! Authentication layer for outbound peer calls

use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use base64::{engine::general_purpose, Engine as _};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    protocol::error::A2AError,
    service::{A2ARequest, A2AResponse},
};

/// Credentials presented to peer agents
///
/// Secrets are redacted from the `Debug` output so request contexts can be
/// logged.
#[derive(Clone)]
pub enum AuthCredentials {
    /// Bearer token authentication
    Bearer(String),

    /// API key authentication
    ApiKey { key: String, header: String },

    /// Basic HTTP authentication
    Basic { username: String, password: String },
}

impl AuthCredentials {
    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Create API key credentials
    pub fn api_key(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            header: header.into(),
        }
    }

    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Get the header name and value for this credential
    pub fn to_header(&self) -> (String, String) {
        match self {
            AuthCredentials::Bearer(token) => {
                ("Authorization".to_string(), format!("Bearer {}", token))
            }
            AuthCredentials::ApiKey { key, header } => (header.clone(), key.clone()),
            AuthCredentials::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                ("Authorization".to_string(), format!("Basic {}", encoded))
            }
        }
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthCredentials::Bearer(_) => f.write_str("Bearer(***)"),
            AuthCredentials::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .finish_non_exhaustive(),
            AuthCredentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Attaches default credentials to every outbound [`A2ARequest`]
///
/// Credentials already set on a request context take precedence.
#[derive(Debug, Clone)]
pub struct AuthLayer {
    credentials: AuthCredentials,
}

impl AuthLayer {
    /// Create a new authentication layer
    pub fn new(credentials: AuthCredentials) -> Self {
        Self { credentials }
    }

    /// Create a bearer authentication layer
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(AuthCredentials::bearer(token))
    }

    /// Create an API key authentication layer
    pub fn api_key(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(AuthCredentials::api_key(key, header))
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Service produced by [`AuthLayer`]
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    credentials: AuthCredentials,
}

impl<S> Service<A2ARequest> for AuthService<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: A2ARequest) -> Self::Future {
        if req.context.auth.is_none() {
            req.context.auth = Some(self.credentials.clone());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        codec::JsonRpcCodec,
        protocol::operation::A2AOperation,
        service::{A2AProtocolService, RequestContext},
        transport::mock::MockTransport,
    };

    fn discover(auth: Option<AuthCredentials>) -> A2ARequest {
        let mut context = RequestContext::new("http://peer:4100".parse().unwrap());
        context.auth = auth;
        A2ARequest::new(A2AOperation::DiscoverAgent, context)
    }

    #[tokio::test]
    async fn test_layer_fills_missing_credentials() {
        let transport = MockTransport::json(500, json!({}));
        let service = AuthLayer::bearer("layer-token")
            .layer(A2AProtocolService::new(transport.clone(), Arc::new(JsonRpcCodec)));

        let _ = service.clone().oneshot(discover(None)).await;
        let _ = service
            .oneshot(discover(Some(AuthCredentials::bearer("explicit"))))
            .await;

        let seen = transport.requests();
        assert_eq!(seen[0].headers["Authorization"], "Bearer layer-token");
        assert_eq!(seen[1].headers["Authorization"], "Bearer explicit");
    }

    #[test]
    fn test_bearer_credentials() {
        let creds = AuthCredentials::bearer("test-token");
        let (header, value) = creds.to_header();

        assert_eq!(header, "Authorization");
        assert_eq!(value, "Bearer test-token");
    }

    #[test]
    fn test_api_key_credentials() {
        let creds = AuthCredentials::api_key("secret-key", "X-API-Key");
        let (header, value) = creds.to_header();

        assert_eq!(header, "X-API-Key");
        assert_eq!(value, "secret-key");
    }

    #[test]
    fn test_basic_credentials() {
        let creds = AuthCredentials::basic("user", "pass");
        let (header, value) = creds.to_header();

        assert_eq!(header, "Authorization");
        assert_eq!(value, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let bearer = format!("{:?}", AuthCredentials::bearer("top-secret"));
        let basic = format!("{:?}", AuthCredentials::basic("user", "hunter2"));

        assert!(!bearer.contains("top-secret"));
        assert!(basic.contains("user"));
        assert!(!basic.contains("hunter2"));
    }
}
