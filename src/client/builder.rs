//! Client builder for constructing A2A clients with composable layers

use std::{sync::Arc, time::Duration};

use tower::util::BoxCloneSyncService;
use tower_layer::Layer;

use crate::{
    client::{AgentClient, ClientConfig},
    codec::{Codec, JsonRpcCodec},
    config::OutboundConfig,
    layer::{AuthCredentials, AuthLayer},
    protocol::error::A2AError,
    service::A2AProtocolService,
    transport::{HttpTransport, Transport},
};

/// Builder for constructing A2A clients
///
/// Assembles the outbound tower stack: an optional [`AuthLayer`] over the
/// [`A2AProtocolService`] and the chosen transport.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_mesh::prelude::*;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), A2AError> {
/// let client = A2AClientBuilder::new_http()
///     .with_bearer_auth("token123")
///     .with_timeout(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct A2AClientBuilder<T: Transport> {
    transport: Option<T>,
    codec: Option<Arc<dyn Codec>>,
    auth: Option<AuthCredentials>,
    config: ClientConfig,
}

impl<T: Transport> A2AClientBuilder<T> {
    /// Start a builder without a transport; call `with_transport` before `build`
    pub fn new() -> Self {
        Self {
            transport: None,
            codec: None,
            auth: None,
            config: ClientConfig::default(),
        }
    }

    /// Use a custom transport
    ///
    /// # Arguments
    ///
    /// * `transport` - The transport implementation to use
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom codec
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Enable bearer token authentication
    ///
    /// # Arguments
    ///
    /// * `token` - The bearer token for authentication
    pub fn with_bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(AuthCredentials::bearer(token));
        self
    }

    /// Enable API key authentication
    ///
    /// # Arguments
    ///
    /// * `key` - The API key
    /// * `header` - The header name for the API key (e.g., "X-API-Key")
    pub fn with_api_key_auth(mut self, key: impl Into<String>, header: impl Into<String>) -> Self {
        self.auth = Some(AuthCredentials::api_key(key, header));
        self
    }

    /// Set custom authentication credentials
    pub fn with_auth(mut self, credentials: AuthCredentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    /// Set the JSON-RPC call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the agent-card discovery timeout
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Apply timeouts and credentials from the outbound configuration
    pub fn with_outbound_config(mut self, outbound: &OutboundConfig) -> Self {
        self.config = ClientConfig::from(outbound);
        if let Some(token) = &outbound.bearer_token {
            self.auth = Some(AuthCredentials::bearer(token.clone()));
        }
        self
    }

    /// Build the A2A client
    ///
    /// # Errors
    ///
    /// Returns an error if no transport has been configured
    pub fn build(self) -> Result<AgentClient, A2AError> {
        let transport = self.transport.ok_or_else(|| {
            A2AError::Protocol("Transport not configured. Call with_transport()".into())
        })?;
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonRpcCodec));

        let core = A2AProtocolService::new(transport, codec);
        let service = match self.auth {
            Some(credentials) => BoxCloneSyncService::new(AuthLayer::new(credentials).layer(core)),
            None => BoxCloneSyncService::new(core),
        };

        Ok(AgentClient::new(service, self.config))
    }
}

impl<T: Transport> Default for A2AClientBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl A2AClientBuilder<HttpTransport> {
    /// Create a new client builder with the reqwest HTTP transport
    pub fn new_http() -> Self {
        Self::new().with_transport(HttpTransport::new())
    }
}
