//! Client configuration

use std::time::Duration;

use crate::{config::OutboundConfig, service::DEFAULT_TIMEOUT};

/// Configuration for an A2A client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Default timeout for JSON-RPC calls
    pub timeout: Duration,

    /// Timeout for agent-card discovery
    pub discovery_timeout: Duration,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            discovery_timeout: Duration::from_secs(10),
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the discovery timeout
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&OutboundConfig> for ClientConfig {
    fn from(outbound: &OutboundConfig) -> Self {
        Self::new()
            .with_timeout(outbound.timeout())
            .with_discovery_timeout(outbound.discovery_timeout())
    }
}
