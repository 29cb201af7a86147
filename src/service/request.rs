//! A2A service request types

use std::{collections::HashMap, time::Duration};

use url::Url;

use crate::{layer::AuthCredentials, protocol::operation::A2AOperation};

/// Default upper bound for a peer call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request to an A2A service
#[derive(Debug, Clone)]
pub struct A2ARequest {
    /// The operation to perform
    pub operation: A2AOperation,

    /// Request context (target agent, auth, timeout)
    pub context: RequestContext,
}

impl A2ARequest {
    /// Create a new A2A request
    pub fn new(operation: A2AOperation, context: RequestContext) -> Self {
        Self { operation, context }
    }
}

/// Context information for an A2A request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// JSON-RPC endpoint, or base URL for discovery
    pub agent_url: Url,

    /// Authentication credentials, filled in by `AuthLayer` when absent
    pub auth: Option<AuthCredentials>,

    /// Upper bound for the whole call
    pub timeout: Duration,

    /// Additional headers
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(agent_url: Url) -> Self {
        Self {
            agent_url,
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            metadata: HashMap::new(),
        }
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, auth: AuthCredentials) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a metadata header
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
