//! Error types for A2A protocol operations

use serde_json::json;
use thiserror::Error;

use crate::{
    codec::jsonrpc::{error_codes, JsonRpcError},
    persistence::PersistenceError,
    protocol::{agent::CardValidationError, task::TaskState},
};

/// Main error type for A2A protocol operations
#[derive(Debug, Error)]
pub enum A2AError {
    /// Transport-level error (network, connection, non-2xx, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol-level error (invalid envelope, unexpected response shape, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Validation error (invalid request params or message shape)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication or authorization error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request timeout error
    #[error("Request timeout")]
    Timeout,

    /// Task not found error
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// A message targeted a task that can no longer accept messages
    #[error("Task {task_id} is {state} and cannot accept new messages")]
    TaskNotContinuable { task_id: String, state: TaskState },

    /// The JSON-RPC method is not part of the routing table
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Peer agent-card discovery failed
    #[error("Discovery of {url} failed: {reason}")]
    Discovery { url: String, reason: String },

    /// The local agent card violates the card invariants
    #[error(transparent)]
    InvalidAgentCard(#[from] CardValidationError),

    /// Agent id could not be resolved to a reachable URL
    #[error("Agent not found or unreachable: {agent}")]
    AgentNotFound { agent: String },

    /// Push notification configuration is declared but not implemented
    #[error("Push notifications are not yet implemented")]
    PushNotificationNotSupported,

    /// Operation is recognised but not supported in this version
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Durable write or read through the persistence adapter failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Handler failure that has no more specific classification
    #[error("Internal error: {0}")]
    Internal(String),
}

impl A2AError {
    /// Stable JSON-RPC error code for this error
    pub fn rpc_code(&self) -> i64 {
        match self {
            A2AError::Protocol(_) => error_codes::INVALID_REQUEST,
            A2AError::Validation(_) | A2AError::Serialization(_) => error_codes::INVALID_PARAMS,
            A2AError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            A2AError::TaskNotFound { .. } => error_codes::TASK_NOT_FOUND,
            A2AError::PushNotificationNotSupported => {
                error_codes::PUSH_NOTIFICATION_NOT_SUPPORTED
            }
            A2AError::TaskNotContinuable { .. } | A2AError::UnsupportedOperation(_) => {
                error_codes::UNSUPPORTED_OPERATION
            }
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert into the JSON-RPC error object returned to the caller
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = self.rpc_code();
        match self {
            A2AError::TaskNotFound { task_id } => {
                JsonRpcError::new(code, "Task not found").with_data(json!({ "taskId": task_id }))
            }
            A2AError::MethodNotFound(method) => JsonRpcError::new(code, "Method not found")
                .with_data(json!({ "method": method })),
            A2AError::PushNotificationNotSupported => {
                JsonRpcError::new(code, "Push notifications not yet implemented")
            }
            A2AError::Validation(reason) | A2AError::Protocol(reason) => {
                let message = if code == error_codes::INVALID_PARAMS {
                    "Invalid params"
                } else {
                    "Invalid request"
                };
                JsonRpcError::new(code, message).with_data(json!({ "details": reason }))
            }
            A2AError::Internal(reason) => {
                JsonRpcError::new(code, "Internal error").with_data(json!({ "details": reason }))
            }
            other if code == error_codes::INTERNAL_ERROR => JsonRpcError::new(code, "Internal error")
                .with_data(json!({ "details": other.to_string() })),
            other => JsonRpcError::new(code, other.to_string()),
        }
    }

    /// Whether this error came from the network boundary
    pub fn is_transport(&self) -> bool {
        matches!(self, A2AError::Transport(_) | A2AError::Timeout)
    }
}

/// Result type alias for A2A operations
pub type A2AResult<T> = Result<T, A2AError>;

impl From<reqwest::Error> for A2AError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            A2AError::Timeout
        } else if err.is_connect() {
            A2AError::Transport(format!("Connection error: {}", err))
        } else if err.is_decode() {
            A2AError::Protocol(format!("Malformed response body: {}", err))
        } else {
            A2AError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_codes() {
        assert_eq!(
            A2AError::TaskNotFound {
                task_id: "t".into()
            }
            .rpc_code(),
            -32001
        );
        assert_eq!(A2AError::Validation("x".into()).rpc_code(), -32602);
        assert_eq!(A2AError::MethodNotFound("x".into()).rpc_code(), -32601);
        assert_eq!(A2AError::PushNotificationNotSupported.rpc_code(), -32003);
        assert_eq!(A2AError::Timeout.rpc_code(), -32603);
    }

    #[test]
    fn test_internal_error_carries_details() {
        let err = A2AError::Internal("boom".into()).to_rpc_error();

        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "Internal error");
        let details = err.data.unwrap()["details"].as_str().unwrap().to_string();
        assert!(details.contains("boom"));
    }

    #[test]
    fn test_task_not_found_data() {
        let err = A2AError::TaskNotFound {
            task_id: "task-9".into(),
        }
        .to_rpc_error();

        assert_eq!(err.data.unwrap()["taskId"], "task-9");
    }
}
