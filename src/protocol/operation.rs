//! A2A protocol operations

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{
    error::A2AError,
    message::Message,
    task::{MessageSendParams, TaskIdParams, TaskQueryParams},
};

/// JSON-RPC method names of the routing table
pub mod methods {
    pub const MESSAGE_SEND: &str = "message/send";
    pub const MESSAGE_STREAM: &str = "message/stream";
    pub const TASKS_GET: &str = "tasks/get";
    pub const TASKS_CANCEL: &str = "tasks/cancel";
    pub const PUSH_CONFIG_SET: &str = "tasks/pushNotificationConfig/set";
    pub const PUSH_CONFIG_GET: &str = "tasks/pushNotificationConfig/get";
}

/// A2A protocol operations
///
/// Each variant is one entry of the JSON-RPC routing table, except
/// `DiscoverAgent`, which is a plain HTTP GET of the agent card. The same
/// enum is decoded by the dispatcher and encoded by the outbound client.
#[derive(Debug, Clone, PartialEq)]
pub enum A2AOperation {
    /// Send a message, creating or continuing a task
    SendMessage { message: Message },

    /// Streaming variant of `SendMessage`; currently delivered as one response
    StreamMessage { message: Message },

    /// Get a task by ID
    GetTask {
        task_id: String,
        history_length: Option<usize>,
    },

    /// Cancel a task
    CancelTask { task_id: String },

    /// Declared but unimplemented push notification configuration
    SetPushNotificationConfig { params: Value },

    /// Declared but unimplemented push notification lookup
    GetPushNotificationConfig { params: Value },

    /// Discover agent capabilities (fetch Agent Card)
    DiscoverAgent,
}

impl A2AOperation {
    /// Decode a JSON-RPC method and its params into an operation
    ///
    /// Unknown methods yield `MethodNotFound`; malformed params and messages
    /// without parts yield `Validation` (`-32602`).
    pub fn from_rpc(method: &str, params: Value) -> Result<Self, A2AError> {
        match method {
            methods::MESSAGE_SEND => Ok(A2AOperation::SendMessage {
                message: Self::decode_message(params)?,
            }),
            methods::MESSAGE_STREAM => Ok(A2AOperation::StreamMessage {
                message: Self::decode_message(params)?,
            }),
            methods::TASKS_GET => {
                let query: TaskQueryParams = decode_params(params)?;
                Ok(A2AOperation::GetTask {
                    task_id: query.id,
                    history_length: query.history_length,
                })
            }
            methods::TASKS_CANCEL => {
                let params: TaskIdParams = decode_params(params)?;
                Ok(A2AOperation::CancelTask { task_id: params.id })
            }
            methods::PUSH_CONFIG_SET => Ok(A2AOperation::SetPushNotificationConfig { params }),
            methods::PUSH_CONFIG_GET => Ok(A2AOperation::GetPushNotificationConfig { params }),
            other => Err(A2AError::MethodNotFound(other.to_string())),
        }
    }

    fn decode_message(params: Value) -> Result<Message, A2AError> {
        let params: MessageSendParams = decode_params(params)?;
        if params.message.parts.is_empty() {
            return Err(A2AError::Validation(
                "message.parts must contain at least one part".into(),
            ));
        }
        Ok(params.message)
    }

    /// Get the JSON-RPC method name for this operation
    pub fn method(&self) -> &'static str {
        match self {
            A2AOperation::SendMessage { .. } => methods::MESSAGE_SEND,
            A2AOperation::StreamMessage { .. } => methods::MESSAGE_STREAM,
            A2AOperation::GetTask { .. } => methods::TASKS_GET,
            A2AOperation::CancelTask { .. } => methods::TASKS_CANCEL,
            A2AOperation::SetPushNotificationConfig { .. } => methods::PUSH_CONFIG_SET,
            A2AOperation::GetPushNotificationConfig { .. } => methods::PUSH_CONFIG_GET,
            A2AOperation::DiscoverAgent => "agent/discover",
        }
    }

    /// Encode the JSON-RPC params of this operation
    pub fn params(&self) -> Value {
        match self {
            A2AOperation::SendMessage { message } | A2AOperation::StreamMessage { message } => {
                json!({ "message": message })
            }
            A2AOperation::GetTask {
                task_id,
                history_length,
            } => {
                let mut params = json!({ "id": task_id });
                if let Some(length) = history_length {
                    params["historyLength"] = json!(length);
                }
                params
            }
            A2AOperation::CancelTask { task_id } => json!({ "id": task_id }),
            A2AOperation::SetPushNotificationConfig { params }
            | A2AOperation::GetPushNotificationConfig { params } => params.clone(),
            A2AOperation::DiscoverAgent => Value::Null,
        }
    }

    /// Whether the operation travels inside a JSON-RPC envelope
    pub fn is_rpc(&self) -> bool {
        !matches!(self, A2AOperation::DiscoverAgent)
    }

    /// Check if this operation asks for a streaming response
    pub fn is_streaming(&self) -> bool {
        matches!(self, A2AOperation::StreamMessage { .. })
    }
}

fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T, A2AError> {
    serde_json::from_value(params).map_err(|e| A2AError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Message;

    #[test]
    fn test_decode_send_message() {
        let op = A2AOperation::from_rpc(
            "message/send",
            json!({"message": {"role": "user", "parts": [{"kind": "text", "text": "hi"}]}}),
        )
        .unwrap();

        match op {
            A2AOperation::SendMessage { message } => assert_eq!(message.text_content(), "hi"),
            other => panic!("Expected SendMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_parts_rejected() {
        let err = A2AOperation::from_rpc(
            "message/send",
            json!({"message": {"role": "user", "parts": []}}),
        )
        .unwrap_err();

        assert_eq!(err.rpc_code(), -32602);
    }

    #[test]
    fn test_missing_params_rejected() {
        let err = A2AOperation::from_rpc("tasks/get", Value::Null).unwrap_err();
        assert!(matches!(err, A2AError::Validation(_)));
    }

    #[test]
    fn test_unknown_method() {
        let err = A2AOperation::from_rpc("tasks/list", json!({})).unwrap_err();
        assert!(matches!(err, A2AError::MethodNotFound(ref m) if m == "tasks/list"));
    }

    #[test]
    fn test_params_round_trip() {
        let op = A2AOperation::GetTask {
            task_id: "task-1".into(),
            history_length: Some(3),
        };
        let decoded = A2AOperation::from_rpc(op.method(), op.params()).unwrap();
        assert_eq!(decoded, op);

        let op = A2AOperation::StreamMessage {
            message: Message::user("x"),
        };
        assert_eq!(op.method(), "message/stream");
        assert!(op.is_streaming());
        assert!(!A2AOperation::DiscoverAgent.is_rpc());
    }
}
