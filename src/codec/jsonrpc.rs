//! JSON-RPC 2.0 binding for the A2A protocol
//!
//! The envelope types here are shared by both directions: the server side
//! parses [`JsonRpcRequest`]s and emits [`JsonRpcResponse`]s, while
//! [`JsonRpcCodec`] wraps outbound operations and unwraps peer responses.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    codec::Codec,
    protocol::{agent::AgentCard, error::A2AError, operation::A2AOperation, task::Task},
    service::response::A2AResponse,
};

/// Protocol version string carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and A2A-specific JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TASK_NOT_FOUND: i64 = -32001;
    pub const TASK_NOT_CANCELABLE: i64 = -32002;
    pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i64 = -32003;
    pub const UNSUPPORTED_OPERATION: i64 = -32004;
}

/// Request identifier, echoed verbatim in the response
///
/// Numeric ids keep their JSON form, so fractional ids and ids beyond the
/// `i64` range come back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id.into())
    }
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id.into()),
        }
    }
}

/// JSON-RPC 2.0 response envelope; exactly one of `result` and `error` is set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Serialized as `null` when the request id could not be determined
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Error response carrying the stable code of an [`A2AError`]
    pub fn from_error(id: Option<RequestId>, err: &A2AError) -> Self {
        Self::error(id, err.to_rpc_error())
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, "Parse error")
            .with_data(serde_json::json!({ "details": details.into() }))
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, "Invalid request")
            .with_data(serde_json::json!({ "details": details.into() }))
    }
}

/// Parse a raw request body into a well-formed envelope
///
/// Undecodable JSON yields a parse error with a `null` id. A decodable body
/// that is not a valid 2.0 request yields an invalid-request error, echoing
/// the id when one can be recovered.
pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string())))?;

    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    if !value.is_object() {
        return Err(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request("request must be a JSON object"),
        ));
    }

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_request(e.to_string())))?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(
            request.id,
            JsonRpcError::invalid_request(format!(
                "unsupported jsonrpc version '{}'",
                request.jsonrpc
            )),
        ));
    }

    Ok(request)
}

/// JSON-RPC 2.0 codec for outbound A2A operations
///
/// RPC operations are wrapped in request envelopes with a fresh id. Agent
/// discovery is not an RPC call: its body is the agent card itself.
#[derive(Debug, Clone, Default)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    pub fn new() -> Self {
        Self
    }

    fn error_to_a2a(error: JsonRpcError, operation: &A2AOperation) -> A2AError {
        match error.code {
            error_codes::TASK_NOT_FOUND => {
                let task_id = error
                    .data
                    .as_ref()
                    .and_then(|data| data.get("taskId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| match operation {
                        A2AOperation::GetTask { task_id, .. }
                        | A2AOperation::CancelTask { task_id } => Some(task_id.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                A2AError::TaskNotFound { task_id }
            }
            error_codes::PUSH_NOTIFICATION_NOT_SUPPORTED => A2AError::PushNotificationNotSupported,
            code => A2AError::Protocol(format!("JSON-RPC error {}: {}", code, error.message)),
        }
    }
}

impl Codec for JsonRpcCodec {
    fn encode_request(&self, operation: &A2AOperation) -> Result<Bytes, A2AError> {
        if !operation.is_rpc() {
            return Ok(Bytes::new());
        }

        let request = JsonRpcRequest::new(
            operation.method(),
            operation.params(),
            Uuid::now_v7().to_string().as_str(),
        );

        let bytes = serde_json::to_vec(&request)?;
        Ok(Bytes::from(bytes))
    }

    fn decode_response(
        &self,
        body: &[u8],
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError> {
        if !operation.is_rpc() {
            let card: AgentCard = serde_json::from_slice(body)
                .map_err(|e| A2AError::Protocol(format!("Malformed agent card: {}", e)))?;
            return Ok(A2AResponse::AgentCard(Box::new(card)));
        }

        if body.is_empty() {
            return Ok(A2AResponse::Empty);
        }

        let response: JsonRpcResponse = serde_json::from_slice(body)
            .map_err(|e| A2AError::Protocol(format!("Failed to parse JSON-RPC response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(Self::error_to_a2a(error, operation));
        }

        let result = response.result.ok_or_else(|| {
            A2AError::Protocol("JSON-RPC response missing 'result' field".to_string())
        })?;

        match operation {
            A2AOperation::SetPushNotificationConfig { .. }
            | A2AOperation::GetPushNotificationConfig { .. } => Ok(A2AResponse::Empty),
            _ => {
                let task: Task = serde_json::from_value(result)
                    .map_err(|e| A2AError::Protocol(format!("Result is not a task: {}", e)))?;
                Ok(A2AResponse::Task(Box::new(task)))
            }
        }
    }

    fn content_type(&self) -> &str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::message::Message;

    #[test]
    fn test_encode_send_message() {
        let codec = JsonRpcCodec::new();
        let operation = A2AOperation::SendMessage {
            message: Message::user("Hello"),
        };

        let bytes = codec.encode_request(&operation).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "message/send");
        assert_eq!(json["params"]["message"]["parts"][0]["text"], "Hello");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_discovery_has_no_envelope() {
        let codec = JsonRpcCodec::new();
        let bytes = codec.encode_request(&A2AOperation::DiscoverAgent).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_decode_task_result() {
        let codec = JsonRpcCodec::new();
        let task = Task::new("task-123", "ctx-1");
        let body = serde_json::to_vec(&JsonRpcResponse::success(
            Some("req-1".into()),
            serde_json::to_value(&task).unwrap(),
        ))
        .unwrap();

        let operation = A2AOperation::GetTask {
            task_id: "task-123".into(),
            history_length: None,
        };
        let task = codec
            .decode_response(&body, &operation)
            .unwrap()
            .into_task()
            .unwrap();

        assert_eq!(task.id, "task-123");
        assert_eq!(task.context_id, "ctx-1");
    }

    #[test]
    fn test_decode_task_not_found() {
        let codec = JsonRpcCodec::new();
        let body = json!({
            "jsonrpc": "2.0",
            "error": {"code": -32001, "message": "Task not found"},
            "id": 7
        })
        .to_string();

        let operation = A2AOperation::CancelTask {
            task_id: "task-9".into(),
        };
        let err = codec
            .decode_response(body.as_bytes(), &operation)
            .unwrap_err();

        assert!(matches!(err, A2AError::TaskNotFound { ref task_id } if task_id == "task-9"));
    }

    #[test]
    fn test_decode_other_error() {
        let codec = JsonRpcCodec::new();
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":"r"}"#;

        let operation = A2AOperation::CancelTask {
            task_id: "t".into(),
        };
        match codec.decode_response(body.as_bytes(), &operation) {
            Err(A2AError::Protocol(msg)) => {
                assert!(msg.contains("-32600"));
                assert!(msg.contains("Invalid Request"));
            }
            other => panic!("Expected Protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_missing_result() {
        let codec = JsonRpcCodec::new();
        let body = r#"{"jsonrpc": "2.0", "id": "req-123"}"#;

        let operation = A2AOperation::CancelTask {
            task_id: "t".into(),
        };
        let err = codec.decode_response(body.as_bytes(), &operation).unwrap_err();
        assert!(err.to_string().contains("missing 'result' field"));
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let response = parse_request(b"{not json").unwrap_err();

        assert_eq!(response.error.as_ref().unwrap().code, error_codes::PARSE_ERROR);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["id"].is_null());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_invalid_request_echoes_id() {
        let response = parse_request(br#"{"jsonrpc":"1.0","method":"x","id":5}"#).unwrap_err();

        assert_eq!(
            response.error.as_ref().unwrap().code,
            error_codes::INVALID_REQUEST
        );
        assert_eq!(response.id, Some(RequestId::from(5)));

        let response = parse_request(br#"{"jsonrpc":"2.0","id":"a"}"#).unwrap_err();
        assert_eq!(response.id, Some(RequestId::String("a".into())));

        let response = parse_request(b"[1,2]").unwrap_err();
        assert_eq!(
            response.error.unwrap().code,
            error_codes::INVALID_REQUEST
        );
    }

    #[test]
    fn test_parse_valid_request() {
        let request =
            parse_request(br#"{"jsonrpc":"2.0","method":"tasks/get","params":{"id":"t"},"id":1}"#)
                .unwrap();

        assert_eq!(request.method, "tasks/get");
        assert_eq!(request.id, Some(RequestId::from(1)));
        assert_eq!(request.params["id"], "t");
    }

    #[test]
    fn test_numeric_ids_survive_unchanged() {
        for raw in ["1.5", "18446744073709551615", "-3"] {
            let body = format!(r#"{{"jsonrpc":"2.0","method":"tasks/get","id":{raw}}}"#);
            let request = parse_request(body.as_bytes()).unwrap();

            let response = JsonRpcResponse::success(request.id.clone(), json!({}));
            let echoed = serde_json::to_value(&response).unwrap();
            assert_eq!(echoed["id"].to_string(), raw);
        }

        let response = parse_request(br#"{"jsonrpc":"1.0","method":"x","id":2.5}"#).unwrap_err();
        assert_eq!(serde_json::to_value(&response).unwrap()["id"], json!(2.5));
    }
}
