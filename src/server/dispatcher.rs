//! JSON-RPC dispatcher
//!
//! Routes decoded requests to the message processor and wraps every outcome,
//! including handler panics, in a JSON-RPC response carrying the request id.

use std::{
    any::Any,
    convert::Infallible,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::FutureExt;
use serde_json::{json, Value};
use tower_service::Service;

use crate::{
    codec::{
        jsonrpc::{error_codes, JSONRPC_VERSION},
        parse_request, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    },
    protocol::{error::A2AError, operation::A2AOperation},
    server::processor::MessageProcessor,
};

#[derive(Clone)]
pub struct Dispatcher {
    processor: Arc<MessageProcessor>,
}

impl Dispatcher {
    pub fn new(processor: Arc<MessageProcessor>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &Arc<MessageProcessor> {
        &self.processor
    }

    /// Parse a raw request body and dispatch it
    pub async fn process_raw(&self, body: &[u8]) -> JsonRpcResponse {
        match parse_request(body) {
            Ok(request) => self.process_request(request).await,
            Err(response) => {
                tracing::debug!(
                    code = response.error.as_ref().map(|e| e.code),
                    "Rejected malformed JSON-RPC request"
                );
                response
            }
        }
    }

    /// Dispatch one request; never fails
    pub async fn process_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();

        match AssertUnwindSafe(self.route(request)).catch_unwind().await {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(err)) => {
                match err.rpc_code() {
                    error_codes::INTERNAL_ERROR => {
                        tracing::error!(method = %method, error = %err, "JSON-RPC handler failed")
                    }
                    code => tracing::debug!(method = %method, code, error = %err, "JSON-RPC request rejected"),
                }
                JsonRpcResponse::from_error(id, &err)
            }
            Err(panic) => {
                let details = panic_message(panic.as_ref());
                tracing::error!(method = %method, details = %details, "JSON-RPC handler panicked");
                JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(error_codes::INTERNAL_ERROR, "Internal error")
                        .with_data(json!({ "details": details })),
                )
            }
        }
    }

    async fn route(&self, request: JsonRpcRequest) -> Result<Value, A2AError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(A2AError::Protocol(format!(
                "unsupported jsonrpc version '{}'",
                request.jsonrpc
            )));
        }

        match A2AOperation::from_rpc(&request.method, request.params)? {
            // Streaming delivery is not implemented; stream requests get the
            // same single response as send.
            A2AOperation::SendMessage { message } | A2AOperation::StreamMessage { message } => {
                let task = self.processor.handle_message(message).await?;
                Ok(serde_json::to_value(task)?)
            }
            A2AOperation::GetTask {
                task_id,
                history_length,
            } => {
                let task = self.processor.get_task(&task_id, history_length).await?;
                Ok(serde_json::to_value(task)?)
            }
            A2AOperation::CancelTask { task_id } => {
                let task = self.processor.cancel_task(&task_id).await?;
                Ok(serde_json::to_value(task)?)
            }
            A2AOperation::SetPushNotificationConfig { .. }
            | A2AOperation::GetPushNotificationConfig { .. } => {
                Err(A2AError::PushNotificationNotSupported)
            }
            A2AOperation::DiscoverAgent => Err(A2AError::MethodNotFound(request.method)),
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl Service<JsonRpcRequest> for Dispatcher {
    type Response = JsonRpcResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: JsonRpcRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.process_request(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        codec::RequestId,
        events::EventBus,
        monitor::RecordingMonitor,
        persistence::InMemoryPersistence,
        protocol::{
            message::{Message, MessagePart},
            task::Task,
        },
        server::processor::ResponseGenerator,
        store::TaskStore,
    };

    struct PanickingGenerator;

    #[async_trait]
    impl ResponseGenerator for PanickingGenerator {
        async fn generate(&self, _: &Message, _: &Task) -> Result<Vec<MessagePart>, A2AError> {
            panic!("generator exploded")
        }
    }

    fn processor() -> MessageProcessor {
        MessageProcessor::new(
            "agent-a",
            Arc::new(TaskStore::new()),
            Arc::new(InMemoryPersistence::default()),
            Arc::new(RecordingMonitor::new()),
            EventBus::default(),
        )
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(processor()))
    }

    fn send_hello(id: i64) -> JsonRpcRequest {
        JsonRpcRequest::new(
            "message/send",
            json!({"message": {"role": "user", "parts": [{"kind": "text", "text": "Hello"}]}}),
            id,
        )
    }

    #[tokio::test]
    async fn test_send_then_get() {
        let dispatcher = dispatcher();

        let sent = dispatcher.process_request(send_hello(1)).await;
        assert_eq!(sent.id, Some(RequestId::from(1)));
        let result = sent.result.unwrap();
        assert_eq!(result["status"]["state"], "completed");
        assert_eq!(result["history"].as_array().unwrap().len(), 2);

        let get = JsonRpcRequest::new("tasks/get", json!({"id": result["id"]}), "q-2");
        let got = dispatcher.process_request(get).await;
        assert_eq!(got.id, Some(RequestId::String("q-2".into())));
        assert_eq!(got.result.unwrap()["id"], result["id"]);
    }

    #[tokio::test]
    async fn test_error_codes() {
        let dispatcher = dispatcher();
        let code = |response: JsonRpcResponse| response.error.unwrap().code;

        let unknown = JsonRpcRequest::new("tasks/list", json!({}), 1i64);
        assert_eq!(code(dispatcher.process_request(unknown).await), -32601);

        let missing = JsonRpcRequest::new("tasks/get", json!({"id": "nope"}), 2i64);
        assert_eq!(code(dispatcher.process_request(missing).await), -32001);

        let empty = JsonRpcRequest::new(
            "message/send",
            json!({"message": {"role": "user", "parts": []}}),
            3i64,
        );
        assert_eq!(code(dispatcher.process_request(empty).await), -32602);

        let push = JsonRpcRequest::new("tasks/pushNotificationConfig/set", json!({}), 4i64);
        assert_eq!(code(dispatcher.process_request(push).await), -32003);
    }

    #[tokio::test]
    async fn test_raw_parse_errors() {
        let dispatcher = dispatcher();

        let garbage = dispatcher.process_raw(b"{not json").await;
        assert_eq!(garbage.error.unwrap().code, -32700);
        assert_eq!(garbage.id, None);

        let wrong_version = dispatcher
            .process_raw(br#"{"jsonrpc":"1.0","id":7,"method":"tasks/get","params":{}}"#)
            .await;
        assert_eq!(wrong_version.error.unwrap().code, -32600);
        assert_eq!(wrong_version.id, Some(RequestId::from(7)));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let processor = processor().with_generator(Arc::new(PanickingGenerator));
        let dispatcher = Dispatcher::new(Arc::new(processor));

        let response = dispatcher.process_request(send_hello(9)).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.data.unwrap()["details"], "generator exploded");
        assert_eq!(response.id, Some(RequestId::from(9)));
    }

    #[tokio::test]
    async fn test_stream_aliases_send() {
        let request = JsonRpcRequest::new(
            "message/stream",
            json!({"message": {"role": "user", "parts": [{"kind": "text", "text": "Hi"}]}}),
            5i64,
        );

        let response = dispatcher().oneshot(request).await.unwrap();
        assert_eq!(response.result.unwrap()["status"]["state"], "completed");
    }
}
