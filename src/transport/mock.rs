use std::{
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    protocol::error::A2AError,
    transport::{Transport, TransportRequest, TransportResponse},
};

type Handler = dyn Fn(&TransportRequest) -> TransportResponse + Send + Sync;

/// Mock transport for internal testing
///
/// Answers every request through `handler` and keeps the requests it saw.
#[derive(Clone)]
pub(crate) struct MockTransport {
    handler: Arc<Handler>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<TransportRequest>>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> TransportResponse + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `status` and a JSON body
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(move |_| TransportResponse::new(status).body(body.to_string()))
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = (self.handler)(&request);
        self.seen.lock().unwrap().push(request);
        Ok(response)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").finish()
    }
}
