//! Monitoring layer for inbound JSON-RPC dispatch

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use tower_layer::Layer;
use tower_service::Service;

use crate::{
    codec::{JsonRpcRequest, JsonRpcResponse},
    monitor::{OperationEvent, SharedMonitor},
};

/// Records one `rpc.{method}` event per dispatched request
///
/// A response carrying a JSON-RPC error counts as a failure.
#[derive(Clone)]
pub struct MonitorLayer {
    monitor: SharedMonitor,
}

impl MonitorLayer {
    pub fn new(monitor: SharedMonitor) -> Self {
        Self { monitor }
    }
}

impl<S> Layer<S> for MonitorLayer {
    type Service = MonitorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MonitorService {
            inner,
            monitor: self.monitor.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MonitorService<S> {
    inner: S,
    monitor: SharedMonitor,
}

impl<S> Service<JsonRpcRequest> for MonitorService<S>
where
    S: Service<JsonRpcRequest, Response = JsonRpcResponse>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = JsonRpcResponse;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: JsonRpcRequest) -> Self::Future {
        let operation = format!("rpc.{}", req.method);
        let monitor = self.monitor.clone();
        let started = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;
            let event = match &result {
                Ok(response) => match &response.error {
                    Some(error) => OperationEvent::failure(
                        operation,
                        started.elapsed(),
                        format!("{}: {}", error.code, error.message),
                    ),
                    None => OperationEvent::success(operation, started.elapsed()),
                },
                Err(_) => {
                    OperationEvent::failure(operation, started.elapsed(), "service error")
                }
            };
            monitor.record(event);
            result
        })
    }
}
