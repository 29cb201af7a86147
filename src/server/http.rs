//! A2A gateway HTTP server powered by axum.
//!
//! Serves:
//! - `GET  /.well-known/agent.json`: agent card discovery
//! - `POST {rpc_path}`             : JSON-RPC 2.0 endpoint
//! - `GET  /health`                : health check

use std::{convert::Infallible, future::Future, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::{util::BoxCloneSyncService, ServiceBuilder, ServiceExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    codec::{parse_request, JsonRpcRequest, JsonRpcResponse},
    layer::MonitorLayer,
    monitor::SharedMonitor,
    protocol::agent::{AgentCard, AGENT_CARD_PATH},
    server::dispatcher::Dispatcher,
    store::TaskStore,
};

/// Type-erased inbound JSON-RPC stack
pub type RpcService = BoxCloneSyncService<JsonRpcRequest, JsonRpcResponse, Infallible>;

/// Shared state for the gateway routes
#[derive(Clone)]
pub struct GatewayState {
    card: Arc<AgentCard>,
    rpc: RpcService,
    store: Arc<TaskStore>,
}

impl GatewayState {
    /// Wrap the dispatcher in the monitoring layer
    pub fn new(card: AgentCard, dispatcher: Dispatcher, monitor: SharedMonitor) -> Self {
        let store = dispatcher.processor().store().clone();
        let rpc = ServiceBuilder::new()
            .layer(MonitorLayer::new(monitor))
            .service(dispatcher);
        Self {
            card: Arc::new(card),
            rpc: BoxCloneSyncService::new(rpc),
            store,
        }
    }
}

/// Build the axum router for the gateway
pub fn build_router(state: GatewayState, rpc_path: &str) -> Router {
    Router::new()
        .route(&format!("/{AGENT_CARD_PATH}"), get(get_agent_card))
        .route(rpc_path, post(handle_jsonrpc))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "A2A gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// GET /.well-known/agent.json
async fn get_agent_card(State(state): State<GatewayState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// POST {rpc_path}
///
/// Always answers 200; failures travel in the JSON-RPC error object.
async fn handle_jsonrpc(State(state): State<GatewayState>, body: Bytes) -> Json<JsonRpcResponse> {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };

    match state.rpc.oneshot(request).await {
        Ok(response) => Json(response),
        Err(never) => match never {},
    }
}

/// GET /health
async fn health_check(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agent": state.card.name,
        "protocolVersion": state.card.protocol_version,
        "tasks": state.store.len(),
    }))
}
