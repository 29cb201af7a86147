//! End-to-end tests of two agents talking over a real socket

use std::sync::Arc;

use a2a_mesh::{
    config::AgentConfig,
    events::LifecycleEvent,
    persistence::{AgentMessageRecord, InMemoryPersistence, RecordKind},
    prelude::*,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot};
use url::Url;

fn config(agent_id: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.agent.id = agent_id.to_string();
    config.agent.name = format!("Agent {agent_id}");
    config
}

/// Serve `agent_id` on an ephemeral port and return its base URL
async fn spawn_agent(agent_id: &str) -> (Url, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut config = config(agent_id);
    config.server.port = port;
    config.agent.url = Some(format!("http://127.0.0.1:{port}/a2a").parse().unwrap());
    let agent = A2AAgent::from_config(config).unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = stopped.await;
        };
        agent.serve(listener, shutdown).await.unwrap();
    });

    let base = format!("http://127.0.0.1:{port}/").parse().unwrap();
    (base, stop)
}

#[tokio::test]
async fn test_discover_then_message_peer() {
    let (base, stop) = spawn_agent("agent-a").await;

    let store = Arc::new(InMemoryPersistence::default());
    let local = A2AAgent::builder(config("agent-b"))
        .with_persistence(store.clone())
        .build()
        .unwrap();
    let mut events = local.events().subscribe();

    let peer = local
        .registry()
        .discover_and_register("agent-a", &base)
        .await
        .unwrap();
    assert_eq!(peer.card.name, "Agent agent-a");
    assert_eq!(peer.url.path(), "/a2a");
    assert!(matches!(
        events.recv().await,
        Some(LifecycleEvent::AgentRegistered { .. })
    ));

    let task = local
        .messenger()
        .send_to_agent("agent-a", Message::user("hello peer"))
        .await
        .unwrap();

    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(task.history.len(), 2);
    assert_eq!(task.history[1].text_content(), "Received: hello peer");
    assert_eq!(task.history[1].metadata_str("agentId"), Some("agent-a"));

    let records = store.records().await;
    let sent: AgentMessageRecord = records
        .iter()
        .find(|r| r.kind() == Some(RecordKind::AgentMessage))
        .unwrap()
        .decode()
        .unwrap();
    assert!(sent.delivered);
    assert_eq!(sent.to_agent, "agent-a");
    assert_eq!(sent.task_id.as_deref(), Some(task.id.as_str()));

    let _ = stop.send(());
}

#[tokio::test]
async fn test_discovery_of_missing_agent_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let local = A2AAgent::from_config(config("agent-b")).unwrap();
    let base: Url = format!("http://127.0.0.1:{port}/").parse().unwrap();

    assert!(local.registry().discover_agent(&base).await.is_err());
    assert!(local.registry().peers().is_empty());
}

#[tokio::test]
async fn test_json_rpc_over_http() {
    let (base, stop) = spawn_agent("agent-a").await;
    let client = reqwest::Client::new();
    let endpoint = base.join("a2a").unwrap();

    let sent: Value = client
        .post(endpoint.clone())
        .json(&json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "message/send",
            "params": {"message": {"role": "user", "parts": [{"kind": "text", "text": "ping"}]}}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sent["id"], "req-1");
    let task_id = sent["result"]["id"].as_str().unwrap().to_string();

    let canceled: Value = client
        .post(endpoint.clone())
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tasks/cancel", "params": {"id": task_id}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Completed tasks are terminal; cancel returns them unchanged
    assert_eq!(canceled["result"]["status"]["state"], "completed");

    let response = client
        .post(endpoint)
        .header("content-type", "application/json")
        .body("{broken")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());

    let health: Value = client
        .get(base.join("health").unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["tasks"], 1);

    let _ = stop.send(());
}
