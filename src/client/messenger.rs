//! Agent-to-agent messaging by agent id

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::{
    client::AgentClient,
    monitor::{observe, SharedMonitor},
    persistence::{AgentMessageRecord, PersistenceAdapter},
    protocol::{error::A2AError, message::Message, task::Task},
    registry::AgentRegistry,
};

/// Sends messages to peers addressed by agent id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerMessenger: Send + Sync {
    async fn send_to_agent(&self, agent_id: &str, message: Message) -> Result<Task, A2AError>;
}

/// [`PeerMessenger`] backed by the registry and the outbound client
///
/// Every attempt, delivered or not, is recorded as an agent message.
pub struct OutboundMessenger {
    registry: Arc<AgentRegistry>,
    client: AgentClient,
    persistence: Arc<dyn PersistenceAdapter>,
    monitor: SharedMonitor,
}

impl OutboundMessenger {
    pub fn new(
        registry: Arc<AgentRegistry>,
        client: AgentClient,
        persistence: Arc<dyn PersistenceAdapter>,
        monitor: SharedMonitor,
    ) -> Self {
        Self {
            registry,
            client,
            persistence,
            monitor,
        }
    }

    async fn record(&self, to_agent: &str, message: Message, outcome: &Result<Task, A2AError>) {
        let record = AgentMessageRecord {
            from_agent: self.registry.agent_id().to_string(),
            to_agent: to_agent.to_string(),
            message,
            task_id: outcome.as_ref().ok().map(|task| task.id.clone()),
            delivered: outcome.is_ok(),
            error: outcome.as_ref().err().map(ToString::to_string),
            timestamp: Utc::now(),
        };
        if let Err(err) = self.persistence.persist_agent_message(&record).await {
            tracing::warn!(to_agent, error = %err, "Failed to persist agent message");
        }
    }
}

#[async_trait]
impl PeerMessenger for OutboundMessenger {
    async fn send_to_agent(&self, agent_id: &str, message: Message) -> Result<Task, A2AError> {
        let message = if message.metadata_str("agentId").is_some() {
            message
        } else {
            message.with_metadata("agentId", Value::String(self.registry.agent_id().to_string()))
        };

        let outcome = observe(self.monitor.as_ref(), "outbound.send", async {
            let url = self.registry.resolve(agent_id)?;
            self.client.send_message(&url, message.clone()).await
        })
        .await;

        match &outcome {
            Ok(task) => {
                tracing::debug!(agent_id, task_id = %task.id, state = %task.state(), "Message delivered")
            }
            Err(err) => tracing::warn!(agent_id, error = %err, "Message delivery failed"),
        }
        self.record(agent_id, message, &outcome).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        client::A2AClientBuilder,
        events::EventBus,
        monitor::RecordingMonitor,
        persistence::{InMemoryPersistence, RecordKind},
        protocol::agent::{AgentCard, AgentSkill},
        transport::mock::MockTransport,
    };

    fn messenger(
        transport: MockTransport,
        store: Arc<InMemoryPersistence>,
        monitor: Arc<RecordingMonitor>,
    ) -> OutboundMessenger {
        let client = A2AClientBuilder::new()
            .with_transport(transport)
            .build()
            .unwrap();
        let card = AgentCard::new("Local", "Local agent", "http://127.0.0.1:4100/a2a")
            .with_skill(AgentSkill::new("echo", "Echo"));
        let registry = AgentRegistry::new(
            "agent-a",
            card,
            client.clone(),
            EventBus::default(),
            monitor.clone(),
        )
        .unwrap();
        OutboundMessenger::new(Arc::new(registry), client, store, monitor)
    }

    #[tokio::test]
    async fn test_delivered_message_is_recorded() {
        let transport = MockTransport::json(
            200,
            json!({
                "jsonrpc": "2.0",
                "id": "1",
                "result": {
                    "id": "task-1",
                    "contextId": "ctx-1",
                    "status": {"state": "completed", "timestamp": "2025-01-01T00:00:00Z"},
                    "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "2025-01-01T00:00:00Z"
                }
            }),
        );
        let store = Arc::new(InMemoryPersistence::default());
        let monitor = Arc::new(RecordingMonitor::new());
        let messenger = messenger(transport.clone(), store.clone(), monitor.clone());

        let task = messenger
            .send_to_agent("http://peer:4100/a2a", Message::agent("hello"))
            .await
            .unwrap();

        assert_eq!(task.id, "task-1");
        let body: serde_json::Value = serde_json::from_slice(&transport.requests()[0].body).unwrap();
        assert_eq!(body["params"]["message"]["metadata"]["agentId"], "agent-a");

        let records = store.records().await;
        let stored: AgentMessageRecord = records[0].decode().unwrap();
        assert!(stored.delivered);
        assert_eq!(stored.task_id.as_deref(), Some("task-1"));
        assert!(!monitor.events_for("outbound.send")[0].is_failure());
    }

    #[tokio::test]
    async fn test_unknown_agent_is_recorded_as_undelivered() {
        let store = Arc::new(InMemoryPersistence::default());
        let monitor = Arc::new(RecordingMonitor::new());
        let messenger = messenger(MockTransport::json(200, json!({})), store.clone(), monitor.clone());

        let err = messenger
            .send_to_agent("ghost", Message::agent("hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, A2AError::AgentNotFound { .. }));
        assert_eq!(store.count(RecordKind::AgentMessage).await, 1);
        let stored: AgentMessageRecord = store.records().await[0].decode().unwrap();
        assert!(!stored.delivered);
        assert!(stored.error.is_some());
        assert!(monitor.events_for("outbound.send")[0].is_failure());
    }
}
