//! Agent runtime
//!
//! Wires every component of a running agent from an [`AgentConfig`]. Each
//! collaborator can be replaced through [`A2AAgentBuilder`] before the agent
//! is built.

use std::{future::Future, sync::Arc};

use axum::Router;
use chrono::Utc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::{
    client::{A2AClientBuilder, AgentClient, OutboundMessenger},
    config::{AgentConfig, ConfigError},
    discussion::DiscussionManager,
    events::{EventBus, LifecycleEvent},
    insight::{HeuristicScorer, InsightEngine, QualityScorer},
    monitor::{observe, SharedMonitor, TracingMonitor},
    persistence::{
        AgentStatus, AgentStatusRecord, InMemoryPersistence, MemoryServerClient,
        PersistenceAdapter, PersistenceError,
    },
    protocol::{agent::AgentCard, error::A2AError},
    registry::AgentRegistry,
    server::{build_router, Dispatcher, GatewayState, MessageProcessor, ResponseGenerator},
    store::TaskStore,
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Agent(#[from] A2AError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("gateway I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct A2AAgentBuilder {
    config: AgentConfig,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    monitor: Option<SharedMonitor>,
    generator: Option<Arc<dyn ResponseGenerator>>,
    scorer: Option<Arc<dyn QualityScorer>>,
    client: Option<AgentClient>,
}

impl A2AAgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            persistence: None,
            monitor: None,
            generator: None,
            scorer: None,
            client: None,
        }
    }

    /// Use this adapter instead of the one derived from `[memory]`
    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceAdapter>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_monitor(mut self, monitor: SharedMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ResponseGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Use a preconfigured outbound client
    pub fn with_client(mut self, client: AgentClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<A2AAgent, RuntimeError> {
        let config = self.config;
        config.validate()?;

        let agent_id = config.agent.id.clone();
        let card = AgentCard::from_config(&config);
        let events = EventBus::new(config.events.capacity);
        let monitor = self
            .monitor
            .unwrap_or_else(|| Arc::new(TracingMonitor));
        let scorer = self
            .scorer
            .unwrap_or_else(|| Arc::new(HeuristicScorer::new()));

        let persistence: Arc<dyn PersistenceAdapter> = match (self.persistence, &config.memory) {
            (Some(persistence), _) => persistence,
            (None, Some(memory)) => {
                tracing::info!(base_url = %memory.base_url, "Using memory server persistence");
                Arc::new(MemoryServerClient::from_config(memory)?)
            }
            (None, None) => {
                tracing::info!("No memory server configured; keeping records in process");
                Arc::new(InMemoryPersistence::new(&agent_id))
            }
        };

        let client = match self.client {
            Some(client) => client,
            None => A2AClientBuilder::new_http()
                .with_outbound_config(&config.outbound)
                .build()?,
        };

        let registry = Arc::new(AgentRegistry::new(
            agent_id.clone(),
            card.clone(),
            client.clone(),
            events.clone(),
            monitor.clone(),
        )?);

        let mut processor = MessageProcessor::new(
            agent_id.clone(),
            Arc::new(TaskStore::new()),
            persistence.clone(),
            monitor.clone(),
            events.clone(),
        );
        if let Some(generator) = self.generator {
            processor = processor.with_generator(generator);
        }
        let dispatcher = Dispatcher::new(Arc::new(processor));

        let messenger = Arc::new(OutboundMessenger::new(
            registry.clone(),
            client,
            persistence.clone(),
            monitor.clone(),
        ));
        let discussions = Arc::new(DiscussionManager::new(
            agent_id,
            persistence.clone(),
            messenger.clone(),
            scorer.clone(),
            monitor.clone(),
            events.clone(),
        ));
        let insights = Arc::new(
            InsightEngine::new(persistence.clone(), monitor.clone(), events.clone())
                .with_scorer(scorer),
        );

        Ok(A2AAgent {
            config,
            card,
            persistence,
            monitor,
            events,
            registry,
            dispatcher,
            messenger,
            discussions,
            insights,
        })
    }
}

/// A fully wired agent
pub struct A2AAgent {
    config: AgentConfig,
    card: AgentCard,
    persistence: Arc<dyn PersistenceAdapter>,
    monitor: SharedMonitor,
    events: EventBus,
    registry: Arc<AgentRegistry>,
    dispatcher: Dispatcher,
    messenger: Arc<OutboundMessenger>,
    discussions: Arc<DiscussionManager>,
    insights: Arc<InsightEngine>,
}

impl A2AAgent {
    pub fn builder(config: AgentConfig) -> A2AAgentBuilder {
        A2AAgentBuilder::new(config)
    }

    /// Build with every default collaborator
    pub fn from_config(config: AgentConfig) -> Result<Self, RuntimeError> {
        A2AAgentBuilder::new(config).build()
    }

    pub fn agent_id(&self) -> &str {
        &self.config.agent.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn persistence(&self) -> &Arc<dyn PersistenceAdapter> {
        &self.persistence
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn processor(&self) -> &Arc<MessageProcessor> {
        self.dispatcher.processor()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn messenger(&self) -> &Arc<OutboundMessenger> {
        &self.messenger
    }

    pub fn discussions(&self) -> &Arc<DiscussionManager> {
        &self.discussions
    }

    pub fn insights(&self) -> &Arc<InsightEngine> {
        &self.insights
    }

    /// Gateway router serving the card, the JSON-RPC endpoint and `/health`
    pub fn router(&self) -> Router {
        let state = GatewayState::new(
            self.card.clone(),
            self.dispatcher.clone(),
            self.monitor.clone(),
        );
        build_router(state, &self.config.server.rpc_path)
    }

    /// Bind the configured gateway address
    pub async fn bind(&self) -> Result<TcpListener, RuntimeError> {
        let addr = self.config.server.socket_addr()?;
        Ok(TcpListener::bind(addr).await?)
    }

    /// Announce, serve until `shutdown` resolves, then record going offline
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.announce().await;
        let served = crate::server::serve(listener, self.router(), shutdown).await;
        self.record_status(AgentStatus::Offline).await;
        Ok(served?)
    }

    /// Record this agent as online and publish `AgentInitialized`
    pub async fn announce(&self) {
        self.record_status(AgentStatus::Online).await;
        tracing::info!(
            agent_id = %self.config.agent.id,
            url = %self.card.url,
            skills = self.card.skills.len(),
            "Agent initialized"
        );
        self.events
            .publish(LifecycleEvent::AgentInitialized {
                agent_id: self.config.agent.id.clone(),
            })
            .await;
    }

    async fn record_status(&self, status: AgentStatus) {
        let record = AgentStatusRecord {
            agent_id: self.config.agent.id.clone(),
            status,
            url: self.config.public_url(),
            timestamp: Utc::now(),
        };
        let persisted = observe(
            self.monitor.as_ref(),
            "agent.status",
            self.persistence.persist_agent_status(&record),
        )
        .await;
        if let Err(err) = persisted {
            tracing::warn!(status = ?status, error = %err, "Failed to persist agent status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        monitor::RecordingMonitor,
        persistence::RecordKind,
    };

    fn config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.agent.id = "agent-a".into();
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.server.rpc_path = "a2a".into();

        let err = A2AAgent::from_config(config).err().unwrap();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_card_comes_from_config() {
        let agent = A2AAgent::from_config(config()).unwrap();

        assert_eq!(agent.agent_id(), "agent-a");
        assert_eq!(agent.card().url, "http://127.0.0.1:4100/a2a");
        assert_eq!(agent.card().skills.len(), 3);
        assert_eq!(agent.registry().get_agent_card(), agent.card());
    }

    #[tokio::test]
    async fn test_announce_persists_status_and_publishes() {
        let store = Arc::new(InMemoryPersistence::default());
        let monitor = Arc::new(RecordingMonitor::new());
        let agent = A2AAgent::builder(config())
            .with_persistence(store.clone())
            .with_monitor(monitor.clone())
            .build()
            .unwrap();
        let mut events = agent.events().subscribe();

        agent.announce().await;

        let stored: AgentStatusRecord = store.records().await[0].decode().unwrap();
        assert_eq!(stored.status, AgentStatus::Online);
        assert_eq!(stored.agent_id, "agent-a");
        assert_eq!(store.count(RecordKind::AgentStatus).await, 1);
        assert_eq!(
            events.recv().await,
            Some(LifecycleEvent::AgentInitialized {
                agent_id: "agent-a".into()
            })
        );
        assert_eq!(monitor.events_for("agent.status").len(), 1);
    }

    #[tokio::test]
    async fn test_components_share_persistence() {
        let store = Arc::new(InMemoryPersistence::default());
        let agent = A2AAgent::builder(config())
            .with_persistence(store.clone())
            .build()
            .unwrap();

        agent
            .processor()
            .handle_message(crate::protocol::message::Message::user("pricing review"))
            .await
            .unwrap();
        agent
            .discussions()
            .create_agent_discussion("Pricing", Vec::<String>::new())
            .await
            .unwrap();

        assert_eq!(store.count(RecordKind::TaskSnapshot).await, 3);
        assert_eq!(store.count(RecordKind::AgentDiscussion).await, 1);
    }
}
