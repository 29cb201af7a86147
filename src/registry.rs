//! Agent card registry and peer directory
//!
//! Holds the local agent's card, fetches remote cards on demand and keeps an
//! explicit directory of peers. Peers are only added by [`AgentRegistry::register_peer`];
//! discovery alone never populates the directory.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use chrono::{DateTime, Utc};
use url::Url;

use crate::{
    client::AgentClient,
    events::{EventBus, LifecycleEvent},
    monitor::{observe, SharedMonitor},
    protocol::{agent::AgentCard, error::A2AError},
};

/// A registered peer agent
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEntry {
    pub agent_id: String,
    pub card: AgentCard,
    /// JSON-RPC endpoint taken from the card
    pub url: Url,
    pub registered_at: DateTime<Utc>,
}

pub struct AgentRegistry {
    agent_id: String,
    card: AgentCard,
    client: AgentClient,
    peers: RwLock<HashMap<String, PeerEntry>>,
    events: EventBus,
    monitor: SharedMonitor,
}

impl AgentRegistry {
    /// Build the registry for the local agent
    ///
    /// # Errors
    ///
    /// Returns `A2AError::InvalidAgentCard` listing every violation when the
    /// local card is incomplete.
    pub fn new(
        agent_id: impl Into<String>,
        card: AgentCard,
        client: AgentClient,
        events: EventBus,
        monitor: SharedMonitor,
    ) -> Result<Self, A2AError> {
        card.validate()?;
        Ok(Self {
            agent_id: agent_id.into(),
            card,
            client,
            peers: RwLock::new(HashMap::new()),
            events,
            monitor,
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn get_agent_card(&self) -> &AgentCard {
        &self.card
    }

    /// Fetch and validate the card published under `base_url`
    pub async fn discover_agent(&self, base_url: &Url) -> Result<AgentCard, A2AError> {
        let discovery_error = |reason: String| A2AError::Discovery {
            url: base_url.to_string(),
            reason,
        };
        observe(self.monitor.as_ref(), "registry.discover", async {
            let card = self
                .client
                .discover_agent(base_url)
                .await
                .map_err(|err| match err {
                    A2AError::Timeout | A2AError::Transport(_) | A2AError::Auth(_) => err,
                    other => discovery_error(other.to_string()),
                })?;
            card.validate().map_err(|err| discovery_error(err.to_string()))?;
            Ok(card)
        })
        .await
        .inspect(|card| tracing::info!(url = %base_url, name = %card.name, "Discovered agent"))
        .inspect_err(|err| tracing::warn!(url = %base_url, error = %err, "Agent discovery failed"))
    }

    /// Add or replace a peer in the directory
    ///
    /// Returns the peer's JSON-RPC endpoint.
    pub async fn register_peer(
        &self,
        agent_id: impl Into<String>,
        card: AgentCard,
    ) -> Result<Url, A2AError> {
        let agent_id = agent_id.into();
        let url = Url::parse(&card.url).map_err(|e| {
            A2AError::Validation(format!("agent {agent_id} has invalid url '{}': {e}", card.url))
        })?;

        let entry = PeerEntry {
            agent_id: agent_id.clone(),
            card,
            url: url.clone(),
            registered_at: Utc::now(),
        };
        self.peers
            .write()
            .map_err(|_| A2AError::Internal("peer directory lock poisoned".into()))?
            .insert(agent_id.clone(), entry);

        tracing::info!(agent_id = %agent_id, url = %url, "Registered peer agent");
        self.events
            .publish(LifecycleEvent::AgentRegistered {
                agent_id,
                url: url.to_string(),
            })
            .await;
        Ok(url)
    }

    /// Discover the card under `base_url` and register it as `agent_id`
    pub async fn discover_and_register(
        &self,
        agent_id: impl Into<String>,
        base_url: &Url,
    ) -> Result<PeerEntry, A2AError> {
        let agent_id = agent_id.into();
        let card = self.discover_agent(base_url).await?;
        self.register_peer(agent_id.clone(), card).await?;
        self.peer(&agent_id)
            .ok_or(A2AError::AgentNotFound { agent: agent_id })
    }

    pub fn peer(&self, agent_id: &str) -> Option<PeerEntry> {
        self.peers.read().ok()?.get(agent_id).cloned()
    }

    /// Registered peers ordered by agent id
    pub fn peers(&self) -> Vec<PeerEntry> {
        let mut peers: Vec<PeerEntry> = self
            .peers
            .read()
            .map(|peers| peers.values().cloned().collect())
            .unwrap_or_default();
        peers.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        peers
    }

    /// JSON-RPC endpoint for `agent_id`
    ///
    /// Unregistered ids that are themselves `http(s)` URLs resolve to
    /// themselves.
    pub fn resolve(&self, agent_id: &str) -> Result<Url, A2AError> {
        if let Some(peer) = self.peer(agent_id) {
            return Ok(peer.url);
        }
        match Url::parse(agent_id) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            _ => Err(A2AError::AgentNotFound {
                agent: agent_id.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agent_id", &self.agent_id)
            .field("card", &self.card.name)
            .finish_non_exhaustive()
    }
}
