//! Persistence adapter: the single write path for durable side effects
//!
//! The protocol core never shapes storage records itself. Every durable
//! effect (task snapshots, agent messages, discussions, contributions,
//! insights, knowledge, agent status) goes through a [`PersistenceAdapter`],
//! which turns it into an append-only [`MemoryRecord`] tagged with its
//! [`RecordKind`].

pub mod http;
pub mod memory;

pub use http::MemoryServerClient;
pub use memory::InMemoryPersistence;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::protocol::{
    discussion::{AgentDiscussion, DiscussionContribution},
    insight::{AgentInsight, SynthesizedKnowledge, TimeRange},
    message::Message,
    task::{Task, TaskState},
};

/// Upper bound accepted by the memory server for one search
pub const MAX_SEARCH_LIMIT: usize = 500;

/// Errors raised by a persistence adapter
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backend could not be reached
    #[error("memory backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but refused the request
    #[error("memory backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A stored record could not be decoded into its entity
    #[error("malformed memory record {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => PersistenceError::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => PersistenceError::Unavailable(err.to_string()),
        }
    }
}

/// Kind of entity held by a memory record, stored as `metadata.type`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    TaskSnapshot,
    AgentMessage,
    AgentDiscussion,
    DiscussionContribution,
    AgentInsight,
    SynthesizedKnowledge,
    AgentStatus,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::TaskSnapshot => "task_snapshot",
            RecordKind::AgentMessage => "agent_message",
            RecordKind::AgentDiscussion => "agent_discussion",
            RecordKind::DiscussionContribution => "discussion_contribution",
            RecordKind::AgentInsight => "agent_insight",
            RecordKind::SynthesizedKnowledge => "synthesized_knowledge",
            RecordKind::AgentStatus => "agent_status",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(Value::String(value.to_string())).ok()
    }
}

/// A memory to append to the backend
///
/// `content` holds the JSON encoding of the entity so it survives backends
/// that rewrite or flatten metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub kind: RecordKind,
    pub content: String,
    pub tags: Vec<String>,
}

impl NewMemory {
    pub fn encode<T: Serialize>(kind: RecordKind, entity: &T) -> Result<Self, PersistenceError> {
        Ok(Self {
            kind,
            content: serde_json::to_string(entity)?,
            tags: vec!["a2a".to_string(), kind.as_str().to_string()],
        })
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Metadata block in the memory server's unified metadata shape
    pub fn metadata(&self, user_id: &str) -> Value {
        json!({
            "type": self.kind.as_str(),
            "system": {
                "userId": user_id,
                "source": "a2a-mesh",
                "component": "a2a-protocol",
            },
            "content": {
                "category": self.kind.as_str(),
                "tags": self.tags,
            },
        })
    }
}

/// A stored memory as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl MemoryRecord {
    pub fn kind(&self) -> Option<RecordKind> {
        self.metadata
            .get("type")
            .and_then(Value::as_str)
            .and_then(RecordKind::parse)
    }

    /// Decode the entity held in `content`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PersistenceError> {
        serde_json::from_str(&self.content).map_err(|e| PersistenceError::Malformed {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Free-text search over stored memories
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQuery {
    pub query: String,
    pub kind: Option<RecordKind>,
    pub limit: usize,
}

impl MemoryQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind: None,
            limit: 10,
        }
    }

    pub fn kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        self
    }
}

/// Persisted view of a task after a state transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub task_id: String,
    pub context_id: String,
    pub state: TaskState,
    pub message_count: usize,
    pub artifact_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            state: task.state(),
            message_count: task.history.len(),
            artifact_count: task.artifacts.len(),
            updated_at: task.updated_at,
        }
    }
}

/// Persisted outbound agent-to-agent message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageRecord {
    pub from_agent: String,
    pub to_agent: String,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Degraded,
}

/// Persisted agent presence announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusRecord {
    pub agent_id: String,
    pub status: AgentStatus,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Canonical write path for every durable side effect
///
/// Implementors provide the two backend primitives, [`store`] and
/// [`search`]; the entity-level operations are shaped on top of them.
///
/// [`store`]: PersistenceAdapter::store
/// [`search`]: PersistenceAdapter::search
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Append one memory record
    async fn store(&self, memory: NewMemory) -> Result<MemoryRecord, PersistenceError>;

    /// Search stored memories
    async fn search(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, PersistenceError>;

    async fn persist_task(&self, snapshot: &TaskSnapshot) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::TaskSnapshot, snapshot)?
            .with_tag(snapshot.state.as_str());
        self.store(memory).await.map(drop)
    }

    async fn persist_agent_message(
        &self,
        record: &AgentMessageRecord,
    ) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::AgentMessage, record)?;
        self.store(memory).await.map(drop)
    }

    /// Append a new version of a discussion; the latest `updatedAt` wins
    async fn persist_discussion(
        &self,
        discussion: &AgentDiscussion,
    ) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::AgentDiscussion, discussion)?;
        self.store(memory).await.map(drop)
    }

    /// Latest stored version of a discussion
    ///
    /// Adapters return hits newest first, so among versions sharing an
    /// `updatedAt` the first one seen wins.
    async fn load_discussion(
        &self,
        discussion_id: &str,
    ) -> Result<Option<AgentDiscussion>, PersistenceError> {
        let query = MemoryQuery::new(discussion_id)
            .kind(RecordKind::AgentDiscussion)
            .limit(MAX_SEARCH_LIMIT);
        let records = self.search(&query).await?;

        let mut latest: Option<AgentDiscussion> = None;
        for record in records
            .iter()
            .filter(|r| r.kind() == Some(RecordKind::AgentDiscussion))
        {
            let Ok(discussion) = record.decode::<AgentDiscussion>() else {
                tracing::warn!(record_id = %record.id, "Skipping undecodable discussion record");
                continue;
            };
            if discussion.id != discussion_id {
                continue;
            }
            if latest
                .as_ref()
                .map_or(true, |current| discussion.updated_at > current.updated_at)
            {
                latest = Some(discussion);
            }
        }
        Ok(latest)
    }

    async fn persist_contribution(
        &self,
        contribution: &DiscussionContribution,
    ) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::DiscussionContribution, contribution)?
            .with_tag(contribution.contribution_type.as_str());
        self.store(memory).await.map(drop)
    }

    /// Stored contributions, optionally restricted to a time window
    async fn load_contributions(
        &self,
        range: Option<TimeRange>,
    ) -> Result<Vec<DiscussionContribution>, PersistenceError> {
        let query = MemoryQuery::new("")
            .kind(RecordKind::DiscussionContribution)
            .limit(MAX_SEARCH_LIMIT);
        let records = self.search(&query).await?;

        Ok(records
            .iter()
            .filter(|r| r.kind() == Some(RecordKind::DiscussionContribution))
            .filter_map(|r| r.decode::<DiscussionContribution>().ok())
            .filter(|c| range.map_or(true, |range| range.contains(c.created_at)))
            .collect())
    }

    async fn persist_insight(&self, insight: &AgentInsight) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::AgentInsight, insight)?;
        self.store(memory).await.map(drop)
    }

    async fn persist_knowledge(
        &self,
        knowledge: &SynthesizedKnowledge,
    ) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::SynthesizedKnowledge, knowledge)?;
        self.store(memory).await.map(drop)
    }

    async fn persist_agent_status(
        &self,
        status: &AgentStatusRecord,
    ) -> Result<(), PersistenceError> {
        let memory = NewMemory::encode(RecordKind::AgentStatus, status)?;
        self.store(memory).await.map(drop)
    }
}
