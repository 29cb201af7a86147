//! Multi-agent discussion manager
//!
//! Discussions live in the persistence adapter. Each change appends a new
//! version of the aggregate discussion record, and every contribution is
//! additionally stored as its own canonical record. Reads take the latest
//! aggregate version. Updates to one discussion made through the same manager
//! are applied one at a time.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    client::PeerMessenger,
    events::{EventBus, LifecycleEvent},
    insight::QualityScorer,
    monitor::{observe, OperationEvent, SharedMonitor},
    persistence::PersistenceAdapter,
    protocol::{
        discussion::{AgentDiscussion, ContributionType, DiscussionContribution},
        error::A2AError,
        insight::AgentInsight,
        message::Message,
    },
};

/// Metadata `type` of invitation messages
pub const INVITATION_TYPE: &str = "discussion_invitation";

pub struct DiscussionManager {
    agent_id: String,
    persistence: Arc<dyn PersistenceAdapter>,
    messenger: Arc<dyn PeerMessenger>,
    scorer: Arc<dyn QualityScorer>,
    monitor: SharedMonitor,
    events: EventBus,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DiscussionManager {
    pub fn new(
        agent_id: impl Into<String>,
        persistence: Arc<dyn PersistenceAdapter>,
        messenger: Arc<dyn PeerMessenger>,
        scorer: Arc<dyn QualityScorer>,
        monitor: SharedMonitor,
        events: EventBus,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            persistence,
            messenger,
            scorer,
            monitor,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Start a discussion and invite every other participant
    ///
    /// The discussion is persisted before any invitation goes out.
    /// Invitations are sent in the background; an unreachable invitee is
    /// logged and does not undo the discussion.
    pub async fn create_agent_discussion<I, S>(
        &self,
        topic: impl Into<String>,
        participants: I,
    ) -> Result<String, A2AError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let discussion = AgentDiscussion::new(topic, self.agent_id.clone(), participants);

        observe(
            self.monitor.as_ref(),
            "discussion.create",
            self.persistence.persist_discussion(&discussion),
        )
        .await?;

        tracing::info!(
            discussion_id = %discussion.id,
            topic = %discussion.topic,
            participants = discussion.participants.len(),
            "Created discussion"
        );
        self.events
            .publish(LifecycleEvent::DiscussionCreated {
                discussion_id: discussion.id.clone(),
                topic: discussion.topic.clone(),
            })
            .await;

        self.send_invitations(&discussion);
        Ok(discussion.id)
    }

    fn send_invitations(&self, discussion: &AgentDiscussion) {
        let invitees = discussion
            .participants
            .iter()
            .filter(|participant| **participant != self.agent_id);

        for invitee in invitees {
            let invitation = Message::agent(format!(
                "{} invites you to discuss '{}'",
                self.agent_id, discussion.topic
            ))
            .with_metadata("type", Value::String(INVITATION_TYPE.into()))
            .with_metadata("discussionId", Value::String(discussion.id.clone()))
            .with_metadata("topic", Value::String(discussion.topic.clone()))
            .with_metadata("agentId", Value::String(self.agent_id.clone()));

            let messenger = self.messenger.clone();
            let invitee = invitee.clone();
            let discussion_id = discussion.id.clone();
            tokio::spawn(async move {
                if let Err(err) = messenger.send_to_agent(&invitee, invitation).await {
                    tracing::warn!(
                        discussion_id = %discussion_id,
                        invitee = %invitee,
                        error = %err,
                        "Discussion invitation failed"
                    );
                }
            });
        }
    }

    /// Latest version of a discussion, or `None` when unknown or unreadable
    pub async fn get_discussion(&self, discussion_id: &str) -> Option<AgentDiscussion> {
        match observe(
            self.monitor.as_ref(),
            "discussion.load",
            self.persistence.load_discussion(discussion_id),
        )
        .await
        {
            Ok(discussion) => discussion,
            Err(err) => {
                tracing::warn!(discussion_id, error = %err, "Failed to load discussion");
                None
            }
        }
    }

    /// Join an active discussion
    ///
    /// Returns `false` when the discussion is unknown, concluded, or the
    /// updated record could not be stored. Joining twice is a no-op.
    pub async fn join_agent_discussion(&self, discussion_id: &str) -> bool {
        let _guard = self.lock_discussion(discussion_id).await;
        let Some(mut discussion) = self.get_discussion(discussion_id).await else {
            tracing::debug!(discussion_id, "Cannot join unknown discussion");
            return false;
        };
        if !discussion.is_active() {
            tracing::debug!(discussion_id, status = ?discussion.status, "Cannot join inactive discussion");
            return false;
        }
        if !discussion.add_participant(self.agent_id.clone()) {
            return true;
        }

        if let Err(err) = self.store(&discussion, "discussion.join").await {
            tracing::warn!(discussion_id, error = %err, "Failed to persist joined discussion");
            return false;
        }

        tracing::info!(discussion_id, agent_id = %self.agent_id, "Joined discussion");
        self.events
            .publish(LifecycleEvent::DiscussionJoined {
                discussion_id: discussion_id.to_string(),
                agent_id: self.agent_id.clone(),
            })
            .await;
        true
    }

    /// Add a contribution and return the message that carries it
    ///
    /// The canonical contribution record is always written (failures are
    /// logged). The aggregate discussion is updated when it can be found.
    ///
    /// # Errors
    ///
    /// `Validation` for empty content and `UnsupportedOperation` when the
    /// discussion has been concluded.
    pub async fn contribute_to_agent_discussion(
        &self,
        discussion_id: &str,
        content: impl Into<String>,
        contribution_type: ContributionType,
    ) -> Result<Message, A2AError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(A2AError::Validation(
                "contribution content must not be empty".into(),
            ));
        }

        let _guard = self.lock_discussion(discussion_id).await;
        let aggregate = self.get_discussion(discussion_id).await;
        if let Some(discussion) = &aggregate {
            if !discussion.is_active() {
                return Err(A2AError::UnsupportedOperation(format!(
                    "discussion {discussion_id} is {:?}",
                    discussion.status
                )));
            }
        }

        let quality = self.scorer.score(&content);
        let message = Message::agent(content)
            .with_metadata("agentId", Value::String(self.agent_id.clone()))
            .with_metadata("discussionId", Value::String(discussion_id.to_string()))
            .with_metadata(
                "contributionType",
                Value::String(contribution_type.as_str().to_string()),
            );

        let contribution = DiscussionContribution {
            id: Uuid::now_v7().to_string(),
            discussion_id: discussion_id.to_string(),
            agent_id: self.agent_id.clone(),
            contribution_type,
            message: message.clone(),
            quality: Some(quality),
            created_at: Utc::now(),
        };

        let started = Instant::now();
        match self.persistence.persist_contribution(&contribution).await {
            Ok(()) => self.monitor.record(OperationEvent::success(
                "discussion.contribute",
                started.elapsed(),
            )),
            Err(err) => {
                tracing::warn!(discussion_id, error = %err, "Failed to persist contribution");
                self.monitor.record(OperationEvent::failure(
                    "discussion.contribute",
                    started.elapsed(),
                    &err,
                ));
            }
        }

        match aggregate {
            Some(mut discussion) => {
                discussion.add_participant(self.agent_id.clone());
                discussion.push_message(message.clone());
                if let Err(err) = self.store(&discussion, "discussion.aggregate").await {
                    tracing::warn!(discussion_id, error = %err, "Failed to update discussion record");
                }
            }
            None => {
                tracing::warn!(discussion_id, "No discussion record to update; contribution stored alone")
            }
        }

        self.events
            .publish(LifecycleEvent::ContributionAdded {
                discussion_id: discussion_id.to_string(),
                contribution_id: contribution.id,
                agent_id: self.agent_id.clone(),
            })
            .await;
        Ok(message)
    }

    /// Mark a discussion concluded; concluding twice is a no-op
    pub async fn conclude_agent_discussion(&self, discussion_id: &str) -> bool {
        let _guard = self.lock_discussion(discussion_id).await;
        let Some(mut discussion) = self.get_discussion(discussion_id).await else {
            return false;
        };
        if !discussion.is_active() {
            return true;
        }

        discussion.conclude();
        if let Err(err) = self.store(&discussion, "discussion.conclude").await {
            tracing::warn!(discussion_id, error = %err, "Failed to persist concluded discussion");
            return false;
        }

        tracing::info!(discussion_id, messages = discussion.messages.len(), "Concluded discussion");
        self.events
            .publish(LifecycleEvent::DiscussionConcluded {
                discussion_id: discussion_id.to_string(),
            })
            .await;
        true
    }

    /// Append insights to a discussion so later synthesis can pool them
    pub async fn attach_insights(&self, discussion_id: &str, insights: Vec<AgentInsight>) -> bool {
        let _guard = self.lock_discussion(discussion_id).await;
        let Some(mut discussion) = self.get_discussion(discussion_id).await else {
            return false;
        };
        discussion.insights.extend(insights);
        discussion.updated_at = Utc::now();

        match self.store(&discussion, "discussion.attach_insights").await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(discussion_id, error = %err, "Failed to persist discussion insights");
                false
            }
        }
    }

    /// Held across each read-modify-write of one discussion's aggregate
    async fn lock_discussion(&self, discussion_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(discussion_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn store(&self, discussion: &AgentDiscussion, operation: &str) -> Result<(), A2AError> {
        observe(
            self.monitor.as_ref(),
            operation,
            self.persistence.persist_discussion(discussion),
        )
        .await
        .map_err(A2AError::from)
    }
}
