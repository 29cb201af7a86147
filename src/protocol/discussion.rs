//! Multi-agent discussion types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{insight::AgentInsight, message::Message};
use crate::insight::QualityScore;

/// A multi-party topic thread, independent of single task exchanges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDiscussion {
    pub id: String,
    pub topic: String,

    /// Participant agent ids; order is irrelevant and duplicates impossible
    pub participants: BTreeSet<String>,

    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub insights: Vec<AgentInsight>,

    pub status: DiscussionStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentDiscussion {
    /// Start an active discussion; the creator is always a participant
    pub fn new<I, S>(topic: impl Into<String>, created_by: impl Into<String>, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let created_by = created_by.into();
        let mut participants: BTreeSet<String> = participants.into_iter().map(Into::into).collect();
        participants.insert(created_by.clone());

        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            topic: topic.into(),
            participants,
            messages: Vec::new(),
            insights: Vec::new(),
            status: DiscussionStatus::Active,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DiscussionStatus::Active
    }

    /// Add a participant, returning whether it was newly inserted
    pub fn add_participant(&mut self, agent_id: impl Into<String>) -> bool {
        let inserted = self.participants.insert(agent_id.into());
        if inserted {
            self.touch();
        }
        inserted
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn conclude(&mut self) {
        self.status = DiscussionStatus::Concluded;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Discussion lifecycle: active → concluded; `paused` is reserved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionStatus {
    Active,
    Concluded,
    Paused,
}

/// Kind of contribution made to a discussion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Message,
    Question,
    Insight,
    Proposal,
    Critique,
    Synthesis,
}

impl ContributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Message => "message",
            ContributionType::Question => "question",
            ContributionType::Insight => "insight",
            ContributionType::Proposal => "proposal",
            ContributionType::Critique => "critique",
            ContributionType::Synthesis => "synthesis",
        }
    }
}

/// Canonical persisted record of one discussion contribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionContribution {
    pub id: String,
    pub discussion_id: String,
    pub agent_id: String,
    pub contribution_type: ContributionType,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityScore>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_is_participant() {
        let discussion = AgentDiscussion::new("Pricing strategy", "agentA", ["agentB"]);

        assert_eq!(discussion.participants.len(), 2);
        assert!(discussion.participants.contains("agentA"));
        assert!(discussion.is_active());
    }

    #[test]
    fn test_participants_are_a_set() {
        let mut discussion = AgentDiscussion::new("t", "agentA", ["agentA", "agentB"]);

        assert_eq!(discussion.participants.len(), 2);
        assert!(!discussion.add_participant("agentB"));
        assert!(discussion.add_participant("agentC"));
        assert_eq!(discussion.participants.len(), 3);
    }

    #[test]
    fn test_status_serialization() {
        let mut discussion = AgentDiscussion::new("t", "a", Vec::<String>::new());
        discussion.conclude();

        let json = serde_json::to_value(&discussion).unwrap();
        assert_eq!(json["status"], "concluded");
        assert!(json["participants"].is_array());
    }
}
