//! Core A2A protocol types and definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod agent;
pub mod discussion;
pub mod error;
pub mod insight;
pub mod message;
pub mod operation;
pub mod task;

pub use agent::{AgentCapabilities, AgentCard, AgentSkill, CardValidationError, CardViolation};
pub use discussion::{AgentDiscussion, ContributionType, DiscussionContribution, DiscussionStatus};
pub use error::{A2AError, A2AResult};
pub use insight::{
    AgentInsight, CommunicationPattern, InsightType, PatternType, SynthesizedKnowledge, TimeRange,
};
pub use message::{Message, MessagePart, Role};
pub use operation::A2AOperation;
pub use task::{Task, TaskState, TaskStatus};

/// Artifacts represent task outputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique identifier of the Artifact
    pub artifact_id: String,

    /// A human readable name for the Artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A human readable description of the Artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Contents of the Artifact. Must contain at least one part
    pub parts: Vec<MessagePart>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}
