//! Derived insight, knowledge and communication pattern types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::insight::QualityScore;

/// A derived, scored observation; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub content: String,
    /// In `[0, 1]`; a frequency ratio, not a calibrated probability
    pub confidence: f64,
    pub contributing_agents: Vec<String>,
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub implications: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub relevance_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Pattern,
    Synthesis,
    Breakthrough,
    Connection,
    Optimization,
}

/// Aggregate built from insights across several discussion threads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedKnowledge {
    pub id: String,
    pub content: String,
    pub source_threads: Vec<String>,
    pub contributors: Vec<String>,
    pub confidence: f64,
    /// In `[0, 100]`
    pub quality_score: f64,
    pub implications: Vec<String>,
    pub action_items: Vec<String>,
    pub validation: QualityScore,
    pub created_at: DateTime<Utc>,
}

/// Statistical regularity observed over a message corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPattern {
    pub id: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub frequency: usize,
    pub participants: Vec<String>,
    pub confidence: f64,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    RecurringTopic,
    CollaborationStyle,
    ProblemSolvingApproach,
    KnowledgeSharing,
}

/// Inclusive time window used to filter persisted records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering the last `hours` hours
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::hours(hours),
            end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}
