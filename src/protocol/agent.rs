//! Agent discovery and capability types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::AgentConfig;

/// Protocol version advertised by cards built by this crate
pub const PROTOCOL_VERSION: &str = "0.3.0";

/// Path of the discovery document relative to an agent's base URL
pub const AGENT_CARD_PATH: &str = ".well-known/agent.json";

/// Discovery document URL for an agent rooted at `base`
///
/// `base` is treated as a directory, so `http://peer/agents/a` resolves to
/// `http://peer/agents/a/.well-known/agent.json`.
pub fn card_url(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.join(AGENT_CARD_PATH)
}

/// Agent Card for agent discovery
///
/// The Agent Card is published at `/.well-known/agent.json` and describes the
/// agent's identity, capabilities and skills. Fields default when absent so a
/// malformed remote card surfaces as validation violations rather than an
/// opaque parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// A2A protocol version the agent speaks
    #[serde(default)]
    pub protocol_version: String,

    /// Name of the agent
    #[serde(default)]
    pub name: String,

    /// Human-readable description of the agent
    #[serde(default)]
    pub description: String,

    /// Reachable JSON-RPC endpoint
    #[serde(default)]
    pub url: String,

    /// Agent version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Agent capabilities
    #[serde(default)]
    pub capabilities: AgentCapabilities,

    /// Skills offered by the agent
    #[serde(default)]
    pub skills: Vec<AgentSkill>,

    /// Content types accepted by default
    #[serde(default)]
    pub default_input_modes: Vec<String>,

    /// Content types produced by default
    #[serde(default)]
    pub default_output_modes: Vec<String>,

    /// Organization operating the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// URL to agent documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl AgentCard {
    /// Create a new agent card
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            name: name.into(),
            description: description.into(),
            url: url.into(),
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            ..Default::default()
        }
    }

    /// Build the card for the locally running agent
    pub fn from_config(config: &AgentConfig) -> Self {
        let identity = &config.agent;
        let modes = vec!["text/plain".to_string(), "application/json".to_string()];

        Self::new(&identity.name, &identity.description, config.public_url())
            .with_version(&identity.version)
            .with_capabilities(AgentCapabilities {
                streaming: false,
                push_notifications: false,
                state_transition_history: true,
            })
            .with_skill(
                AgentSkill::new("agent-messaging", "Agent Messaging")
                    .with_description("Exchange messages and tasks with peer agents over JSON-RPC.")
                    .with_tags(["messaging", "tasks"])
                    .with_modes(modes.clone()),
            )
            .with_skill(
                AgentSkill::new("agent-discussion", "Multi-Agent Discussion")
                    .with_description("Create, join and contribute to multi-agent discussion threads.")
                    .with_tags(["discussion", "multi-agent"])
                    .with_modes(modes.clone()),
            )
            .with_skill(
                AgentSkill::new("insight-synthesis", "Insight Synthesis")
                    .with_description("Detect recurring topics and synthesize knowledge across discussions.")
                    .with_tags(["insight", "synthesis", "patterns"])
                    .with_modes(modes.clone()),
            )
            .with_modes(modes)
    }

    /// Set the agent version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the capabilities
    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Add a skill
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Set both default input and output modes
    pub fn with_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes.clone();
        self.default_output_modes = modes;
        self
    }

    /// Check the card invariants, reporting every violation at once
    pub fn validate(&self) -> Result<(), CardValidationError> {
        let mut violations = Vec::new();

        if self.protocol_version.trim().is_empty() {
            violations.push(CardViolation::MissingProtocolVersion);
        }
        if self.name.trim().is_empty() {
            violations.push(CardViolation::MissingName);
        }
        if self.description.trim().is_empty() {
            violations.push(CardViolation::MissingDescription);
        }
        if self.url.trim().is_empty() {
            violations.push(CardViolation::MissingUrl);
        }
        if self.skills.is_empty() {
            violations.push(CardViolation::NoSkills);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CardValidationError { violations })
        }
    }
}

/// Agent capabilities
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Supports streaming responses
    #[serde(default)]
    pub streaming: bool,

    /// Supports push notifications via webhooks
    #[serde(default)]
    pub push_notifications: bool,

    /// Exposes task state history
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A skill advertised on the agent card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_modes: Vec<String>,
}

impl AgentSkill {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            examples: Vec::new(),
            input_modes: Vec::new(),
            output_modes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modes(mut self, modes: Vec<String>) -> Self {
        self.input_modes = modes.clone();
        self.output_modes = modes;
        self
    }
}

/// Organization operating an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProvider {
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single agent card invariant violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardViolation {
    MissingProtocolVersion,
    MissingName,
    MissingDescription,
    MissingUrl,
    NoSkills,
}

impl fmt::Display for CardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CardViolation::MissingProtocolVersion => "protocolVersion is required",
            CardViolation::MissingName => "name is required",
            CardViolation::MissingDescription => "description is required",
            CardViolation::MissingUrl => "url is required",
            CardViolation::NoSkills => "at least one skill is required",
        };
        f.write_str(text)
    }
}

/// Agent card failed validation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid agent card: {}", join_violations(.violations))]
pub struct CardValidationError {
    pub violations: Vec<CardViolation>,
}

fn join_violations(violations: &[CardViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
