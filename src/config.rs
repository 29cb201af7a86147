//! Agent configuration
//!
//! Loaded from TOML, with every field defaulted, then overridden from
//! `A2A_*` and `MEMORY_*` environment variables.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Top-level configuration of a running agent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: AgentIdentity,
    pub server: ServerConfig,
    pub outbound: OutboundConfig,
    /// Memory server; when absent, records are kept in process
    pub memory: Option<MemoryConfig>,
    pub events: EventsConfig,
}

impl AgentConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("A2A_AGENT_ID") {
            self.agent.id = id;
        }
        if let Some(name) = lookup("A2A_AGENT_NAME") {
            self.agent.name = name;
        }
        if let Some(url) = lookup("A2A_PUBLIC_URL") {
            self.agent.url = Some(parse_url("A2A_PUBLIC_URL", &url)?);
        }
        if let Some(bind) = lookup("A2A_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("A2A_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                key: "A2A_PORT".into(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(path) = lookup("A2A_RPC_PATH") {
            self.server.rpc_path = path;
        }
        if let Some(timeout) = lookup("A2A_TIMEOUT_MS") {
            self.outbound.timeout_ms = timeout.parse().map_err(|e| ConfigError::Invalid {
                key: "A2A_TIMEOUT_MS".into(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(token) = lookup("A2A_BEARER_TOKEN") {
            self.outbound.bearer_token = Some(token);
        }

        if let Some(url) = lookup("MEMORY_URL") {
            let base_url = parse_url("MEMORY_URL", &url)?;
            let memory = self.memory.get_or_insert_with(|| MemoryConfig::new(base_url.clone()));
            memory.base_url = base_url;
        }
        if let Some(memory) = self.memory.as_mut() {
            if let Some(key) = lookup("MEMORY_API_KEY") {
                memory.api_key = Some(key);
            }
            if let Some(user) = lookup("MEMORY_USER_ID") {
                memory.user_id = user;
            }
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "agent.id".into(),
                reason: "must not be empty".into(),
            });
        }
        if !self.server.rpc_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "server.rpc_path".into(),
                reason: "must start with '/'".into(),
            });
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "events.capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// URL peers use to reach this agent's JSON-RPC endpoint
    pub fn public_url(&self) -> String {
        match &self.agent.url {
            Some(url) => url.to_string(),
            None => format!(
                "http://{}:{}{}",
                self.server.bind, self.server.port, self.server.rpc_path
            ),
        }
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e: url::ParseError| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Identity advertised on the agent card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentIdentity {
    /// Stable id used as sender and participant identifier
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    /// Public endpoint, when it differs from the bind address
    pub url: Option<Url>,
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            id: "a2a-agent".to_string(),
            name: "A2A Mesh Agent".to_string(),
            description: "Agent-to-agent protocol node with discussion and insight synthesis"
                .to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: None,
        }
    }
}

/// Inbound HTTP gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub rpc_path: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "server.bind".into(),
                reason: e.to_string(),
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 4100,
            rpc_path: "/a2a".to_string(),
        }
    }
}

/// Outbound peer calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutboundConfig {
    pub timeout_ms: u64,
    pub discovery_timeout_ms: u64,
    pub bearer_token: Option<String>,
}

impl OutboundConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            discovery_timeout_ms: 10_000,
            bearer_token: None,
        }
    }
}

/// Memory server connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    pub base_url: Url,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_memory_user")]
    pub user_id: String,
    #[serde(default = "default_memory_timeout")]
    pub timeout_ms: u64,
}

impl MemoryConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            user_id: default_memory_user(),
            timeout_ms: default_memory_timeout(),
        }
    }
}

fn default_memory_user() -> String {
    "a2a-agent".to_string()
}

fn default_memory_timeout() -> u64 {
    10_000
}

/// Lifecycle event bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber queue depth
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}
