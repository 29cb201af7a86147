//! # A2A Mesh
//!
//! A Tower-based Agent-to-Agent (A2A) protocol node.
//!
//! Peers discover each other through agent cards, exchange messages over
//! JSON-RPC 2.0 and track each exchange as a task with a strict lifecycle.
//! On top of that, agents hold multi-party discussions and derive insights
//! and synthesized knowledge from what was said.
//!
//! ## Features
//!
//! - **Composable**: the outbound client and the inbound JSON-RPC stack are
//!   Tower services; auth and monitoring are layers
//! - **Pluggable persistence**: every durable write goes through one adapter
//!   trait, backed by a memory server or kept in process
//! - **Typed protocol**: wire types and JSON-RPC error codes are checked at
//!   compile time
//!
//! ## Example
//!
//! ```rust,no_run
//! use a2a_mesh::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = A2AClientBuilder::new_http()
//!         .with_bearer_auth("token123")
//!         .with_timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     let peer: url::Url = "https://agent.example.com".parse()?;
//!     let card = client.discover_agent(&peer).await?;
//!     println!("Connected to: {}", card.name);
//!
//!     let task = client.send_message(&card.url.parse()?, Message::user("Hello")).await?;
//!     println!("Task {} is {}", task.id, task.state());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod discussion;
pub mod events;
pub mod insight;
pub mod layer;
pub mod monitor;
pub mod persistence;
pub mod protocol;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod service;
pub mod store;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        client::{A2AClientBuilder, AgentClient, PeerMessenger},
        config::AgentConfig,
        discussion::DiscussionManager,
        events::{EventBus, LifecycleEvent},
        insight::{InsightEngine, QualityScorer},
        persistence::PersistenceAdapter,
        protocol::error::A2AError,
        protocol::{
            A2AOperation, AgentCard, AgentDiscussion, ContributionType, Message, MessagePart,
            Role, Task, TaskState, TaskStatus,
        },
        registry::AgentRegistry,
        runtime::{A2AAgent, A2AAgentBuilder},
        server::ResponseGenerator,
    };
}
