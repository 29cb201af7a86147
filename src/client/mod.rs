//! Outbound client API for talking to peer agents

pub mod agent;
pub mod builder;
pub mod config;
pub mod messenger;

pub use agent::{AgentClient, BoxA2AService};
pub use builder::A2AClientBuilder;
pub use config::ClientConfig;
pub use messenger::{OutboundMessenger, PeerMessenger};
