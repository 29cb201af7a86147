//! Tower Layer implementations for A2A protocol

pub mod auth;
pub mod monitor;

pub use auth::{AuthCredentials, AuthLayer, AuthService};
pub use monitor::{MonitorLayer, MonitorService};
