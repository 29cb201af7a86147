//! Inbound side of the protocol: message processing, JSON-RPC dispatch and
//! the HTTP gateway

pub mod dispatcher;
pub mod http;
pub mod processor;

pub use dispatcher::Dispatcher;
pub use http::{build_router, serve, GatewayState};
pub use processor::{EchoResponder, MessageProcessor, ResponseGenerator};
