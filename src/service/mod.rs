//! Tower Service implementations for outbound peer calls

pub mod core;
pub mod request;
pub mod response;

pub use core::A2AProtocolService;
pub use request::{A2ARequest, RequestContext, DEFAULT_TIMEOUT};
pub use response::A2AResponse;
