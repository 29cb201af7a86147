//! Serialization codecs for the A2A wire binding

pub mod jsonrpc;

pub use jsonrpc::{parse_request, JsonRpcCodec, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

use crate::{
    protocol::{error::A2AError, operation::A2AOperation},
    service::response::A2AResponse,
};
use bytes::Bytes;

/// Codec trait for encoding and decoding A2A protocol messages
///
/// A codec implements one protocol binding. Only JSON-RPC over HTTP is
/// provided; the trait is the seam for any other.
pub trait Codec: Send + Sync {
    /// Serialize an A2A operation to bytes for transport
    ///
    /// Operations that are plain HTTP GETs encode to an empty body.
    fn encode_request(&self, operation: &A2AOperation) -> Result<Bytes, A2AError>;

    /// Deserialize transport response bytes to an A2A response
    ///
    /// # Arguments
    ///
    /// * `body` - The response body bytes
    /// * `operation` - The original operation (for context)
    fn decode_response(
        &self,
        body: &[u8],
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &str;
}
