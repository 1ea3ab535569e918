pub mod http;
pub mod mock;

pub use http::HttpRpcClient;
pub use mock::MockCallProvider;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::time::Duration;

/// Failures of the read-only chain-RPC transport.
///
/// [`TransportError::Node`] means the node answered and reported that the
/// call itself failed (a venue-level condition); every other variant means
/// we could not ask the node at all and the caller may retry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc call timed out after {0:?}")]
    Timeout(Duration),
    #[error("node returned error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// True when the node answered but rejected the call. This is the
    /// "venue has no usable pool" class, not a transport outage.
    pub fn is_venue_error(&self) -> bool {
        matches!(self, TransportError::Node { .. })
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_venue_error()
    }
}

/// Read-only contract-call capability (`eth_call` against the latest block).
///
/// The engine shares one provider across concurrent requests; implementations
/// must be stateless per call and safe to reuse without synchronization.
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError>;
}
