//! Content generator abstraction.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use web2050_store::AssetList;

/// Raw transport bytes of a generator's line-framed event stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, GenerationError>> + Send>>;

/// Errors from generating a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The request could not be sent or the connection failed.
    #[error("generator request failed: {0}")]
    Request(String),
    /// The upstream answered with a non-success status.
    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The event stream broke off mid-generation.
    #[error("generator stream failed: {0}")]
    Stream(String),
    /// The stream ended without any designated output.
    #[error("generation produced no content for {key}")]
    Empty { key: String },
    /// A concurrent generation finished without producing the page.
    #[error("page {key} is unavailable after concurrent generation")]
    Unavailable { key: String },
}

/// Produces the event stream for a canonical key.
///
/// Implementations own their upstream timeouts.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Start a generation for `key` with `context` from the same group.
    async fn generate(
        &self,
        key: &str,
        context: &AssetList,
    ) -> Result<ByteStream, GenerationError>;
}
