//! History upload to object storage.

mod oss;
mod signing;

use async_trait::async_trait;

pub use oss::OssUploader;
pub use signing::{OssRequestSigner, SignedHeaders};

/// Destination for serialized message history.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Store `history`; returns the object key it was written under.
    async fn upload(&self, history: String) -> anyhow::Result<String>;
}
