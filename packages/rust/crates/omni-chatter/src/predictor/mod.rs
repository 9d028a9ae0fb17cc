//! Prediction backends: sentence-to-sentence generation and model-version polling.

mod http;
mod types;

use async_trait::async_trait;

pub use http::HttpPredictor;
pub use types::{ModelKind, ModelUpdate, ModelUpdateReport, Prediction, Sentence};

/// Contract for the generation service consumed by the dispatcher and jobs.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Generate a reply for `sentence`.
    async fn predict(&self, sentence: &Sentence) -> anyhow::Result<Prediction>;

    /// Poll both models for a version change since the previous check.
    async fn update_model(&self) -> anyhow::Result<ModelUpdateReport>;

    /// Release backend connections. Later calls fail.
    async fn close(&self);
}
