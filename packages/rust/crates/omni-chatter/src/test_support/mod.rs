//! Test-only collaborators and wrappers for integration tests.

mod predictor;
mod transport;
mod uploader;

use serde_json::Value;

use crate::channels::InboundMessage;

pub use predictor::FakePredictor;
pub use transport::{ScriptedTransport, SentMessage};
pub use uploader::RecordingUploader;

/// Parse one Telegram `getUpdates` entry the way the live listener does.
pub fn parse_telegram_update(update: &Value) -> Option<InboundMessage> {
    crate::channels::parse_update(update)
}
