use anyhow::Context;
use async_trait::async_trait;

use super::runner::ScheduledJob;
use crate::dispatch::BotContext;
use crate::observability::BotEvent;

/// Ships the logger's buffered history to object storage.
pub struct HistoryUploadJob;

#[async_trait]
impl ScheduledJob for HistoryUploadJob {
    fn name(&self) -> &'static str {
        "history_upload"
    }

    async fn run(&self, ctx: &BotContext) -> anyhow::Result<()> {
        let history = ctx
            .logger()
            .dumps()
            .await
            .context("failed to serialize history")?;
        let bytes = history.len();
        let object_key = ctx
            .uploader()
            .upload(history)
            .await
            .context("history upload failed")?;
        tracing::info!(
            event = BotEvent::HistoryUploaded.as_str(),
            object_key = %object_key,
            bytes,
            "history uploaded"
        );
        Ok(())
    }
}
