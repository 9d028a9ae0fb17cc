use anyhow::Context;
use async_trait::async_trait;

use super::runner::ScheduledJob;
use crate::dispatch::BotContext;
use crate::observability::BotEvent;
use crate::predictor::{ModelKind, ModelUpdate};

/// Polls the predictor for new model versions and announces each change to the group.
pub struct ModelUpdateJob;

/// Group announcement for one model transition.
pub fn model_update_announcement(kind: ModelKind, update: &ModelUpdate) -> String {
    format!(
        "{} model updated.\n{} -> {}",
        kind.display_label(),
        update.old_version,
        update.current_version
    )
}

#[async_trait]
impl ScheduledJob for ModelUpdateJob {
    fn name(&self) -> &'static str {
        "model_update"
    }

    async fn run(&self, ctx: &BotContext) -> anyhow::Result<()> {
        let report = ctx
            .predictor()
            .update_model()
            .await
            .context("model update check failed")?;

        let mut failed_announcements = 0_usize;
        for kind in ModelKind::ALL {
            let update = report.get(kind);
            if !update.updated {
                continue;
            }
            let text = model_update_announcement(kind, update);
            match ctx.transport().send(ctx.group(), &text).await {
                Ok(_) => tracing::info!(
                    event = BotEvent::ModelUpdateAnnounced.as_str(),
                    model = kind.as_str(),
                    old_version = %update.old_version,
                    current_version = %update.current_version,
                    "model update announced"
                ),
                Err(error) => {
                    failed_announcements += 1;
                    tracing::warn!(
                        model = kind.as_str(),
                        error = %format!("{error:#}"),
                        "failed to announce model update"
                    );
                }
            }
        }
        if failed_announcements > 0 {
            anyhow::bail!("{failed_announcements} model update announcement(s) failed");
        }
        Ok(())
    }
}
