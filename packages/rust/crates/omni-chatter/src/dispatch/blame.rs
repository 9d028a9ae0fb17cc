//! `/blame`: show the raw prediction payload behind one of the bot's messages.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::context::BotContext;
use super::router::EventHandler;
use crate::channels::InboundMessage;
use crate::observability::BotEvent;

pub const LOG_ROTATED_NOTICE: &str = "Log rotated.";

/// What `/blame` answers with, before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlameOutcome {
    Payload(Value),
    LogRotated,
    Silent,
}

pub struct BlameHandler;

impl BlameHandler {
    /// Resolve the answer for `message` against the response cache.
    pub async fn resolve(ctx: &BotContext, message: &InboundMessage) -> BlameOutcome {
        if !message.is_reply() {
            return ctx
                .responses()
                .last()
                .map_or(BlameOutcome::Silent, BlameOutcome::Payload);
        }

        let target = match ctx.transport().get_reply_target(message).await {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!(
                    message_id = message.id,
                    error = %format!("{error:#}"),
                    "failed to fetch blame reply target"
                );
                None
            }
        };
        target
            .filter(|target| target.sender.id == ctx.identity().id)
            .and_then(|target| ctx.responses().get(target.id))
            .map_or(BlameOutcome::LogRotated, BlameOutcome::Payload)
    }
}

#[async_trait]
impl EventHandler for BlameHandler {
    async fn handle(&self, ctx: &BotContext, message: &InboundMessage) -> anyhow::Result<()> {
        let text = match Self::resolve(ctx, message).await {
            BlameOutcome::Payload(payload) => {
                tracing::info!(
                    event = BotEvent::BlameServed.as_str(),
                    message_id = message.id,
                    "serving blame payload"
                );
                serde_json::to_string(&payload).context("failed to serialize blame payload")?
            }
            BlameOutcome::LogRotated => {
                tracing::info!(
                    event = BotEvent::BlameLogRotated.as_str(),
                    message_id = message.id,
                    "blame target no longer cached"
                );
                LOG_ROTATED_NOTICE.to_string()
            }
            BlameOutcome::Silent => {
                tracing::debug!(
                    event = BotEvent::BlameEmpty.as_str(),
                    message_id = message.id,
                    "no cached response to blame"
                );
                return Ok(());
            }
        };
        ctx.transport()
            .reply(message, &text)
            .await
            .context("failed to send blame reply")?;
        Ok(())
    }
}
