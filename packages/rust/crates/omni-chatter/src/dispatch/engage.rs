//! Engagement path: policy decision, prediction under a typing indicator,
//! delivery and response-cache write.

use async_trait::async_trait;

use super::context::BotContext;
use super::router::EventHandler;
use crate::channels::{InboundMessage, TypingGuard};
use crate::engagement::{EngagementDecision, EngagementInput, HistoryContext};
use crate::history::MessageLogger;
use crate::observability::BotEvent;
use crate::predictor::Sentence;

pub struct EngagementHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Reply,
    Group,
}

impl Delivery {
    fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Group => "group",
        }
    }
}

#[async_trait]
impl EventHandler for EngagementHandler {
    async fn handle(&self, ctx: &BotContext, message: &InboundMessage) -> anyhow::Result<()> {
        let reply_target = if message.is_reply() {
            match ctx.transport().get_reply_target(message).await {
                Ok(target) => target,
                Err(error) => {
                    tracing::warn!(
                        message_id = message.id,
                        error = %format!("{error:#}"),
                        "failed to fetch reply target"
                    );
                    None
                }
            }
        } else {
            None
        };

        let decision = {
            let input = EngagementInput {
                message,
                reply_target: reply_target.as_ref(),
                own_identity: ctx.identity(),
                chance: ctx.chance(),
            };
            let mut rng = rand::thread_rng();
            ctx.policy().decide(&input, &mut rng)
        };

        let (sentence, delivery) = match decision {
            EngagementDecision::Ignore => {
                tracing::trace!(
                    event = BotEvent::EngagementIgnored.as_str(),
                    message_id = message.id,
                    "engagement skipped"
                );
                return Ok(());
            }
            EngagementDecision::DirectReply { sentence } => (sentence, Delivery::Reply),
            EngagementDecision::Spontaneous { context, trigger } => {
                tracing::debug!(
                    message_id = message.id,
                    trigger = ?trigger,
                    context = ?context,
                    "spontaneous engagement triggered"
                );
                (
                    history_sentence(ctx.logger().as_ref(), context).await?,
                    Delivery::Group,
                )
            }
        };
        if sentence.is_empty() {
            tracing::debug!(message_id = message.id, "empty prediction input, skipping");
            return Ok(());
        }
        tracing::debug!(
            event = BotEvent::EngagementDecided.as_str(),
            message_id = message.id,
            delivery = delivery.as_str(),
            "engaging"
        );

        let prediction = {
            let typing = TypingGuard::acquire(ctx.transport().clone(), ctx.group().clone());
            let result = tokio::select! {
                () = ctx.shutdown_token().cancelled() => {
                    tracing::debug!(message_id = message.id, "prediction abandoned on shutdown");
                    return Ok(());
                }
                result = ctx.predictor().predict(&sentence) => result,
            };
            typing.release().await;
            result
        };
        let prediction = match prediction {
            Ok(prediction) => prediction,
            Err(error) => {
                tracing::warn!(
                    event = BotEvent::PredictionFailed.as_str(),
                    message_id = message.id,
                    error = %format!("{error:#}"),
                    "prediction failed; dropping event"
                );
                return Ok(());
            }
        };

        let sent = match delivery {
            Delivery::Reply => ctx.transport().reply(message, &prediction.text).await,
            Delivery::Group => ctx.transport().send(ctx.group(), &prediction.text).await,
        };
        let sent_id = match sent {
            Ok(sent_id) => sent_id,
            Err(error) => {
                tracing::warn!(
                    event = BotEvent::ResponseSendFailed.as_str(),
                    message_id = message.id,
                    delivery = delivery.as_str(),
                    error = %format!("{error:#}"),
                    "failed to deliver response"
                );
                return Ok(());
            }
        };

        if ctx.responses().put(sent_id, prediction.raw) {
            tracing::info!(
                event = BotEvent::ResponseSent.as_str(),
                message_id = message.id,
                sent_message_id = sent_id,
                delivery = delivery.as_str(),
                "response sent"
            );
        } else {
            tracing::debug!(
                event = BotEvent::ResponseCacheWriteRejected.as_str(),
                sent_message_id = sent_id,
                "response cache closed; correlation dropped"
            );
        }
        Ok(())
    }
}

async fn history_sentence(
    logger: &dyn MessageLogger,
    context: HistoryContext,
) -> anyhow::Result<Sentence> {
    let sentence = match context {
        HistoryContext::Window(n) => Sentence::sequence(
            logger
                .last_messages(n)
                .await?
                .into_iter()
                .map(|message| message.text),
        ),
        HistoryContext::Latest => Sentence::single(
            logger
                .last_message()
                .await?
                .map(|message| message.text)
                .unwrap_or_default(),
        ),
    };
    Ok(sentence)
}
