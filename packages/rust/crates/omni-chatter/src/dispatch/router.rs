//! Single router: filter → classify → log → route by [`EventKind`] to a
//! registered handler. `/blame` commands are never written to history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::blame::BlameHandler;
use super::context::BotContext;
use super::engage::EngagementHandler;
use crate::channels::{Identity, InboundMessage};
use crate::observability::BotEvent;

pub const BLAME_COMMAND: &str = "/blame";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `/blame` (optionally `/blame@<own username>`).
    Blame,
    /// Any other group message.
    Message,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blame => "blame",
            Self::Message => "message",
        }
    }

    pub fn classify(text: &str, own_identity: &Identity) -> Self {
        let Some(first_token) = text.split_whitespace().next() else {
            return Self::Message;
        };
        if first_token == BLAME_COMMAND {
            return Self::Blame;
        }
        let addressed_to_us = first_token
            .strip_prefix(BLAME_COMMAND)
            .and_then(|rest| rest.strip_prefix('@'))
            .zip(own_identity.username.as_deref())
            .is_some_and(|(target, own)| target.eq_ignore_ascii_case(own));
        if addressed_to_us {
            Self::Blame
        } else {
            Self::Message
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &BotContext, message: &InboundMessage) -> anyhow::Result<()>;
}

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not addressed to the configured group; nothing was touched.
    Filtered,
    Handled(EventKind),
    Unhandled(EventKind),
    Failed(EventKind),
}

#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the blame command and engagement handlers registered.
    pub fn standard() -> Self {
        let mut router = Self::new();
        router
            .register(EventKind::Blame, Arc::new(BlameHandler))
            .register(EventKind::Message, Arc::new(EngagementHandler));
        router
    }

    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub async fn dispatch(&self, ctx: &BotContext, message: &InboundMessage) -> DispatchOutcome {
        if message.chat_id != ctx.group().chat_id {
            tracing::trace!(
                event = BotEvent::InboundFiltered.as_str(),
                chat_id = message.chat_id,
                message_id = message.id,
                "inbound message outside target group ignored"
            );
            return DispatchOutcome::Filtered;
        }

        let kind = EventKind::classify(&message.text, ctx.identity());
        if kind == EventKind::Message {
            log_inbound(ctx, message).await;
        }

        let Some(handler) = self.handlers.get(&kind) else {
            return DispatchOutcome::Unhandled(kind);
        };
        match handler.handle(ctx, message).await {
            Ok(()) => DispatchOutcome::Handled(kind),
            Err(error) => {
                tracing::warn!(
                    event = BotEvent::HandlerFailed.as_str(),
                    kind = kind.as_str(),
                    message_id = message.id,
                    error = %format!("{error:#}"),
                    "event handler failed"
                );
                DispatchOutcome::Failed(kind)
            }
        }
    }
}

async fn log_inbound(ctx: &BotContext, message: &InboundMessage) {
    match ctx.logger().log(message).await {
        Ok(()) => tracing::debug!(
            event = BotEvent::InboundLogged.as_str(),
            message_id = message.id,
            sender_id = message.sender.id,
            "inbound message logged"
        ),
        Err(error) => tracing::warn!(
            event = BotEvent::InboundLogFailed.as_str(),
            message_id = message.id,
            error = %format!("{error:#}"),
            "failed to log inbound message"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::EventKind;
    use crate::channels::Identity;

    fn own() -> Identity {
        Identity {
            id: 99,
            username: Some("Chatter_Bot".to_string()),
            display_name: String::new(),
        }
    }

    #[test]
    fn classifies_blame_variants() {
        assert_eq!(EventKind::classify("/blame", &own()), EventKind::Blame);
        assert_eq!(EventKind::classify("  /blame please", &own()), EventKind::Blame);
        assert_eq!(
            EventKind::classify("/blame@chatter_bot", &own()),
            EventKind::Blame
        );
        assert_eq!(
            EventKind::classify("/blame@other_bot", &own()),
            EventKind::Message
        );
        assert_eq!(EventKind::classify("/blamed", &own()), EventKind::Message);
        assert_eq!(EventKind::classify("who /blame", &own()), EventKind::Message);
        assert_eq!(EventKind::classify("", &own()), EventKind::Message);
    }
}
