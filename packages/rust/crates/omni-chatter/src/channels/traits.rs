//! Chat transport trait and message types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Message identifier assigned by the chat platform.
pub type MessageId = i64;
/// Chat (group or private) identifier.
pub type ChatId = i64;

/// A chat participant; the bot's own identity is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: String,
}

impl Identity {
    /// `@username` prefix used to address this identity, if it has a username.
    pub fn mention(&self) -> Option<String> {
        self.username
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| format!("@{name}"))
    }
}

/// Resolved address of the group the bot serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub chat_id: ChatId,
    pub title: Option<String>,
}

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub sender: Identity,
    pub text: String,
    pub chat_id: ChatId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// Unix timestamp (seconds) reported by the platform.
    #[serde(default)]
    pub timestamp: i64,
    /// Snapshot of the replied-to message when the platform delivers it inline.
    #[serde(skip)]
    pub reply_snapshot: Option<Box<InboundMessage>>,
}

impl InboundMessage {
    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

/// Narrow contract the dispatcher and jobs use to talk to the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Identity of the bot account.
    async fn get_self(&self) -> anyhow::Result<Identity>;

    /// Resolve a configured group identifier into an addressable handle.
    async fn resolve_group(&self, identifier: &str) -> anyhow::Result<GroupHandle>;

    /// Deliver inbound messages until the stream ends or `tx` is closed.
    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Post a new message to `target`; returns the id the platform assigned.
    async fn send(&self, target: &GroupHandle, text: &str) -> anyhow::Result<MessageId>;

    /// Reply to `message`; returns the id the platform assigned.
    async fn reply(&self, message: &InboundMessage, text: &str) -> anyhow::Result<MessageId>;

    /// The message `message` replies to, when it can be recovered.
    async fn get_reply_target(
        &self,
        message: &InboundMessage,
    ) -> anyhow::Result<Option<InboundMessage>> {
        Ok(message.reply_snapshot.as_deref().cloned())
    }

    /// Show a "typing" presence in `target`.
    async fn start_typing(&self, _target: &GroupHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// Clear the presence indicator in `target`.
    async fn stop_typing(&self, _target: &GroupHandle) -> anyhow::Result<()> {
        Ok(())
    }
}
