use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::channels::{ChatTransport, GroupHandle, Identity, InboundMessage, MessageId};

/// One message the bot delivered through [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub chat_id: i64,
    pub text: String,
    /// Set for replies.
    pub reply_to: Option<MessageId>,
}

/// In-memory transport: replays scripted inbound messages and records output.
///
/// Messages the bot sends are remembered so later replies to them resolve
/// through `get_reply_target`.
pub struct ScriptedTransport {
    identity: Identity,
    group: GroupHandle,
    inbound: Mutex<VecDeque<InboundMessage>>,
    keep_open: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicI64,
    sent: Mutex<Vec<SentMessage>>,
    known: Mutex<HashMap<MessageId, InboundMessage>>,
    typing_started: AtomicUsize,
    typing_stopped: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(identity: Identity, group: GroupHandle) -> Self {
        Self {
            identity,
            group,
            inbound: Mutex::new(VecDeque::new()),
            keep_open: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicI64::new(1_000),
            sent: Mutex::new(Vec::new()),
            known: Mutex::new(HashMap::new()),
            typing_started: AtomicUsize::new(0),
            typing_stopped: AtomicUsize::new(0),
        }
    }

    /// Queue a message for `listen` and remember it for reply lookups.
    pub fn push_inbound(&self, message: InboundMessage) {
        self.remember(message.clone());
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);
    }

    /// Make a message resolvable through `get_reply_target`.
    pub fn remember(&self, message: InboundMessage) {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message.id, message);
    }

    /// Keep the inbound stream open after the script is exhausted.
    pub fn keep_open(&self, keep_open: bool) {
        self.keep_open.store(keep_open, Ordering::Release);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn typing_started(&self) -> usize {
        self.typing_started.load(Ordering::Acquire)
    }

    pub fn typing_stopped(&self) -> usize {
        self.typing_stopped.load(Ordering::Acquire)
    }

    fn deliver(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> anyhow::Result<MessageId> {
        if self.fail_sends.load(Ordering::Acquire) {
            anyhow::bail!("scripted send failure");
        }
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                id,
                chat_id,
                text: text.to_string(),
                reply_to,
            });
        self.remember(InboundMessage {
            id,
            sender: self.identity.clone(),
            text: text.to_string(),
            chat_id,
            reply_to,
            timestamp: 0,
            reply_snapshot: None,
        });
        Ok(id)
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_self(&self) -> anyhow::Result<Identity> {
        Ok(self.identity.clone())
    }

    async fn resolve_group(&self, _identifier: &str) -> anyhow::Result<GroupHandle> {
        Ok(self.group.clone())
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        loop {
            let next = self
                .inbound
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(message) = next else {
                break;
            };
            if tx.send(message).await.is_err() {
                return Ok(());
            }
        }
        if self.keep_open.load(Ordering::Acquire) {
            tx.closed().await;
        }
        Ok(())
    }

    async fn send(&self, target: &GroupHandle, text: &str) -> anyhow::Result<MessageId> {
        self.deliver(target.chat_id, text, None)
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> anyhow::Result<MessageId> {
        self.deliver(message.chat_id, text, Some(message.id))
    }

    async fn get_reply_target(
        &self,
        message: &InboundMessage,
    ) -> anyhow::Result<Option<InboundMessage>> {
        if let Some(snapshot) = message.reply_snapshot.as_deref() {
            return Ok(Some(snapshot.clone()));
        }
        let Some(reply_to) = message.reply_to else {
            return Ok(None);
        };
        Ok(self
            .known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&reply_to)
            .cloned())
    }

    async fn start_typing(&self, _target: &GroupHandle) -> anyhow::Result<()> {
        self.typing_started.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn stop_typing(&self, _target: &GroupHandle) -> anyhow::Result<()> {
        self.typing_stopped.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
