//! Message history: the logger collaborator and its bounded in-memory backend.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::channels::InboundMessage;

/// Default number of messages retained for context and upload.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Records group messages and serves recent ones back as generation context.
#[async_trait]
pub trait MessageLogger: Send + Sync {
    async fn log(&self, message: &InboundMessage) -> Result<()>;

    /// The most recently logged message.
    async fn last_message(&self) -> Result<Option<InboundMessage>>;

    /// Up to `n` most recent messages, oldest first.
    async fn last_messages(&self, n: usize) -> Result<Vec<InboundMessage>>;

    /// Serialized history for upload.
    async fn dumps(&self) -> Result<String>;
}

/// Ring buffer of the latest messages; the oldest entry is dropped at capacity.
#[derive(Debug)]
pub struct MemoryMessageLog {
    capacity: usize,
    messages: Mutex<VecDeque<InboundMessage>>,
}

impl Default for MemoryMessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MemoryMessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageLogger for MemoryMessageLog {
    async fn log(&self, message: &InboundMessage) -> Result<()> {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        if messages.len() >= self.capacity {
            messages.pop_front();
        }
        let mut record = message.clone();
        record.reply_snapshot = None;
        messages.push_back(record);
        Ok(())
    }

    async fn last_message(&self) -> Result<Option<InboundMessage>> {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(messages.back().cloned())
    }

    async fn last_messages(&self, n: usize) -> Result<Vec<InboundMessage>> {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = messages.len().saturating_sub(n);
        Ok(messages.iter().skip(skip).cloned().collect())
    }

    async fn dumps(&self) -> Result<String> {
        let snapshot: Vec<InboundMessage> = {
            let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
            messages.iter().cloned().collect()
        };
        serde_json::to_string(&snapshot).context("failed to serialize message history")
    }
}
