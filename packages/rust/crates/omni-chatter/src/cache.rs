//! Response cache: outgoing message id → raw prediction payload.
//!
//! Strict FIFO bound: when an insert pushes the map past capacity, the entry
//! inserted earliest is evicted. Reads never reorder entries. Every operation
//! takes the lock exactly once, so a reader never sees an oversized map or a
//! half-applied insert.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::channels::MessageId;

/// Default number of correlated responses kept for `/blame`.
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<MessageId, Value>,
    order: VecDeque<MessageId>,
    closed: bool,
}

/// Bounded FIFO mapping shared by the dispatcher and background jobs.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or overwrite `key`. Overwrites keep the original insertion slot.
    ///
    /// Returns `false` when the cache was closed and the write was dropped.
    pub fn put(&self, key: MessageId, value: Value) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        if state.entries.insert(key, value).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            tracing::debug!(
                evicted_message_id = oldest,
                capacity = self.capacity,
                "response cache evicted oldest entry"
            );
        }
        true
    }

    /// Payload recorded for `key`, if it is still held.
    pub fn get(&self, key: MessageId) -> Option<Value> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(&key).cloned()
    }

    /// Most recently inserted payload.
    pub fn last(&self) -> Option<Value> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .back()
            .and_then(|key| state.entries.get(key))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject all further writes. Existing entries stay readable.
    pub fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }
}
