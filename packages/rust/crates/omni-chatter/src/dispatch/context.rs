//! Process-wide state shared by the dispatcher and scheduled jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::channels::{ChatTransport, GroupHandle, Identity};
use crate::config::EngagementConfig;
use crate::engagement::EngagementPolicy;
use crate::history::MessageLogger;
use crate::predictor::Predictor;
use crate::upload::Uploader;

/// External collaborators the core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn ChatTransport>,
    pub predictor: Arc<dyn Predictor>,
    pub logger: Arc<dyn MessageLogger>,
    pub uploader: Arc<dyn Uploader>,
}

/// Facts established during the startup handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupState {
    pub identity: Identity,
    pub group: GroupHandle,
}

/// Shared engagement state.
///
/// Identity and group are fixed at construction, which only happens after the
/// startup handshake. The response cache and `chance` are the only fields that
/// change while running, and both are updated atomically.
pub struct BotContext {
    identity: Identity,
    group: GroupHandle,
    chance_bits: AtomicU64,
    responses: ResponseCache,
    policy: EngagementPolicy,
    collaborators: Collaborators,
    shutdown: CancellationToken,
}

impl BotContext {
    pub fn new(
        startup: StartupState,
        collaborators: Collaborators,
        engagement: &EngagementConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            identity: startup.identity,
            group: startup.group,
            chance_bits: AtomicU64::new(clamp_probability(engagement.chance).to_bits()),
            responses: ResponseCache::new(engagement.response_cache_capacity),
            policy: EngagementPolicy::from_config(engagement),
            collaborators,
            shutdown,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn group(&self) -> &GroupHandle {
        &self.group
    }

    pub fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn policy(&self) -> &EngagementPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.collaborators.transport
    }

    pub fn predictor(&self) -> &Arc<dyn Predictor> {
        &self.collaborators.predictor
    }

    pub fn logger(&self) -> &Arc<dyn MessageLogger> {
        &self.collaborators.logger
    }

    pub fn uploader(&self) -> &Arc<dyn Uploader> {
        &self.collaborators.uploader
    }

    /// Current spontaneous engagement probability.
    pub fn chance(&self) -> f64 {
        f64::from_bits(self.chance_bits.load(Ordering::Acquire))
    }

    /// Tune the engagement probability (clamped to `[0, 1]`); returns the previous value.
    pub fn set_chance(&self, chance: f64) -> f64 {
        let previous = self
            .chance_bits
            .swap(clamp_probability(chance).to_bits(), Ordering::AcqRel);
        f64::from_bits(previous)
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop accepting work: cancels in-flight handlers and jobs and seals the cache.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
        self.responses.close();
    }
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
