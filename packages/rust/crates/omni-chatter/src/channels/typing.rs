//! Scoped typing presence: held for the duration of a prediction call.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::traits::{ChatTransport, GroupHandle};

/// Chat platforms expire a typing action after ~5s, so it is refreshed below that.
pub const TYPING_REFRESH_INTERVAL: Duration = Duration::from_secs(4);

/// Keeps the typing indicator alive until dropped.
///
/// Dropping the guard cancels the refresh task, which then clears the
/// indicator, so every exit path of the owning scope releases it.
pub struct TypingGuard {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TypingGuard {
    pub fn acquire(transport: Arc<dyn ChatTransport>, target: GroupHandle) -> Self {
        let stop = CancellationToken::new();
        let stop_signal = stop.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TYPING_REFRESH_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = stop_signal.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(error) = transport.start_typing(&target).await {
                            tracing::debug!(
                                transport = transport.name(),
                                chat_id = target.chat_id,
                                error = %error,
                                "failed to refresh typing indicator"
                            );
                        }
                    }
                }
            }
            if let Err(error) = transport.stop_typing(&target).await {
                tracing::debug!(
                    transport = transport.name(),
                    chat_id = target.chat_id,
                    error = %error,
                    "failed to clear typing indicator"
                );
            }
        });
        Self {
            stop,
            task: Some(task),
        }
    }

    /// Release now and wait until the indicator has been cleared.
    pub async fn release(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
