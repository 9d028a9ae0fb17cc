use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use crate::dispatch::BotContext;
use crate::observability::BotEvent;

/// A named recurring action.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &BotContext) -> anyhow::Result<()>;
}

/// Counters reported when a periodic loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodicJobOutcome {
    pub runs: u32,
    pub succeeded: u32,
    pub failed: u32,
}

/// Run `job` every `interval` until shutdown or `max_runs` invocations.
///
/// The first run fires one full interval after start. Each run gets its own
/// task; a failed or panicked run is logged and counted and the next tick
/// fires as usual. Missed ticks are skipped rather
/// than replayed in a burst.
pub async fn run_periodic_job(
    job: Arc<dyn ScheduledJob>,
    ctx: Arc<BotContext>,
    interval: Duration,
    max_runs: Option<u32>,
) -> PeriodicJobOutcome {
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = ctx.shutdown_token().clone();
    let mut outcome = PeriodicJobOutcome::default();

    loop {
        if max_runs.is_some_and(|max_runs| outcome.runs >= max_runs) {
            break;
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut run = tokio::spawn({
            let job = Arc::clone(&job);
            let ctx = Arc::clone(&ctx);
            async move { job.run(&ctx).await }
        });
        let result = tokio::select! {
            () = shutdown.cancelled() => {
                run.abort();
                tracing::debug!(job = job.name(), "job run abandoned on shutdown");
                break;
            }
            joined = &mut run => joined.unwrap_or_else(|error| {
                Err(anyhow::anyhow!("job task did not complete: {error}"))
            }),
        };
        outcome.runs += 1;
        match result {
            Ok(()) => {
                outcome.succeeded += 1;
                tracing::debug!(
                    event = BotEvent::JobRunSucceeded.as_str(),
                    job = job.name(),
                    run = outcome.runs,
                    "scheduled job completed"
                );
            }
            Err(error) => {
                outcome.failed += 1;
                tracing::warn!(
                    event = BotEvent::JobRunFailed.as_str(),
                    job = job.name(),
                    run = outcome.runs,
                    interval_secs = interval.as_secs(),
                    error = %format!("{error:#}"),
                    "scheduled job failed; next run stays scheduled"
                );
            }
        }
    }

    tracing::info!(
        job = job.name(),
        runs = outcome.runs,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "scheduled job loop stopped"
    );
    outcome
}
