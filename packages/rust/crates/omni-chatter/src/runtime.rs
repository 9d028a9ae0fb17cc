//! Process lifecycle: startup handshake, event loop, scheduled jobs, shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::channels::{InboundMessage, TelegramTransport};
use crate::config::{BotConfig, EngagementConfig, JobsConfig};
use crate::dispatch::{BotContext, Collaborators, DispatchOutcome, EventRouter, StartupState};
use crate::history::MemoryMessageLog;
use crate::jobs::{
    HistoryUploadJob, ModelUpdateJob, PeriodicJobOutcome, ScheduledJob, run_periodic_job,
};
use crate::observability::BotEvent;
use crate::predictor::HttpPredictor;
use crate::upload::OssUploader;

/// Runtime knobs taken from [`BotConfig`].
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub group_id: String,
    pub inbound_queue_capacity: usize,
    pub engagement: EngagementConfig,
    pub jobs: JobsConfig,
}

impl RuntimeOptions {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            group_id: config.group_id.clone(),
            inbound_queue_capacity: config.inbound_queue_capacity,
            engagement: config.engagement,
            jobs: config.jobs.clone(),
        }
    }
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The transport's inbound stream closed.
    Disconnected,
    /// Shutdown was requested externally.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub end: StreamEnd,
    pub received: u64,
    pub filtered: u64,
    pub model_update: PeriodicJobOutcome,
    pub history_upload: PeriodicJobOutcome,
}

/// Build the production collaborators: Telegram, HTTP predictor, in-memory log, OSS.
pub fn build_collaborators(config: &BotConfig) -> Result<Collaborators> {
    let transport = TelegramTransport::new(
        config.telegram.bot_token.clone(),
        config.telegram_api_base.clone(),
        config.proxy.as_ref(),
    )
    .context("failed to build Telegram transport")?;
    let predictor =
        HttpPredictor::new(&config.predictor).context("failed to build predictor client")?;
    let uploader = OssUploader::new(&config.storage).context("failed to build OSS uploader")?;
    Ok(Collaborators {
        transport: Arc::new(transport),
        predictor: Arc::new(predictor),
        logger: Arc::new(MemoryMessageLog::new(config.engagement.history_capacity)),
        uploader: Arc::new(uploader),
    })
}

/// Resolve own identity, then the target group. Nothing is dispatched before this succeeds.
pub async fn startup(collaborators: &Collaborators, group_id: &str) -> Result<StartupState> {
    let transport = &collaborators.transport;
    let identity = transport
        .get_self()
        .await
        .context("failed to resolve bot identity")?;
    tracing::info!(
        event = BotEvent::StartupIdentityResolved.as_str(),
        transport = transport.name(),
        bot_id = identity.id,
        username = identity.username.as_deref().unwrap_or_default(),
        "bot identity resolved"
    );
    let group = transport
        .resolve_group(group_id)
        .await
        .with_context(|| format!("failed to resolve target group `{group_id}`"))?;
    tracing::info!(
        event = BotEvent::StartupGroupResolved.as_str(),
        chat_id = group.chat_id,
        title = group.title.as_deref().unwrap_or_default(),
        "target group resolved"
    );
    Ok(StartupState { identity, group })
}

/// Run until the inbound stream closes or `shutdown` is cancelled.
///
/// The predictor is closed before returning on every path, including a
/// failed startup.
pub async fn run_chatter(
    options: RuntimeOptions,
    collaborators: Collaborators,
    router: EventRouter,
    shutdown: CancellationToken,
) -> Result<RunSummary> {
    let state = match startup(&collaborators, &options.group_id).await {
        Ok(state) => state,
        Err(error) => {
            collaborators.predictor.close().await;
            return Err(error);
        }
    };
    let predictor = Arc::clone(&collaborators.predictor);
    let transport = Arc::clone(&collaborators.transport);
    let ctx = Arc::new(BotContext::new(
        state,
        collaborators,
        &options.engagement,
        shutdown.clone(),
    ));
    let router = Arc::new(router);

    let (tx, mut rx) = mpsc::channel::<InboundMessage>(options.inbound_queue_capacity.max(1));
    let listener = tokio::spawn(async move { transport.listen(tx).await });

    let model_update = spawn_job(
        Arc::new(ModelUpdateJob),
        &ctx,
        options.jobs.model_update_interval,
    );
    let history_upload = spawn_job(
        Arc::new(HistoryUploadJob),
        &ctx,
        options.jobs.history_upload_interval,
    );

    let mut handlers: JoinSet<DispatchOutcome> = JoinSet::new();
    let mut received = 0_u64;
    let mut filtered = 0_u64;
    let end = loop {
        tokio::select! {
            () = shutdown.cancelled() => break StreamEnd::Cancelled,
            maybe_message = rx.recv() => {
                let Some(message) = maybe_message else {
                    break StreamEnd::Disconnected;
                };
                received += 1;
                let ctx = Arc::clone(&ctx);
                let router = Arc::clone(&router);
                handlers.spawn(async move { router.dispatch(&ctx, &message).await });
            }
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                record_handler_result(joined, &mut filtered);
            }
        }
    };

    tracing::info!(
        event = BotEvent::ShutdownStarted.as_str(),
        reason = ?end,
        in_flight = handlers.len(),
        "shutting down"
    );
    if end == StreamEnd::Disconnected {
        drain_handlers(&mut handlers, options.jobs.shutdown_grace, &mut filtered).await;
    }
    ctx.begin_shutdown();
    handlers.abort_all();
    while let Some(joined) = handlers.join_next().await {
        record_handler_result(joined, &mut filtered);
    }

    let model_update = join_job("model_update", model_update).await;
    let history_upload = join_job("history_upload", history_upload).await;

    if listener.is_finished() {
        match listener.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!(
                error = %format!("{error:#}"),
                "inbound listener stopped with error"
            ),
            Err(error) => tracing::warn!(error = %error, "inbound listener task failed"),
        }
    } else {
        listener.abort();
    }

    predictor.close().await;
    tracing::info!(
        event = BotEvent::ShutdownCompleted.as_str(),
        received,
        filtered,
        "shutdown complete"
    );

    Ok(RunSummary {
        end,
        received,
        filtered,
        model_update,
        history_upload,
    })
}

fn spawn_job(
    job: Arc<dyn ScheduledJob>,
    ctx: &Arc<BotContext>,
    interval: Duration,
) -> JoinHandle<PeriodicJobOutcome> {
    let ctx = Arc::clone(ctx);
    tokio::spawn(run_periodic_job(job, ctx, interval, None))
}

async fn join_job(name: &str, handle: JoinHandle<PeriodicJobOutcome>) -> PeriodicJobOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(job = name, error = %error, "scheduled job task failed");
            PeriodicJobOutcome::default()
        }
    }
}

fn record_handler_result(
    joined: Result<DispatchOutcome, tokio::task::JoinError>,
    filtered: &mut u64,
) {
    match joined {
        Ok(DispatchOutcome::Filtered) => *filtered += 1,
        Ok(_) => {}
        Err(error) if error.is_cancelled() => {}
        Err(error) => tracing::error!(
            event = BotEvent::HandlerFailed.as_str(),
            error = %error,
            "event handler task panicked"
        ),
    }
}

async fn drain_handlers(
    handlers: &mut JoinSet<DispatchOutcome>,
    grace: Duration,
    filtered: &mut u64,
) {
    let deadline = Instant::now() + grace;
    while !handlers.is_empty() {
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                in_flight = handlers.len(),
                grace_secs = grace.as_secs(),
                "grace period elapsed with handlers still running"
            );
            break;
        }
        match tokio::time::timeout(deadline - now, handlers.join_next()).await {
            Ok(Some(joined)) => record_handler_result(joined, filtered),
            Ok(None) | Err(_) => break,
        }
    }
}
