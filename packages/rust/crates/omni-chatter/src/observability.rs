//! Stable event names attached to lifecycle log lines as `event = ...`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotEvent {
    StartupIdentityResolved,
    StartupGroupResolved,
    InboundFiltered,
    InboundLogged,
    InboundLogFailed,
    BlameServed,
    BlameLogRotated,
    BlameEmpty,
    EngagementIgnored,
    EngagementDecided,
    PredictionFailed,
    ResponseSent,
    ResponseSendFailed,
    ResponseCacheWriteRejected,
    HandlerFailed,
    JobRunSucceeded,
    JobRunFailed,
    ModelUpdateAnnounced,
    HistoryUploaded,
    ShutdownStarted,
    ShutdownCompleted,
}

impl BotEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartupIdentityResolved => "chatter.startup.identity_resolved",
            Self::StartupGroupResolved => "chatter.startup.group_resolved",
            Self::InboundFiltered => "chatter.inbound.filtered",
            Self::InboundLogged => "chatter.inbound.logged",
            Self::InboundLogFailed => "chatter.inbound.log_failed",
            Self::BlameServed => "chatter.blame.served",
            Self::BlameLogRotated => "chatter.blame.log_rotated",
            Self::BlameEmpty => "chatter.blame.empty",
            Self::EngagementIgnored => "chatter.engagement.ignored",
            Self::EngagementDecided => "chatter.engagement.decided",
            Self::PredictionFailed => "chatter.prediction.failed",
            Self::ResponseSent => "chatter.response.sent",
            Self::ResponseSendFailed => "chatter.response.send_failed",
            Self::ResponseCacheWriteRejected => "chatter.response.cache_write_rejected",
            Self::HandlerFailed => "chatter.handler.failed",
            Self::JobRunSucceeded => "chatter.job.succeeded",
            Self::JobRunFailed => "chatter.job.failed",
            Self::ModelUpdateAnnounced => "chatter.job.model_update_announced",
            Self::HistoryUploaded => "chatter.job.history_uploaded",
            Self::ShutdownStarted => "chatter.shutdown.started",
            Self::ShutdownCompleted => "chatter.shutdown.completed",
        }
    }
}
