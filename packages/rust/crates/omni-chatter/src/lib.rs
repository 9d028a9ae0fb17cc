//! Group-chat agent core.
//!
//! - Event dispatch: group filter → history log → `/blame` or engagement.
//! - Response cache: bounded FIFO correlating sent message ids with raw prediction payloads.
//! - Periodic jobs: model-update announcements and history upload.

#![allow(missing_docs)]

mod cache;
mod channels;
mod config;
mod dispatch;
mod engagement;
mod history;
mod jobs;
mod observability;
mod predictor;
mod runtime;
#[doc(hidden)]
pub mod test_support;
mod upload;

pub use cache::{DEFAULT_RESPONSE_CACHE_CAPACITY, ResponseCache};
pub use channels::{
    ChatId, ChatTransport, GroupHandle, Identity, InboundMessage, MessageId,
    TELEGRAM_DEFAULT_API_BASE, TYPING_REFRESH_INTERVAL, TelegramTransport, TypingGuard,
};
pub use config::{
    BotConfig, ChatterSettings, ConfigError, ENV_API_HASH, ENV_API_ID, ENV_BOT_TOKEN,
    ENV_GROUP_ID, ENV_LEGACY_URL, ENV_OSS_ACCESS_KEY_ID, ENV_OSS_ACCESS_KEY_SECRET,
    ENV_OSS_BUCKET, ENV_OSS_ENDPOINT, ENV_OSS_REGION, ENV_PROXY_PORT, ENV_PROXY_SECRET,
    ENV_PROXY_SERVER, ENV_S2S_URL, EngagementConfig, EngagementSettings, JobSettings, JobsConfig,
    ObjectStorageConfig, PredictorEndpoints, ProxyConfig, TelegramCredentials, TelegramSettings,
    chatter_settings_paths, load_chatter_settings, load_chatter_settings_from_paths,
    set_config_home_override,
};
pub use dispatch::{
    BLAME_COMMAND, BlameHandler, BlameOutcome, BotContext, Collaborators, DispatchOutcome,
    EngagementHandler, EventHandler, EventKind, EventRouter, LOG_ROTATED_NOTICE, StartupState,
};
pub use engagement::{
    EngagementDecision, EngagementInput, EngagementPolicy, HistoryContext, SpontaneousTrigger,
    is_mention,
};
pub use history::{DEFAULT_HISTORY_CAPACITY, MemoryMessageLog, MessageLogger};
pub use jobs::{
    HistoryUploadJob, ModelUpdateJob, PeriodicJobOutcome, ScheduledJob, model_update_announcement,
    run_periodic_job,
};
pub use observability::BotEvent;
pub use predictor::{
    HttpPredictor, ModelKind, ModelUpdate, ModelUpdateReport, Prediction, Predictor, Sentence,
};
pub use runtime::{
    RunSummary, RuntimeOptions, StreamEnd, build_collaborators, run_chatter, startup,
};
pub use upload::{OssRequestSigner, OssUploader, SignedHeaders, Uploader};
