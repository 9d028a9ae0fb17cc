//! Process configuration: credentials and endpoints from the environment,
//! tunables from settings YAML with environment overrides.

use std::fmt;
use std::time::Duration;

use super::settings::{ChatterSettings, load_chatter_settings};
use crate::cache::DEFAULT_RESPONSE_CACHE_CAPACITY;
use crate::channels::TELEGRAM_DEFAULT_API_BASE;
use crate::history::DEFAULT_HISTORY_CAPACITY;

pub const ENV_API_ID: &str = "OMNI_CHATTER_API_ID";
pub const ENV_API_HASH: &str = "OMNI_CHATTER_API_HASH";
pub const ENV_BOT_TOKEN: &str = "OMNI_CHATTER_BOT_TOKEN";
pub const ENV_GROUP_ID: &str = "OMNI_CHATTER_GROUP_ID";
pub const ENV_LEGACY_URL: &str = "OMNI_CHATTER_LEGACY_URL";
pub const ENV_S2S_URL: &str = "OMNI_CHATTER_S2S_URL";
pub const ENV_OSS_ENDPOINT: &str = "OMNI_CHATTER_OSS_ENDPOINT";
pub const ENV_OSS_BUCKET: &str = "OMNI_CHATTER_OSS_BUCKET";
pub const ENV_OSS_REGION: &str = "OMNI_CHATTER_OSS_REGION";
pub const ENV_OSS_ACCESS_KEY_ID: &str = "OMNI_CHATTER_OSS_ACCESS_KEY_ID";
pub const ENV_OSS_ACCESS_KEY_SECRET: &str = "OMNI_CHATTER_OSS_ACCESS_KEY_SECRET";
pub const ENV_PROXY_SERVER: &str = "OMNI_CHATTER_PROXY_SERVER";
pub const ENV_PROXY_PORT: &str = "OMNI_CHATTER_PROXY_PORT";
pub const ENV_PROXY_SECRET: &str = "OMNI_CHATTER_PROXY_SECRET";

const ENV_CHANCE: &str = "OMNI_CHATTER_CHANCE";
const ENV_REPLY_CONTEXT_CHANCE: &str = "OMNI_CHATTER_REPLY_CONTEXT_CHANCE";
const ENV_HISTORY_CONTEXT_CHANCE: &str = "OMNI_CHATTER_HISTORY_CONTEXT_CHANCE";
const ENV_HISTORY_WINDOW: &str = "OMNI_CHATTER_HISTORY_WINDOW";
const ENV_HISTORY_CAPACITY: &str = "OMNI_CHATTER_HISTORY_CAPACITY";
const ENV_RESPONSE_CACHE_CAPACITY: &str = "OMNI_CHATTER_RESPONSE_CACHE_CAPACITY";
const ENV_MODEL_UPDATE_INTERVAL_SECS: &str = "OMNI_CHATTER_MODEL_UPDATE_INTERVAL_SECS";
const ENV_HISTORY_UPLOAD_INTERVAL_SECS: &str = "OMNI_CHATTER_HISTORY_UPLOAD_INTERVAL_SECS";
const ENV_HISTORY_UPLOAD_PREFIX: &str = "OMNI_CHATTER_HISTORY_UPLOAD_PREFIX";
const ENV_SHUTDOWN_GRACE_SECS: &str = "OMNI_CHATTER_SHUTDOWN_GRACE_SECS";
const ENV_TELEGRAM_API_BASE: &str = "OMNI_CHATTER_TELEGRAM_API_BASE";
const ENV_INBOUND_QUEUE_CAPACITY: &str = "OMNI_CHATTER_INBOUND_QUEUE_CAPACITY";

const DEFAULT_CHANCE: f64 = 0.1;
const DEFAULT_CONTEXT_CHANCE: f64 = 0.5;
const DEFAULT_HISTORY_WINDOW: usize = 5;
const DEFAULT_JOB_INTERVAL_SECS: u64 = 600;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
const DEFAULT_HISTORY_UPLOAD_PREFIX: &str = "history";
const DEFAULT_INBOUND_QUEUE_CAPACITY: usize = 100;

/// Fatal configuration problems; the process must not connect when one occurs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct TelegramCredentials {
    pub api_id: i64,
    pub api_hash: String,
    pub bot_token: String,
}

impl fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorEndpoints {
    pub legacy_url: String,
    pub seq2seq_url: String,
}

#[derive(Clone)]
pub struct ObjectStorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub key_prefix: String,
}

impl fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

/// Outbound proxy; only built when server, port and secret are all present.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub server: String,
    pub port: u16,
    pub secret: String,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementConfig {
    pub chance: f64,
    pub reply_context_chance: f64,
    pub history_context_chance: f64,
    pub history_window: usize,
    pub history_capacity: usize,
    pub response_cache_capacity: usize,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            chance: DEFAULT_CHANCE,
            reply_context_chance: DEFAULT_CONTEXT_CHANCE,
            history_context_chance: DEFAULT_CONTEXT_CHANCE,
            history_window: DEFAULT_HISTORY_WINDOW,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            response_cache_capacity: DEFAULT_RESPONSE_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    pub model_update_interval: Duration,
    pub history_upload_interval: Duration,
    pub shutdown_grace: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            model_update_interval: Duration::from_secs(DEFAULT_JOB_INTERVAL_SECS),
            history_upload_interval: Duration::from_secs(DEFAULT_JOB_INTERVAL_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramCredentials,
    pub telegram_api_base: String,
    pub inbound_queue_capacity: usize,
    pub group_id: String,
    pub predictor: PredictorEndpoints,
    pub storage: ObjectStorageConfig,
    pub proxy: Option<ProxyConfig>,
    pub engagement: EngagementConfig,
    pub jobs: JobsConfig,
}

impl BotConfig {
    /// Load from process environment (plus an optional `.env`) and settings files.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            tracing::warn!(error = %error, "failed to load .env file; continuing with process env");
        }
        let settings = load_chatter_settings();
        Self::from_lookup(|name| std::env::var(name).ok(), &settings)
    }

    pub fn from_lookup<F>(lookup: F, settings: &ChatterSettings) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_id_raw = required(&lookup, ENV_API_ID)?;
        let api_id = api_id_raw
            .parse::<i64>()
            .map_err(|error| ConfigError::Invalid {
                name: ENV_API_ID,
                reason: error.to_string(),
            })?;
        let telegram = TelegramCredentials {
            api_id,
            api_hash: required(&lookup, ENV_API_HASH)?,
            bot_token: required(&lookup, ENV_BOT_TOKEN)?,
        };
        let group_id = required(&lookup, ENV_GROUP_ID)?;
        let predictor = PredictorEndpoints {
            legacy_url: required(&lookup, ENV_LEGACY_URL)?,
            seq2seq_url: required(&lookup, ENV_S2S_URL)?,
        };

        let endpoint = required(&lookup, ENV_OSS_ENDPOINT)?;
        let region = match optional(&lookup, ENV_OSS_REGION) {
            Some(region) => region,
            None => region_from_endpoint(&endpoint).ok_or_else(|| ConfigError::Invalid {
                name: ENV_OSS_ENDPOINT,
                reason: format!("cannot derive region from `{endpoint}`; set {ENV_OSS_REGION}"),
            })?,
        };
        let storage = ObjectStorageConfig {
            endpoint,
            bucket: required(&lookup, ENV_OSS_BUCKET)?,
            region,
            access_key_id: required(&lookup, ENV_OSS_ACCESS_KEY_ID)?,
            access_key_secret: required(&lookup, ENV_OSS_ACCESS_KEY_SECRET)?,
            key_prefix: optional(&lookup, ENV_HISTORY_UPLOAD_PREFIX)
                .or_else(|| settings.jobs.history_upload_prefix.clone())
                .unwrap_or_else(|| DEFAULT_HISTORY_UPLOAD_PREFIX.to_string()),
        };

        let proxy = resolve_proxy(&lookup)?;

        let defaults = EngagementConfig::default();
        let engagement_settings = &settings.engagement;
        let engagement = EngagementConfig {
            chance: resolve_probability(
                &lookup,
                ENV_CHANCE,
                engagement_settings.chance,
                defaults.chance,
            ),
            reply_context_chance: resolve_probability(
                &lookup,
                ENV_REPLY_CONTEXT_CHANCE,
                engagement_settings.reply_context_chance,
                defaults.reply_context_chance,
            ),
            history_context_chance: resolve_probability(
                &lookup,
                ENV_HISTORY_CONTEXT_CHANCE,
                engagement_settings.history_context_chance,
                defaults.history_context_chance,
            ),
            history_window: resolve_usize(
                &lookup,
                ENV_HISTORY_WINDOW,
                engagement_settings.history_window,
                defaults.history_window,
            ),
            history_capacity: resolve_usize(
                &lookup,
                ENV_HISTORY_CAPACITY,
                engagement_settings.history_capacity,
                defaults.history_capacity,
            ),
            response_cache_capacity: resolve_usize(
                &lookup,
                ENV_RESPONSE_CACHE_CAPACITY,
                engagement_settings.response_cache_capacity,
                defaults.response_cache_capacity,
            ),
        };

        let jobs = JobsConfig {
            model_update_interval: Duration::from_secs(resolve_u64(
                &lookup,
                ENV_MODEL_UPDATE_INTERVAL_SECS,
                settings.jobs.model_update_interval_secs,
                DEFAULT_JOB_INTERVAL_SECS,
            )),
            history_upload_interval: Duration::from_secs(resolve_u64(
                &lookup,
                ENV_HISTORY_UPLOAD_INTERVAL_SECS,
                settings.jobs.history_upload_interval_secs,
                DEFAULT_JOB_INTERVAL_SECS,
            )),
            shutdown_grace: Duration::from_secs(resolve_u64(
                &lookup,
                ENV_SHUTDOWN_GRACE_SECS,
                settings.jobs.shutdown_grace_secs,
                DEFAULT_SHUTDOWN_GRACE_SECS,
            )),
        };

        Ok(Self {
            telegram,
            telegram_api_base: optional(&lookup, ENV_TELEGRAM_API_BASE)
                .or_else(|| settings.telegram.api_base.clone())
                .unwrap_or_else(|| TELEGRAM_DEFAULT_API_BASE.to_string()),
            inbound_queue_capacity: resolve_usize(
                &lookup,
                ENV_INBOUND_QUEUE_CAPACITY,
                settings.telegram.inbound_queue_capacity,
                DEFAULT_INBOUND_QUEUE_CAPACITY,
            ),
            group_id,
            predictor,
            storage,
            proxy,
            engagement,
            jobs,
        })
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn resolve_proxy<F>(lookup: &F) -> Result<Option<ProxyConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let server = optional(lookup, ENV_PROXY_SERVER);
    let port = optional(lookup, ENV_PROXY_PORT);
    let secret = optional(lookup, ENV_PROXY_SECRET);
    let (Some(server), Some(port), Some(secret)) = (server, port, secret) else {
        return Ok(None);
    };
    let port = port.parse::<u16>().map_err(|error| ConfigError::Invalid {
        name: ENV_PROXY_PORT,
        reason: error.to_string(),
    })?;
    if port == 0 {
        return Ok(None);
    }
    Ok(Some(ProxyConfig {
        server,
        port,
        secret,
    }))
}

/// `oss-cn-hangzhou.aliyuncs.com` → `cn-hangzhou` (scheme and `-internal` tolerated).
pub(crate) fn region_from_endpoint(endpoint: &str) -> Option<String> {
    let host = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let first_label = host.split('.').next()?;
    let region = first_label.strip_prefix("oss-")?;
    let region = region.strip_suffix("-internal").unwrap_or(region);
    (!region.is_empty()).then(|| region.to_string())
}

fn resolve_probability<F>(lookup: &F, name: &str, setting_value: Option<f64>, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let valid = |value: f64| (0.0..=1.0).contains(&value);
    if let Some(raw) = lookup(name) {
        match raw.trim().parse::<f64>() {
            Ok(value) if valid(value) => return value,
            _ => tracing::warn!(
                env_var = %name,
                value = %raw,
                "invalid probability env value; using settings/default"
            ),
        }
    }
    match setting_value {
        Some(value) if valid(value) => value,
        Some(value) => {
            tracing::warn!(
                setting = %name,
                value,
                default,
                "probability settings value outside [0, 1]; using default"
            );
            default
        }
        None => default,
    }
}

fn resolve_usize<F>(lookup: &F, name: &str, setting_value: Option<usize>, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => return value,
            _ => tracing::warn!(
                env_var = %name,
                value = %raw,
                "invalid config env value; using settings/default"
            ),
        }
    }
    match setting_value {
        Some(value) if value > 0 => value,
        Some(value) => {
            tracing::warn!(
                setting = %name,
                value,
                default,
                "invalid config settings value; using default"
            );
            default
        }
        None => default,
    }
}

fn resolve_u64<F>(lookup: &F, name: &str, setting_value: Option<u64>, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => return value,
            _ => tracing::warn!(
                env_var = %name,
                value = %raw,
                "invalid config env value; using settings/default"
            ),
        }
    }
    match setting_value {
        Some(value) if value > 0 => value,
        Some(value) => {
            tracing::warn!(
                setting = %name,
                value,
                default,
                "invalid config settings value; using default"
            );
            default
        }
        None => default,
    }
}
