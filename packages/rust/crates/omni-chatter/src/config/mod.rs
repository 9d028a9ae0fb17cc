//! Config namespace: environment-backed bot config and settings YAML.

mod bot;
mod settings;

pub use bot::{
    BotConfig, ConfigError, ENV_API_HASH, ENV_API_ID, ENV_BOT_TOKEN, ENV_GROUP_ID,
    ENV_LEGACY_URL, ENV_OSS_ACCESS_KEY_ID, ENV_OSS_ACCESS_KEY_SECRET, ENV_OSS_BUCKET,
    ENV_OSS_ENDPOINT, ENV_OSS_REGION, ENV_PROXY_PORT, ENV_PROXY_SECRET, ENV_PROXY_SERVER,
    ENV_S2S_URL, EngagementConfig, JobsConfig, ObjectStorageConfig, PredictorEndpoints,
    ProxyConfig, TelegramCredentials,
};
pub use settings::{
    ChatterSettings, EngagementSettings, JobSettings, TelegramSettings, chatter_settings_paths,
    load_chatter_settings, load_chatter_settings_from_paths, set_config_home_override,
};
