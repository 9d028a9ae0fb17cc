#![allow(missing_docs)]

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use omni_chatter::{
    BotConfig, ChatterSettings, ConfigError, DEFAULT_HISTORY_CAPACITY, ENV_API_ID, ENV_BOT_TOKEN,
    ENV_OSS_ENDPOINT, ENV_OSS_REGION, ENV_PROXY_PORT, ENV_PROXY_SECRET, ENV_PROXY_SERVER,
    TELEGRAM_DEFAULT_API_BASE, load_chatter_settings_from_paths,
};

fn base_env() -> HashMap<String, String> {
    [
        ("OMNI_CHATTER_API_ID", "12345"),
        ("OMNI_CHATTER_API_HASH", "hash"),
        ("OMNI_CHATTER_BOT_TOKEN", "123:abc"),
        ("OMNI_CHATTER_GROUP_ID", "-100500"),
        ("OMNI_CHATTER_LEGACY_URL", "http://legacy.local/"),
        ("OMNI_CHATTER_S2S_URL", "http://s2s.local"),
        ("OMNI_CHATTER_OSS_ENDPOINT", "https://oss-cn-hangzhou.aliyuncs.com"),
        ("OMNI_CHATTER_OSS_BUCKET", "chat-logs"),
        ("OMNI_CHATTER_OSS_ACCESS_KEY_ID", "AKID"),
        ("OMNI_CHATTER_OSS_ACCESS_KEY_SECRET", "secret"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

fn load(env: &HashMap<String, String>, settings: &ChatterSettings) -> Result<BotConfig, ConfigError> {
    BotConfig::from_lookup(|name| env.get(name).cloned(), settings)
}

#[test]
fn complete_environment_resolves_with_defaults() -> Result<()> {
    let config = load(&base_env(), &ChatterSettings::default())?;

    assert_eq!(config.telegram.api_id, 12345);
    assert_eq!(config.group_id, "-100500");
    assert_eq!(config.predictor.legacy_url, "http://legacy.local/");
    assert_eq!(config.storage.region, "cn-hangzhou");
    assert_eq!(config.storage.key_prefix, "history");
    assert_eq!(config.telegram_api_base, TELEGRAM_DEFAULT_API_BASE);
    assert!(config.proxy.is_none());
    assert!((config.engagement.chance - 0.1).abs() < f64::EPSILON);
    assert_eq!(config.engagement.response_cache_capacity, 128);
    assert_eq!(config.engagement.history_window, 5);
    assert_eq!(config.engagement.history_capacity, DEFAULT_HISTORY_CAPACITY);
    assert_eq!(config.jobs.model_update_interval, Duration::from_secs(600));
    assert_eq!(config.jobs.history_upload_interval, Duration::from_secs(600));

    let debug = format!("{config:?}");
    assert!(!debug.contains("123:abc"), "bot token must be redacted");
    assert!(!debug.contains("\"secret\""), "storage secret must be redacted");
    Ok(())
}

#[test]
fn missing_required_variable_is_fatal() {
    let mut env = base_env();
    env.remove(ENV_BOT_TOKEN);
    assert_eq!(
        load(&env, &ChatterSettings::default()).err(),
        Some(ConfigError::Missing(ENV_BOT_TOKEN))
    );

    let mut blank = base_env();
    blank.insert(ENV_BOT_TOKEN.to_string(), "   ".to_string());
    assert_eq!(
        load(&blank, &ChatterSettings::default()).err(),
        Some(ConfigError::Missing(ENV_BOT_TOKEN))
    );
}

#[test]
fn non_numeric_api_id_is_invalid() {
    let mut env = base_env();
    env.insert(ENV_API_ID.to_string(), "twelve".to_string());
    assert!(matches!(
        load(&env, &ChatterSettings::default()),
        Err(ConfigError::Invalid { name, .. }) if name == ENV_API_ID
    ));
}

#[test]
fn region_must_be_derivable_or_explicit() -> Result<()> {
    let mut env = base_env();
    env.insert(ENV_OSS_ENDPOINT.to_string(), "https://storage.example.com".to_string());
    assert!(matches!(
        load(&env, &ChatterSettings::default()),
        Err(ConfigError::Invalid { name, .. }) if name == ENV_OSS_ENDPOINT
    ));

    env.insert(ENV_OSS_REGION.to_string(), "eu-central-1".to_string());
    assert_eq!(load(&env, &ChatterSettings::default())?.storage.region, "eu-central-1");
    Ok(())
}

#[test]
fn proxy_requires_all_three_parameters() -> Result<()> {
    let mut env = base_env();
    env.insert(ENV_PROXY_SERVER.to_string(), "proxy.local".to_string());
    env.insert(ENV_PROXY_PORT.to_string(), "443".to_string());
    assert!(load(&env, &ChatterSettings::default())?.proxy.is_none());

    env.insert(ENV_PROXY_SECRET.to_string(), "s3cret".to_string());
    let proxy = load(&env, &ChatterSettings::default())?
        .proxy
        .ok_or_else(|| anyhow::anyhow!("proxy expected"))?;
    assert_eq!(proxy.server, "proxy.local");
    assert_eq!(proxy.port, 443);
    assert!(!format!("{proxy:?}").contains("s3cret"));

    env.insert(ENV_PROXY_PORT.to_string(), "not-a-port".to_string());
    assert!(matches!(
        load(&env, &ChatterSettings::default()),
        Err(ConfigError::Invalid { name, .. }) if name == ENV_PROXY_PORT
    ));
    Ok(())
}

#[test]
fn settings_files_merge_and_env_overrides_them() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let system = dir.path().join("omni-chatter.yaml");
    let user = dir.path().join("settings.yaml");
    std::fs::write(
        &system,
        "engagement:\n  chance: 0.2\n  history_window: 8\njobs:\n  model_update_interval_secs: 60\n  history_upload_prefix: chats\n",
    )?;
    std::fs::write(
        &user,
        "engagement:\n  chance: 0.3\ntelegram:\n  api_base: http://127.0.0.1:9000\n",
    )?;

    let settings = load_chatter_settings_from_paths(&system, &user);
    let config = load(&base_env(), &settings)?;
    assert!((config.engagement.chance - 0.3).abs() < f64::EPSILON);
    assert_eq!(config.engagement.history_window, 8);
    assert_eq!(config.jobs.model_update_interval, Duration::from_secs(60));
    assert_eq!(config.storage.key_prefix, "chats");
    assert_eq!(config.telegram_api_base, "http://127.0.0.1:9000");

    let mut env = base_env();
    env.insert("OMNI_CHATTER_CHANCE".to_string(), "0.75".to_string());
    let config = load(&env, &settings)?;
    assert!((config.engagement.chance - 0.75).abs() < f64::EPSILON);

    env.insert("OMNI_CHATTER_CHANCE".to_string(), "7".to_string());
    let config = load(&env, &settings)?;
    assert!(
        (config.engagement.chance - 0.3).abs() < f64::EPSILON,
        "out-of-range env value falls back to settings"
    );
    Ok(())
}

#[test]
fn malformed_settings_file_is_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let system = dir.path().join("omni-chatter.yaml");
    std::fs::write(&system, "engagement: [not, a, map")?;
    let settings = load_chatter_settings_from_paths(&system, &dir.path().join("missing.yaml"));
    assert!(settings.engagement.chance.is_none());
    Ok(())
}
