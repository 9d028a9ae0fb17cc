//! Tunable settings loader for omni-chatter.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/omni-chatter.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-chatter/settings.yaml`
//!
//! Merge precedence is user over system. Credentials never live here; they
//! come from the environment (see `BotConfig`).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/omni-chatter.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-chatter/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatterSettings {
    #[serde(default)]
    pub engagement: EngagementSettings,
    #[serde(default)]
    pub jobs: JobSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngagementSettings {
    pub chance: Option<f64>,
    pub reply_context_chance: Option<f64>,
    pub history_context_chance: Option<f64>,
    pub history_window: Option<usize>,
    pub history_capacity: Option<usize>,
    pub response_cache_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSettings {
    pub model_update_interval_secs: Option<u64>,
    pub history_upload_interval_secs: Option<u64>,
    pub history_upload_prefix: Option<String>,
    pub shutdown_grace_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramSettings {
    pub api_base: Option<String>,
    pub inbound_queue_capacity: Option<usize>,
}

impl ChatterSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            engagement: self.engagement.merge(overlay.engagement),
            jobs: self.jobs.merge(overlay.jobs),
            telegram: self.telegram.merge(overlay.telegram),
        }
    }
}

impl EngagementSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            chance: overlay.chance.or(self.chance),
            reply_context_chance: overlay.reply_context_chance.or(self.reply_context_chance),
            history_context_chance: overlay
                .history_context_chance
                .or(self.history_context_chance),
            history_window: overlay.history_window.or(self.history_window),
            history_capacity: overlay.history_capacity.or(self.history_capacity),
            response_cache_capacity: overlay
                .response_cache_capacity
                .or(self.response_cache_capacity),
        }
    }
}

impl JobSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            model_update_interval_secs: overlay
                .model_update_interval_secs
                .or(self.model_update_interval_secs),
            history_upload_interval_secs: overlay
                .history_upload_interval_secs
                .or(self.history_upload_interval_secs),
            history_upload_prefix: overlay.history_upload_prefix.or(self.history_upload_prefix),
            shutdown_grace_secs: overlay.shutdown_grace_secs.or(self.shutdown_grace_secs),
        }
    }
}

impl TelegramSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            api_base: overlay.api_base.or(self.api_base),
            inbound_queue_capacity: overlay
                .inbound_queue_capacity
                .or(self.inbound_queue_capacity),
        }
    }
}

pub fn load_chatter_settings() -> ChatterSettings {
    let (system_path, user_path) = chatter_settings_paths();
    load_chatter_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn chatter_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_chatter_settings_from_paths(system: &Path, user: &Path) -> ChatterSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> ChatterSettings {
    if !path.exists() {
        return ChatterSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return ChatterSettings::default();
        }
    };
    match serde_yaml::from_str::<ChatterSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            ChatterSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
