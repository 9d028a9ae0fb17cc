use std::time::Duration;

use reqwest::StatusCode;

use super::constants::TELEGRAM_POLL_MAX_RATE_LIMIT_RETRY_SECS;

#[derive(Debug)]
pub(super) struct TelegramApiError {
    pub(super) status: Option<StatusCode>,
    pub(super) error_code: Option<i64>,
    pub(super) retry_after_secs: Option<u64>,
    pub(super) description: String,
}

impl TelegramApiError {
    /// Transport failure. The request URL carries the bot token, so it is
    /// stripped before the error is rendered.
    pub(super) fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        let description = if err.is_timeout() {
            format!("timed out: {err}")
        } else {
            err.to_string()
        };
        Self {
            status: None,
            error_code: None,
            retry_after_secs: None,
            description,
        }
    }

    pub(super) fn from_body(status: StatusCode, body_text: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body_text).ok();
        let description = parsed
            .as_ref()
            .and_then(|data| data.get("description"))
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(body_text)
            .to_string();
        Self {
            status: Some(status),
            error_code: parsed
                .as_ref()
                .and_then(|data| data.get("error_code"))
                .and_then(serde_json::Value::as_i64),
            retry_after_secs: parsed
                .as_ref()
                .and_then(|data| data.get("parameters"))
                .and_then(|parameters| parameters.get("retry_after"))
                .and_then(serde_json::Value::as_u64),
            description,
        }
    }

    /// Credentials rejected; retrying cannot help.
    pub(super) fn is_unauthorized(&self) -> bool {
        matches!(
            self.status,
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        ) || matches!(self.error_code, Some(401 | 403))
    }

    pub(super) fn is_conflict(&self) -> bool {
        self.status == Some(StatusCode::CONFLICT) || self.error_code == Some(409)
    }

    pub(super) fn is_rate_limited(&self) -> bool {
        self.status == Some(StatusCode::TOO_MANY_REQUESTS) || self.error_code == Some(429)
    }

    pub(super) fn rate_limit_delay(&self, default_secs: u64) -> Duration {
        Duration::from_secs(
            self.retry_after_secs
                .unwrap_or(default_secs)
                .clamp(1, TELEGRAM_POLL_MAX_RATE_LIMIT_RETRY_SECS),
        )
    }
}

impl std::fmt::Display for TelegramApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.error_code) {
            (Some(status), Some(code)) => write!(
                f,
                "status={status}, error_code={code}, description={}",
                self.description
            ),
            (Some(status), None) => write!(f, "status={status}, description={}", self.description),
            (None, Some(code)) => write!(f, "error_code={code}, description={}", self.description),
            (None, None) => write!(f, "{}", self.description),
        }
    }
}

impl std::error::Error for TelegramApiError {}
