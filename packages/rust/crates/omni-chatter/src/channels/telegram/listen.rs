use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::TelegramTransport;
use super::constants::{
    TELEGRAM_POLL_CONFLICT_RETRY_SECS, TELEGRAM_POLL_DEFAULT_RATE_LIMIT_RETRY_SECS,
    TELEGRAM_POLL_RETRY_SECS, TELEGRAM_POLL_TIMEOUT_SECS,
};
use super::parsing::parse_update;
use crate::channels::traits::InboundMessage;

impl TelegramTransport {
    pub(super) async fn listen_updates(
        &self,
        tx: mpsc::Sender<InboundMessage>,
    ) -> anyhow::Result<()> {
        let mut offset: i64 = 0;
        tracing::info!("Telegram transport listening for messages...");
        loop {
            let body = json!({
                "offset": offset,
                "timeout": TELEGRAM_POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            });
            let updates = match self.call("getUpdates", &body).await {
                Ok(result) => result,
                Err(error) if error.is_unauthorized() => {
                    anyhow::bail!("Telegram getUpdates rejected credentials: {error}");
                }
                Err(error) if error.is_conflict() => {
                    tracing::warn!(
                        error = %error,
                        "Telegram polling conflict; ensure only one process is using this bot token"
                    );
                    tokio::time::sleep(Duration::from_secs(TELEGRAM_POLL_CONFLICT_RETRY_SECS))
                        .await;
                    continue;
                }
                Err(error) if error.is_rate_limited() => {
                    let delay = error.rate_limit_delay(TELEGRAM_POLL_DEFAULT_RATE_LIMIT_RETRY_SECS);
                    tracing::warn!(
                        retry_after_secs = delay.as_secs(),
                        error = %error,
                        "Telegram getUpdates rate limited"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Telegram poll error");
                    tokio::time::sleep(Duration::from_secs(TELEGRAM_POLL_RETRY_SECS)).await;
                    continue;
                }
            };

            let Some(results) = updates.as_array() else {
                continue;
            };
            for update in results {
                if let Some(update_id) = update.get("update_id").and_then(Value::as_i64) {
                    offset = update_id + 1;
                }
                let Some(message) = parse_update(update) else {
                    continue;
                };
                if tx.send(message).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}
