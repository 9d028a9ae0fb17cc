use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::client::build_telegram_http_client;
use super::error::TelegramApiError;
use super::parsing::parse_identity;
use crate::channels::traits::{ChatTransport, GroupHandle, Identity, InboundMessage, MessageId};
use crate::config::ProxyConfig;

/// Bot API adapter implementing [`ChatTransport`].
pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramTransport {
    pub fn new(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
        proxy: Option<&ProxyConfig>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_telegram_http_client(proxy)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        })
    }

    pub(super) fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Call a Bot API method and return its `result` field.
    pub(super) async fn call(&self, method: &str, body: &Value) -> Result<Value, TelegramApiError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(TelegramApiError::from_reqwest)?;
        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(TelegramApiError::from_reqwest)?;
        if !status.is_success() {
            return Err(TelegramApiError::from_body(status, &body_text));
        }
        let data: Value = serde_json::from_str(&body_text).map_err(|error| TelegramApiError {
            status: Some(status),
            error_code: None,
            retry_after_secs: None,
            description: format!("failed to parse Telegram response: {error}"),
        })?;
        if !data.get("ok").and_then(Value::as_bool).unwrap_or(true) {
            return Err(TelegramApiError::from_body(status, &body_text));
        }
        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn send_message(&self, body: &Value) -> anyhow::Result<MessageId> {
        let result = self
            .call("sendMessage", body)
            .await
            .context("Telegram sendMessage failed")?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .context("Telegram sendMessage response missing message_id")
    }
}

/// Numeric ids are passed as numbers, `@channel` style names as strings.
fn chat_id_param(identifier: &str) -> Value {
    let trimmed = identifier.trim();
    trimmed
        .parse::<i64>()
        .map_or_else(|_| json!(trimmed), |id| json!(id))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn get_self(&self) -> anyhow::Result<Identity> {
        let result = self
            .call("getMe", &json!({}))
            .await
            .context("Telegram getMe failed")?;
        parse_identity(&result).context("Telegram getMe returned no user id")
    }

    async fn resolve_group(&self, identifier: &str) -> anyhow::Result<GroupHandle> {
        let result = self
            .call("getChat", &json!({ "chat_id": chat_id_param(identifier) }))
            .await
            .with_context(|| format!("Telegram getChat failed for {identifier}"))?;
        let chat_id = result
            .get("id")
            .and_then(Value::as_i64)
            .with_context(|| format!("Telegram getChat returned no id for {identifier}"))?;
        let title = result
            .get("title")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        Ok(GroupHandle { chat_id, title })
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        self.listen_updates(tx).await
    }

    async fn send(&self, target: &GroupHandle, text: &str) -> anyhow::Result<MessageId> {
        self.send_message(&json!({ "chat_id": target.chat_id, "text": text }))
            .await
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> anyhow::Result<MessageId> {
        self.send_message(&json!({
            "chat_id": message.chat_id,
            "text": text,
            "reply_parameters": {
                "message_id": message.id,
                "allow_sending_without_reply": true,
            },
        }))
        .await
    }

    async fn start_typing(&self, target: &GroupHandle) -> anyhow::Result<()> {
        self.call(
            "sendChatAction",
            &json!({ "chat_id": target.chat_id, "action": "typing" }),
        )
        .await
        .context("Telegram sendChatAction failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{TelegramTransport, chat_id_param};

    #[test]
    fn chat_id_param_keeps_numeric_ids_numeric() {
        assert_eq!(chat_id_param("-100123"), json!(-100_123));
        assert_eq!(chat_id_param(" @public_group "), json!("@public_group"));
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_the_bot_token() {
        let transport = TelegramTransport::new("123456:secret-token", "http://127.0.0.1:1", None)
            .expect("transport");

        let error = transport
            .call("getMe", &json!({}))
            .await
            .expect_err("nothing listens on port 1");

        let rendered = error.to_string();
        assert!(!rendered.is_empty());
        assert!(!rendered.contains("secret-token"), "{rendered}");
    }
}
