use std::time::Duration;

use anyhow::Context;

use super::constants::{TELEGRAM_HTTP_CONNECT_TIMEOUT_SECS, TELEGRAM_HTTP_REQUEST_TIMEOUT_SECS};
use crate::config::ProxyConfig;

pub(super) fn build_telegram_http_client(
    proxy: Option<&ProxyConfig>,
) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(TELEGRAM_HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(TELEGRAM_HTTP_REQUEST_TIMEOUT_SECS));
    if let Some(proxy) = proxy {
        let url = format!("http://{}:{}", proxy.server, proxy.port);
        let proxy_rule = reqwest::Proxy::all(&url)
            .with_context(|| format!("invalid proxy address {url}"))?
            .basic_auth("omni-chatter", &proxy.secret);
        tracing::info!(server = %proxy.server, port = proxy.port, "telegram transport using proxy");
        builder = builder.proxy(proxy_rule);
    }
    builder
        .build()
        .context("failed to build Telegram HTTP client")
}
