use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;

use super::Uploader;
use super::signing::{OssRequestSigner, uri_encode};
use crate::config::ObjectStorageConfig;

const UPLOAD_CONTENT_TYPE: &str = "application/json";
const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Uploads history snapshots as `<prefix>/<UTC timestamp>.json` objects.
pub struct OssUploader {
    client: reqwest::Client,
    signer: OssRequestSigner,
    bucket: String,
    key_prefix: String,
    base_url: String,
}

impl OssUploader {
    pub fn new(config: &ObjectStorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()
            .context("failed to build object storage HTTP client")?;
        let endpoint = config.endpoint.trim().trim_end_matches('/');
        let (scheme, host) = match endpoint.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => ("https", endpoint),
        };
        Ok(Self {
            client,
            signer: OssRequestSigner::new(
                config.access_key_id.clone(),
                config.access_key_secret.clone(),
                config.region.clone(),
            ),
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.trim_matches('/').to_string(),
            base_url: format!("{scheme}://{}.{host}", config.bucket),
        })
    }

    /// Send requests to `base_url` instead of the virtual-hosted bucket address.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn object_key(&self, now: chrono::DateTime<Utc>) -> String {
        let name = now.format("%Y%m%dT%H%M%S%.3fZ");
        if self.key_prefix.is_empty() {
            format!("{name}.json")
        } else {
            format!("{}/{name}.json", self.key_prefix)
        }
    }
}

#[async_trait]
impl Uploader for OssUploader {
    async fn upload(&self, history: String) -> Result<String> {
        let now = Utc::now();
        let object_key = self.object_key(now);
        let headers = self
            .signer
            .sign("PUT", &self.bucket, &object_key, UPLOAD_CONTENT_TYPE, now);
        let url = format!("{}/{}", self.base_url, uri_encode(&object_key, false));
        let bytes = history.len();

        let response = self
            .client
            .put(&url)
            .header("Authorization", headers.authorization)
            .header("Content-Type", headers.content_type)
            .header("x-oss-date", headers.x_oss_date)
            .header("x-oss-content-sha256", headers.x_oss_content_sha256)
            .body(history)
            .send()
            .await
            .with_context(|| format!("object storage unreachable at {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("object storage rejected upload of {object_key} ({status}): {body}");
        }
        tracing::debug!(object_key = %object_key, bytes, "history snapshot uploaded");
        Ok(object_key)
    }
}
