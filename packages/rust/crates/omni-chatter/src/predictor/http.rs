//! HTTP predictor over two generation backends (legacy and seq2seq).
//!
//! Backend contract:
//! - `POST <base>/predict` with `{"sentence": <string | [string]>}` → JSON object
//!   carrying the generated `text` plus backend-specific detail.
//! - `GET <base>/version` → `{"version": <string | number>}`.

use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

use super::types::{ModelKind, ModelUpdate, ModelUpdateReport, Prediction, Sentence};
use super::Predictor;
use crate::config::PredictorEndpoints;

const PREDICTOR_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Default)]
struct KnownVersions {
    legacy: Option<String>,
    seq2seq: Option<String>,
}

impl KnownVersions {
    fn slot(&mut self, kind: ModelKind) -> &mut Option<String> {
        match kind {
            ModelKind::Legacy => &mut self.legacy,
            ModelKind::Seq2Seq => &mut self.seq2seq,
        }
    }

    /// Record `current`; the first observation of a model is never an update.
    fn observe(&mut self, kind: ModelKind, current: String) -> ModelUpdate {
        let slot = self.slot(kind);
        let update = match slot.as_deref() {
            Some(previous) if previous != current => ModelUpdate::changed(previous, current.clone()),
            _ => ModelUpdate::unchanged(current.clone()),
        };
        *slot = Some(current);
        update
    }
}

pub struct HttpPredictor {
    client: RwLock<Option<reqwest::Client>>,
    legacy_url: String,
    seq2seq_url: String,
    known_versions: Mutex<KnownVersions>,
}

impl HttpPredictor {
    pub fn new(endpoints: &PredictorEndpoints) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(PREDICTOR_CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build predictor HTTP client")?;
        Ok(Self {
            client: RwLock::new(Some(client)),
            legacy_url: endpoints.legacy_url.trim_end_matches('/').to_string(),
            seq2seq_url: endpoints.seq2seq_url.trim_end_matches('/').to_string(),
            known_versions: Mutex::new(KnownVersions::default()),
        })
    }

    fn client(&self) -> Result<reqwest::Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| anyhow!("predictor is closed"))
    }

    fn base_url(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Legacy => &self.legacy_url,
            ModelKind::Seq2Seq => &self.seq2seq_url,
        }
    }

    async fn predict_with(
        &self,
        client: &reqwest::Client,
        kind: ModelKind,
        sentence: &Sentence,
    ) -> Result<Value> {
        let url = format!("{}/predict", self.base_url(kind));
        let response = client
            .post(&url)
            .json(&json!({ "sentence": sentence }))
            .send()
            .await
            .with_context(|| format!("{} backend unreachable at {url}", kind.as_str()))?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            bail!("{} backend error {status}: {body}", kind.as_str());
        }
        serde_json::from_str(&body)
            .with_context(|| format!("{} backend returned invalid JSON", kind.as_str()))
    }

    async fn fetch_version(&self, client: &reqwest::Client, kind: ModelKind) -> Result<String> {
        let url = format!("{}/version", self.base_url(kind));
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("{} backend unreachable at {url}", kind.as_str()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} version check failed {status}: {body}", kind.as_str());
        }
        let data: Value = response
            .json()
            .await
            .with_context(|| format!("{} version response is not JSON", kind.as_str()))?;
        match data.get("version") {
            Some(Value::String(version)) => Ok(version.clone()),
            Some(Value::Number(version)) => Ok(version.to_string()),
            _ => bail!("{} version response missing `version`", kind.as_str()),
        }
    }
}

fn generated_text(output: &Value) -> Option<String> {
    let text = match output {
        Value::String(text) => Some(text.as_str()),
        other => other.get("text").and_then(Value::as_str),
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn outcome_json(outcome: &Result<Value>) -> Value {
    match outcome {
        Ok(value) => value.clone(),
        Err(error) => json!({ "error": format!("{error:#}") }),
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, sentence: &Sentence) -> Result<Prediction> {
        let client = self.client()?;
        let (legacy, seq2seq) = tokio::join!(
            self.predict_with(&client, ModelKind::Legacy, sentence),
            self.predict_with(&client, ModelKind::Seq2Seq, sentence),
        );
        if let (Err(legacy_error), Err(seq2seq_error)) = (&legacy, &seq2seq) {
            bail!("all prediction backends failed: legacy: {legacy_error:#}; seq2seq: {seq2seq_error:#}");
        }

        let text = seq2seq
            .as_ref()
            .ok()
            .and_then(generated_text)
            .or_else(|| legacy.as_ref().ok().and_then(generated_text))
            .context("prediction backends returned no text")?;
        let raw = json!({
            "sentence": sentence,
            "legacy": outcome_json(&legacy),
            "seq2seq": outcome_json(&seq2seq),
        });
        Ok(Prediction { text, raw })
    }

    async fn update_model(&self) -> Result<ModelUpdateReport> {
        let client = self.client()?;
        let (legacy, seq2seq) = tokio::join!(
            self.fetch_version(&client, ModelKind::Legacy),
            self.fetch_version(&client, ModelKind::Seq2Seq),
        );
        let (legacy, seq2seq) = (legacy?, seq2seq?);
        let mut known = self
            .known_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(ModelUpdateReport {
            legacy: known.observe(ModelKind::Legacy, legacy),
            seq2seq: known.observe(ModelKind::Seq2Seq, seq2seq),
        })
    }

    async fn close(&self) {
        let previous = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::info!("predictor closed; backend connections released");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{KnownVersions, generated_text};
    use crate::predictor::{ModelKind, ModelUpdate};

    #[test]
    fn first_version_observation_is_not_an_update() {
        let mut known = KnownVersions::default();
        assert_eq!(
            known.observe(ModelKind::Legacy, "v1".to_string()),
            ModelUpdate::unchanged("v1")
        );
        assert_eq!(
            known.observe(ModelKind::Legacy, "v2".to_string()),
            ModelUpdate::changed("v1", "v2")
        );
        assert_eq!(
            known.observe(ModelKind::Legacy, "v2".to_string()),
            ModelUpdate::unchanged("v2")
        );
        assert_eq!(
            known.observe(ModelKind::Seq2Seq, "s1".to_string()),
            ModelUpdate::unchanged("s1")
        );
    }

    #[test]
    fn generated_text_accepts_object_or_bare_string() {
        assert_eq!(
            generated_text(&json!({"text": " hi "})).as_deref(),
            Some("hi")
        );
        assert_eq!(generated_text(&json!("yo")).as_deref(), Some("yo"));
        assert_eq!(generated_text(&json!({"text": ""})), None);
        assert_eq!(generated_text(&json!({"tokens": [1, 2]})), None);
    }
}
