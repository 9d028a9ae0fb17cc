use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::predictor::{ModelUpdate, ModelUpdateReport, Prediction, Predictor, Sentence};

/// Scripted predictor. Unscripted calls echo the input; unscripted update
/// checks report no change.
#[derive(Default)]
pub struct FakePredictor {
    predictions: Mutex<VecDeque<Result<Prediction, String>>>,
    updates: Mutex<VecDeque<Result<ModelUpdateReport, String>>>,
    calls: Mutex<Vec<Sentence>>,
    update_calls: AtomicUsize,
    closed: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_prediction(&self, text: impl Into<String>, raw: serde_json::Value) {
        self.predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(Prediction {
                text: text.into(),
                raw,
            }));
    }

    pub fn push_prediction_failure(&self, reason: impl Into<String>) {
        self.predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(reason.into()));
    }

    pub fn push_update(&self, report: ModelUpdateReport) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(report));
    }

    pub fn push_update_failure(&self, reason: impl Into<String>) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(reason.into()));
    }

    /// Delay every `predict` call (simulates a slow backend).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    pub fn calls(&self) -> Vec<Sentence> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Predictor for FakePredictor {
    async fn predict(&self, sentence: &Sentence) -> anyhow::Result<Prediction> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sentence.clone());
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(Ok(prediction)) => Ok(prediction),
            Some(Err(reason)) => anyhow::bail!(reason),
            None => {
                let text = match sentence {
                    Sentence::Single(text) => text.clone(),
                    Sentence::Sequence(texts) => texts.join(" / "),
                };
                Ok(Prediction {
                    text: format!("echo: {text}"),
                    raw: json!({ "sentence": sentence }),
                })
            }
        }
    }

    async fn update_model(&self) -> anyhow::Result<ModelUpdateReport> {
        self.update_calls.fetch_add(1, Ordering::AcqRel);
        let scripted = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(Ok(report)) => Ok(report),
            Some(Err(reason)) => anyhow::bail!(reason),
            None => Ok(ModelUpdateReport {
                legacy: ModelUpdate::unchanged("v0"),
                seq2seq: ModelUpdate::unchanged("v0"),
            }),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
