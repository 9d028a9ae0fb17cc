use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::upload::Uploader;

/// Keeps uploaded payloads in memory; can be switched to fail.
#[derive(Default)]
pub struct RecordingUploader {
    uploads: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, history: String) -> anyhow::Result<String> {
        if self.fail.load(Ordering::Acquire) {
            anyhow::bail!("scripted upload failure");
        }
        let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
        uploads.push(history);
        Ok(format!("memory/{}.json", uploads.len()))
    }
}
