//! Outbound calls to the whisper/LLM worker
//!
//! Dispatch is fire-and-forget from the submission path: the job row is the
//! durable intent, so a worker that cannot be reached only costs latency
//! until the stale sweep re-dispatches.

use log::{info, warn};
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::constants::{WORKER_BACKOFF_BASE_MS, WORKER_MAX_ATTEMPTS};
use crate::error::ApiError;
use crate::jobs;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkerJobPayload {
    #[serde(rename_all = "camelCase")]
    Transcription {
        transcription_id: String,
        job_id: String,
        storage_path: String,
        language: String,
    },
    #[serde(rename_all = "camelCase")]
    Transformation {
        transformation_id: String,
        prompt: String,
        input_text: String,
    },
}

impl WorkerJobPayload {
    fn label(&self) -> String {
        match self {
            WorkerJobPayload::Transcription {
                transcription_id, ..
            } => format!("transcription {}", transcription_id),
            WorkerJobPayload::Transformation {
                transformation_id, ..
            } => format!("transformation {}", transformation_id),
        }
    }
}

#[derive(Clone)]
pub struct WorkerClient {
    base_url: String,
    http: reqwest::Client,
    max_attempts: u32,
}

impl WorkerClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            max_attempts: WORKER_MAX_ATTEMPTS,
        })
    }

    /// Hand one job to the worker, retrying with exponential backoff
    pub async fn dispatch(&self, payload: &WorkerJobPayload) -> Result<(), String> {
        let url = format!("{}/jobs", self.base_url);
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.http.post(&url).json(payload).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    last_error = format!("worker returned HTTP {}", response.status());
                }
                Err(e) => {
                    last_error = format!("worker request failed: {}", e);
                }
            }

            if attempt < self.max_attempts {
                let backoff_ms = WORKER_BACKOFF_BASE_MS * 2u64.pow(attempt - 1)
                    + rand::thread_rng().gen_range(0..100);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error)
    }

    /// Forward an arbitrary body to the worker's whisper endpoint and relay
    /// its JSON response (single attempt: the caller is waiting)
    pub async fn forward_whisper(
        &self,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/whisper", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Business(format!("worker unavailable: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Business(format!(
                "worker returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Business(format!("worker returned invalid JSON: {}", e)))
    }
}

/// Dispatch in the background, stamping the job first so the stale sweep
/// waits a full threshold before re-firing. Dispatch failure is logged and
/// must never surface to the submitter.
pub fn spawn_dispatch(pool: SqlitePool, worker: WorkerClient, payload: WorkerJobPayload) {
    tokio::spawn(async move {
        let stamp = match &payload {
            WorkerJobPayload::Transcription {
                transcription_id, ..
            } => jobs::mark_transcription_dispatched(&pool, transcription_id).await,
            WorkerJobPayload::Transformation {
                transformation_id, ..
            } => jobs::mark_transformation_dispatched(&pool, transformation_id).await,
        };
        if let Err(e) = stamp {
            warn!("Failed to stamp dispatch for {}: {}", payload.label(), e);
        }

        match worker.dispatch(&payload).await {
            Ok(()) => info!("Dispatched {}", payload.label()),
            Err(e) => warn!("Dispatch of {} failed, leaving job queued: {}", payload.label(), e),
        }
    });
}
