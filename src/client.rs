//! Typed client for the HTTP API
//!
//! Job completion is observed by polling: [`ArcanumClient::watch_transcription`]
//! and [`watch_transformation`](ArcanumClient::watch_transformation) return a
//! [`JobSubscription`] that delivers status snapshots over a channel, stops
//! itself at the first terminal status, and stops polling immediately when
//! dropped or unsubscribed.

use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::constants::POLL_INTERVAL_MS;
use crate::jobs::{JobStatus, TranscriptionJob, TransformationJob};
use crate::ledger::BalanceView;
use crate::notifications::Notification;
use crate::serve::TranscribeResponse;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server rejected the request ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

/// A job type the client can poll to a terminal state
pub trait PollableJob: DeserializeOwned + Send + 'static {
    fn status(&self) -> JobStatus;
}

impl PollableJob for TranscriptionJob {
    fn status(&self) -> JobStatus {
        self.status
    }
}

impl PollableJob for TransformationJob {
    fn status(&self) -> JobStatus {
        self.status
    }
}

/// A cancellable polling subscription for one job
///
/// Polls at a fixed interval while the status is non-terminal, then closes
/// the channel. Dropping the subscription aborts the poll task, so no poll
/// outlives its consumer.
pub struct JobSubscription<T> {
    rx: mpsc::Receiver<T>,
    handle: JoinHandle<()>,
}

impl<T> JobSubscription<T> {
    /// Next status snapshot; `None` once the job reached a terminal state
    /// or the subscription was cancelled
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop polling now
    pub fn unsubscribe(&mut self) {
        self.handle.abort();
        self.rx.close();
    }
}

impl<T> Drop for JobSubscription<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct ArcanumClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
    poll_interval: Duration,
}

impl ArcanumClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http: reqwest::Client::new(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }

    /// Override the fixed poll interval (tests use a tighter one)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()));
        }

        match response.json::<WireError>().await {
            Ok(wire) => Err(ClientError::Api {
                code: wire.code,
                message: wire.message,
            }),
            Err(_) => Err(ClientError::Api {
                code: format!("HTTP_{}", status.as_u16()),
                message: "unrecognized error response".to_string(),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Self::decode(response).await
    }

    /// Submit an asset for transcription
    pub async fn submit_transcription(
        &self,
        asset_id: &str,
        language: Option<&str>,
    ) -> Result<TranscribeResponse, ClientError> {
        let mut body = serde_json::json!({ "assetId": asset_id });
        if let Some(language) = language {
            body["language"] = serde_json::Value::String(language.to_string());
        }
        self.post_json("/functions/transcribe_audio", &body).await
    }

    /// Submit a text transformation
    pub async fn submit_transformation(
        &self,
        input_text: &str,
        kind: &str,
        length: &str,
        tone: &str,
    ) -> Result<TransformationJob, ClientError> {
        let body = serde_json::json!({
            "inputText": input_text,
            "kind": kind,
            "length": length,
            "tone": tone,
        });
        self.post_json("/api/transformations", &body).await
    }

    pub async fn transcription(&self, id: &str) -> Result<TranscriptionJob, ClientError> {
        self.get_json(&format!("/api/transcriptions/{}", id)).await
    }

    pub async fn transformation(&self, id: &str) -> Result<TransformationJob, ClientError> {
        self.get_json(&format!("/api/transformations/{}", id)).await
    }

    pub async fn balance(&self) -> Result<BalanceView, ClientError> {
        self.get_json("/api/dracmas").await
    }

    /// The caller's notifications; a read failure degrades to an empty list
    /// so a feed widget never takes the UI down with it
    pub async fn notifications_or_empty(&self, unread_only: bool) -> Vec<Notification> {
        let path = if unread_only {
            "/api/notifications?unread=true"
        } else {
            "/api/notifications"
        };
        match self.get_json(path).await {
            Ok(list) => list,
            Err(e) => {
                warn!("Failed to load notifications, showing none: {}", e);
                Vec::new()
            }
        }
    }

    /// Watch a transcription until it completes or fails
    pub fn watch_transcription(&self, id: &str) -> JobSubscription<TranscriptionJob> {
        self.watch(format!("/api/transcriptions/{}", id))
    }

    /// Watch a transformation until it completes or fails
    pub fn watch_transformation(&self, id: &str) -> JobSubscription<TransformationJob> {
        self.watch(format!("/api/transformations/{}", id))
    }

    fn watch<T: PollableJob>(&self, path: String) -> JobSubscription<T> {
        let client = self.clone();
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            loop {
                match client.get_json::<T>(&path).await {
                    Ok(job) => {
                        let terminal = job.status().is_terminal();
                        if tx.send(job).await.is_err() {
                            // Consumer is gone; polling must stop with it
                            break;
                        }
                        if terminal {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Polling {} failed: {}", path, e);
                        break;
                    }
                }
                tokio::time::sleep(client.poll_interval).await;
            }
        });

        JobSubscription { rx, handle }
    }
}
