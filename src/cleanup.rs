//! Maintenance sweeps
//!
//! The orphan sweep walks every storage bucket and deletes files no asset
//! row references; the stale sweep re-dispatches queued jobs whose worker
//! hand-off never happened or happened too long ago. Both tolerate partial
//! failure and report what they skipped.

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::assets;
use crate::brand_voice;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::jobs;
use crate::worker::{WorkerClient, WorkerJobPayload};

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupReport {
    pub timestamp: String,
    pub orphan_files_deleted: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetryReport {
    pub retried: u64,
    pub failures: Vec<String>,
}

/// Delete bucket files with no referencing asset row
///
/// Per-file failures are collected, not fatal; the sweep always runs to the
/// end of every bucket.
pub async fn cleanup_orphans(
    pool: &SqlitePool,
    config: &AppConfig,
) -> Result<CleanupReport, ApiError> {
    let referenced: HashSet<String> = assets::referenced_storage_paths(pool)
        .await?
        .into_iter()
        .collect();

    let mut deleted = 0u64;
    let mut errors = Vec::new();

    for bucket in &config.storage.buckets {
        let dir = config.bucket_dir(bucket);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                errors.push(format!("failed to read bucket '{}': {}", bucket, e));
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(format!("failed to list entry in '{}': {}", bucket, e));
                    continue;
                }
            };

            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let relative = format!("{}/{}", bucket, entry.file_name().to_string_lossy());
            if referenced.contains(&relative) {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    info!("Deleted orphan file {}", relative);
                    deleted += 1;
                }
                Err(e) => {
                    errors.push(format!("failed to delete '{}': {}", relative, e));
                }
            }
        }
    }

    Ok(CleanupReport {
        timestamp: Utc::now().to_rfc3339(),
        orphan_files_deleted: deleted,
        errors,
    })
}

/// Re-dispatch queued jobs the worker never picked up
pub async fn retry_stale_jobs(
    pool: &SqlitePool,
    config: &AppConfig,
    worker: &WorkerClient,
) -> Result<RetryReport, ApiError> {
    let mut retried = 0u64;
    let mut failures = Vec::new();

    for job in jobs::stale_transcriptions(pool, config.stale_after_secs).await? {
        let asset = match assets::get_owned(pool, &job.user_id, &job.asset_id).await {
            Ok(asset) => asset,
            Err(e) => {
                failures.push(format!("transcription {}: {}", job.id, e));
                continue;
            }
        };

        let payload = WorkerJobPayload::Transcription {
            transcription_id: job.id.clone(),
            job_id: job.job_id.clone(),
            storage_path: asset.storage_path,
            language: job.language.clone(),
        };

        jobs::mark_transcription_dispatched(pool, &job.id).await?;
        match worker.dispatch(&payload).await {
            Ok(()) => retried += 1,
            Err(e) => failures.push(format!("transcription {}: {}", job.id, e)),
        }
    }

    for job in jobs::stale_transformations(pool, config.stale_after_secs).await? {
        let voice = brand_voice::get(pool, &job.user_id).await?;
        let prompt = match job.prompt(voice.as_ref().map(|v| &v.profile)) {
            Ok(prompt) => prompt,
            Err(e) => {
                failures.push(format!("transformation {}: {}", job.id, e));
                continue;
            }
        };

        let payload = WorkerJobPayload::Transformation {
            transformation_id: job.id.clone(),
            prompt,
            input_text: job.input_text.clone(),
        };

        jobs::mark_transformation_dispatched(pool, &job.id).await?;
        match worker.dispatch(&payload).await {
            Ok(()) => retried += 1,
            Err(e) => failures.push(format!("transformation {}: {}", job.id, e)),
        }
    }

    if !failures.is_empty() {
        warn!("Stale sweep left {} jobs queued", failures.len());
    }

    Ok(RetryReport { retried, failures })
}
