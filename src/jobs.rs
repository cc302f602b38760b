//! Transcription and transformation job lifecycle
//!
//! Jobs are the durable intent of the dispatch pipeline: submission writes
//! a `queued` row and returns immediately; the worker reports progress
//! through status updates that must move forward only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::assets::{self, AssetStatus};
use crate::brand_voice::BrandVoiceProfile;
use crate::error::ApiError;
use crate::ledger;
use crate::notifications;
use crate::prompt::{self, OutputLength, Tone, TransformationKind};
use crate::queries::jobs as queries;
use crate::validate::{TranscribeRequest, ValidTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Transitions move forward only; terminal states are frozen
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJob {
    pub id: String,
    pub job_id: String,
    pub asset_id: String,
    pub user_id: String,
    pub language: String,
    pub status: JobStatus,
    pub result_text: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    pub dispatched_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationJob {
    pub id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub input_text: String,
    pub kind: String,
    pub length: String,
    pub tone: String,
    pub output_text: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    pub dispatched_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

fn parse_status(raw: &str) -> Result<JobStatus, ApiError> {
    JobStatus::parse(raw)
        .ok_or_else(|| ApiError::Internal(format!("unknown job status '{}'", raw)))
}

fn row_to_transcription(row: &SqliteRow) -> Result<TranscriptionJob, ApiError> {
    let status: String = row.try_get(5)?;
    Ok(TranscriptionJob {
        id: row.try_get(0)?,
        job_id: row.try_get(1)?,
        asset_id: row.try_get(2)?,
        user_id: row.try_get(3)?,
        language: row.try_get(4)?,
        status: parse_status(&status)?,
        result_text: row.try_get(6)?,
        error: row.try_get(7)?,
        dispatched_at_ms: row.try_get(8)?,
        created_at_ms: row.try_get(9)?,
        updated_at_ms: row.try_get(10)?,
    })
}

fn row_to_transformation(row: &SqliteRow) -> Result<TransformationJob, ApiError> {
    let status: String = row.try_get(2)?;
    Ok(TransformationJob {
        id: row.try_get(0)?,
        user_id: row.try_get(1)?,
        status: parse_status(&status)?,
        input_text: row.try_get(3)?,
        kind: row.try_get(4)?,
        length: row.try_get(5)?,
        tone: row.try_get(6)?,
        output_text: row.try_get(7)?,
        error: row.try_get(8)?,
        dispatched_at_ms: row.try_get(9)?,
        created_at_ms: row.try_get(10)?,
        updated_at_ms: row.try_get(11)?,
    })
}

impl TransformationJob {
    /// Rebuild the worker prompt from the stored enum strings
    pub fn prompt(&self, brand_voice: Option<&BrandVoiceProfile>) -> Result<String, ApiError> {
        let kind = TransformationKind::parse(&self.kind)
            .ok_or_else(|| ApiError::Internal(format!("stored kind '{}' is invalid", self.kind)))?;
        let length = OutputLength::parse(&self.length).ok_or_else(|| {
            ApiError::Internal(format!("stored length '{}' is invalid", self.length))
        })?;
        let tone = Tone::parse(&self.tone)
            .ok_or_else(|| ApiError::Internal(format!("stored tone '{}' is invalid", self.tone)))?;
        Ok(prompt::build_prompt(kind, tone, length, brand_voice))
    }
}

/// Submit a transcription request
///
/// Validates shape and ownership, debits the caller, then creates the
/// `queued` row and flips the asset to `processing`. Worker dispatch is
/// the caller's concern and must not affect the outcome.
pub async fn submit_transcription(
    pool: &SqlitePool,
    user_id: &str,
    request: &TranscribeRequest,
    cost: i64,
    starting_grant: i64,
) -> Result<TranscriptionJob, ApiError> {
    let (asset_id, language) = request.validate()?;

    let asset = assets::get_owned(pool, user_id, &asset_id).await?;
    if !matches!(asset.status, AssetStatus::Uploaded | AssetStatus::Ready) {
        return Err(ApiError::Validation(format!(
            "asset is not ready for transcription (status '{}')",
            asset.status.as_str()
        )));
    }

    let id = Uuid::new_v4().to_string();
    let job_id = Uuid::new_v4().to_string();

    ledger::ensure_balance(pool, user_id, starting_grant).await?;
    ledger::apply(
        pool,
        user_id,
        -cost,
        "transcription",
        Some(("transcription", id.as_str())),
    )
    .await?;

    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::insert_transcription(
        &id,
        &job_id,
        &asset_id,
        user_id,
        &language,
        JobStatus::Queued.as_str(),
        now_ms,
    ))
    .execute(pool)
    .await?;

    assets::set_status(pool, &asset_id, AssetStatus::Processing).await?;

    Ok(TranscriptionJob {
        id,
        job_id,
        asset_id,
        user_id: user_id.to_string(),
        language,
        status: JobStatus::Queued,
        result_text: None,
        error: None,
        dispatched_at_ms: None,
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
    })
}

/// Submit a transformation request (input already shape-validated)
pub async fn submit_transformation(
    pool: &SqlitePool,
    user_id: &str,
    request: &ValidTransform,
    cost: i64,
    starting_grant: i64,
) -> Result<TransformationJob, ApiError> {
    let id = Uuid::new_v4().to_string();

    ledger::ensure_balance(pool, user_id, starting_grant).await?;
    ledger::apply(
        pool,
        user_id,
        -cost,
        "transformation",
        Some(("transformation", id.as_str())),
    )
    .await?;

    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::insert_transformation(
        &id,
        user_id,
        JobStatus::Queued.as_str(),
        &request.input_text,
        request.kind.as_str(),
        request.length.as_str(),
        request.tone.as_str(),
        now_ms,
    ))
    .execute(pool)
    .await?;

    Ok(TransformationJob {
        id,
        user_id: user_id.to_string(),
        status: JobStatus::Queued,
        input_text: request.input_text.clone(),
        kind: request.kind.as_str().to_string(),
        length: request.length.as_str().to_string(),
        tone: request.tone.as_str().to_string(),
        output_text: None,
        error: None,
        dispatched_at_ms: None,
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
    })
}

/// Fetch a transcription the caller owns; foreign rows read as `VAL_404`
pub async fn get_transcription_owned(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<TranscriptionJob, ApiError> {
    let job = get_transcription(pool, id).await?;
    if job.user_id != user_id {
        return Err(ApiError::NotFound("transcription"));
    }
    Ok(job)
}

pub async fn get_transcription(pool: &SqlitePool, id: &str) -> Result<TranscriptionJob, ApiError> {
    let row = sqlx::query(&queries::select_transcription_by_id(id))
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("transcription"))?;
    row_to_transcription(&row)
}

/// Fetch a transformation the caller owns; foreign rows read as `VAL_404`
pub async fn get_transformation_owned(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<TransformationJob, ApiError> {
    let job = get_transformation(pool, id).await?;
    if job.user_id != user_id {
        return Err(ApiError::NotFound("transformation"));
    }
    Ok(job)
}

pub async fn get_transformation(pool: &SqlitePool, id: &str) -> Result<TransformationJob, ApiError> {
    let row = sqlx::query(&queries::select_transformation_by_id(id))
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("transformation"))?;
    row_to_transformation(&row)
}

pub async fn list_transcriptions(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<TranscriptionJob>, ApiError> {
    let rows = sqlx::query(&queries::select_transcriptions_by_user(user_id))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_transcription).collect()
}

pub async fn list_transformations(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<TransformationJob>, ApiError> {
    let rows = sqlx::query(&queries::select_transformations_by_user(user_id))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_transformation).collect()
}

/// Worker-reported status change for a transcription
///
/// Enforces forward-only transitions. Completion stores the result text,
/// flips the asset to `ready` and notifies the owner; failure refunds the
/// debit and flips the asset to `failed`.
pub async fn update_transcription_status(
    pool: &SqlitePool,
    id: &str,
    next: JobStatus,
    result_text: Option<&str>,
    error: Option<&str>,
) -> Result<TranscriptionJob, ApiError> {
    let job = get_transcription(pool, id).await?;

    if !job.status.can_transition_to(next) {
        return Err(ApiError::Validation(format!(
            "transcription cannot move from '{}' to '{}'",
            job.status.as_str(),
            next.as_str()
        )));
    }

    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::update_transcription_status(
        id,
        next.as_str(),
        result_text,
        error,
        now_ms,
    ))
    .execute(pool)
    .await?;

    match next {
        JobStatus::Completed => {
            assets::set_status(pool, &job.asset_id, AssetStatus::Ready).await?;
            notifications::notify(
                pool,
                &job.user_id,
                "transcription_completed",
                &serde_json::json!({ "transcriptionId": job.id, "jobId": job.job_id }),
            )
            .await?;
        }
        JobStatus::Failed => {
            assets::set_status(pool, &job.asset_id, AssetStatus::Failed).await?;
            ledger::refund(pool, &job.user_id, "transcription", &job.id).await?;
            notifications::notify(
                pool,
                &job.user_id,
                "transcription_failed",
                &serde_json::json!({ "transcriptionId": job.id, "jobId": job.job_id }),
            )
            .await?;
        }
        _ => {}
    }

    get_transcription(pool, id).await
}

/// Worker-reported status change for a transformation
pub async fn update_transformation_status(
    pool: &SqlitePool,
    id: &str,
    next: JobStatus,
    output_text: Option<&str>,
    error: Option<&str>,
) -> Result<TransformationJob, ApiError> {
    let job = get_transformation(pool, id).await?;

    if !job.status.can_transition_to(next) {
        return Err(ApiError::Validation(format!(
            "transformation cannot move from '{}' to '{}'",
            job.status.as_str(),
            next.as_str()
        )));
    }

    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::update_transformation_status(
        id,
        next.as_str(),
        output_text,
        error,
        now_ms,
    ))
    .execute(pool)
    .await?;

    match next {
        JobStatus::Completed => {
            notifications::notify(
                pool,
                &job.user_id,
                "transformation_completed",
                &serde_json::json!({ "transformationId": job.id }),
            )
            .await?;
        }
        JobStatus::Failed => {
            ledger::refund(pool, &job.user_id, "transformation", &job.id).await?;
            notifications::notify(
                pool,
                &job.user_id,
                "transformation_failed",
                &serde_json::json!({ "transformationId": job.id }),
            )
            .await?;
        }
        _ => {}
    }

    get_transformation(pool, id).await
}

/// Stamp a transcription as handed to the worker
pub async fn mark_transcription_dispatched(pool: &SqlitePool, id: &str) -> Result<(), ApiError> {
    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::mark_transcription_dispatched(id, now_ms))
        .execute(pool)
        .await?;
    Ok(())
}

/// Stamp a transformation as handed to the worker
pub async fn mark_transformation_dispatched(pool: &SqlitePool, id: &str) -> Result<(), ApiError> {
    let now_ms = Utc::now().timestamp_millis();
    sqlx::query(&queries::mark_transformation_dispatched(id, now_ms))
        .execute(pool)
        .await?;
    Ok(())
}

/// Queued transcriptions never dispatched or dispatched too long ago
pub async fn stale_transcriptions(
    pool: &SqlitePool,
    stale_after_secs: i64,
) -> Result<Vec<TranscriptionJob>, ApiError> {
    let cutoff_ms = Utc::now().timestamp_millis() - stale_after_secs * 1000;
    let rows = sqlx::query(&queries::select_stale_transcriptions(
        JobStatus::Queued.as_str(),
        cutoff_ms,
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_transcription).collect()
}

/// Queued transformations never dispatched or dispatched too long ago
pub async fn stale_transformations(
    pool: &SqlitePool,
    stale_after_secs: i64,
) -> Result<Vec<TransformationJob>, ApiError> {
    let cutoff_ms = Utc::now().timestamp_millis() - stale_after_secs * 1000;
    let rows = sqlx::query(&queries::select_stale_transformations(
        JobStatus::Queued.as_str(),
        cutoff_ms,
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_transformation).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_forward_only() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
