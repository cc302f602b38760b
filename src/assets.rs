use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::queries::assets as queries;
use crate::validate::CreateAssetRequest;

/// Bucket receiving new uploads
pub const UPLOAD_BUCKET: &str = "uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Uploaded => "uploaded",
            AssetStatus::Processing => "processing",
            AssetStatus::Ready => "ready",
            AssetStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssetStatus::Pending),
            "uploaded" => Some(AssetStatus::Uploaded),
            "processing" => Some(AssetStatus::Processing),
            "ready" => Some(AssetStatus::Ready),
            "failed" => Some(AssetStatus::Failed),
            _ => None,
        }
    }

    /// Whether a status change is allowed
    ///
    /// Forward along pending → uploaded → processing → {ready|failed};
    /// a ready asset may re-enter processing; failed is terminal.
    pub fn can_transition_to(&self, next: AssetStatus) -> bool {
        matches!(
            (self, next),
            (AssetStatus::Pending, AssetStatus::Uploaded)
                | (AssetStatus::Pending, AssetStatus::Failed)
                | (AssetStatus::Uploaded, AssetStatus::Processing)
                | (AssetStatus::Uploaded, AssetStatus::Failed)
                | (AssetStatus::Processing, AssetStatus::Ready)
                | (AssetStatus::Processing, AssetStatus::Failed)
                | (AssetStatus::Ready, AssetStatus::Processing)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub user_id: String,
    pub storage_path: String,
    pub mime_type: String,
    pub status: AssetStatus,
    pub duration_seconds: Option<f64>,
    pub created_at_ms: i64,
}

fn row_to_asset(row: &SqliteRow) -> Result<Asset, ApiError> {
    let status: String = row.try_get(4)?;
    Ok(Asset {
        id: row.try_get(0)?,
        user_id: row.try_get(1)?,
        storage_path: row.try_get(2)?,
        mime_type: row.try_get(3)?,
        status: AssetStatus::parse(&status)
            .ok_or_else(|| ApiError::Internal(format!("unknown asset status '{}'", status)))?,
        duration_seconds: row.try_get(5)?,
        created_at_ms: row.try_get(6)?,
    })
}

/// Create an upload-intent row in `pending` state
pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    request: &CreateAssetRequest,
) -> Result<Asset, ApiError> {
    let extension = request.validate()?;
    let id = Uuid::new_v4().to_string();
    let storage_path = format!("{}/{}.{}", UPLOAD_BUCKET, id, extension);
    let now_ms = Utc::now().timestamp_millis();

    sqlx::query(&queries::insert(
        &id,
        user_id,
        &storage_path,
        &request.mime_type,
        AssetStatus::Pending.as_str(),
        now_ms,
    ))
    .execute(pool)
    .await?;

    Ok(Asset {
        id,
        user_id: user_id.to_string(),
        storage_path,
        mime_type: request.mime_type.clone(),
        status: AssetStatus::Pending,
        duration_seconds: None,
        created_at_ms: now_ms,
    })
}

/// Fetch an asset the caller owns
///
/// A missing row and a row owned by someone else both come back as
/// `VAL_404` so callers cannot probe for other users' assets.
pub async fn get_owned(
    pool: &SqlitePool,
    user_id: &str,
    asset_id: &str,
) -> Result<Asset, ApiError> {
    let row = sqlx::query(&queries::select_by_id(asset_id))
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("asset"))?;

    let asset = row_to_asset(&row)?;
    if asset.user_id != user_id {
        return Err(ApiError::NotFound("asset"));
    }
    Ok(asset)
}

/// The caller's assets, newest first
pub async fn list(pool: &SqlitePool, user_id: &str) -> Result<Vec<Asset>, ApiError> {
    let rows = sqlx::query(&queries::select_by_user(user_id))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_asset).collect()
}

/// Owner-initiated status change, checked against the transition rules
pub async fn update_status(
    pool: &SqlitePool,
    user_id: &str,
    asset_id: &str,
    next: AssetStatus,
    duration_seconds: Option<f64>,
) -> Result<Asset, ApiError> {
    let asset = get_owned(pool, user_id, asset_id).await?;

    if !asset.status.can_transition_to(next) {
        return Err(ApiError::Validation(format!(
            "asset cannot move from '{}' to '{}'",
            asset.status.as_str(),
            next.as_str()
        )));
    }

    sqlx::query(&queries::update_status(
        asset_id,
        next.as_str(),
        duration_seconds,
    ))
    .execute(pool)
    .await?;

    get_owned(pool, user_id, asset_id).await
}

/// Unchecked status write for job bookkeeping (asset already ownership-checked)
pub async fn set_status(
    pool: &SqlitePool,
    asset_id: &str,
    status: AssetStatus,
) -> Result<(), ApiError> {
    sqlx::query(&queries::update_status(asset_id, status.as_str(), None))
        .execute(pool)
        .await?;
    Ok(())
}

/// Every storage path referenced by an asset row
pub async fn referenced_storage_paths(pool: &SqlitePool) -> Result<Vec<String>, ApiError> {
    let rows = sqlx::query(&queries::select_all_storage_paths())
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| row.try_get::<String, _>(0).map_err(ApiError::from))
        .collect()
}
