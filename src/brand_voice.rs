use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::queries::brand_voice as queries;

/// A user-defined style profile used to bias transformation prompts
///
/// Preferences use a BTreeMap so prompt construction iterates them in a
/// stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandVoiceProfile {
    pub tone: String,
    pub style: String,
    pub samples: Vec<String>,
    pub preferences: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBrandVoice {
    #[serde(flatten)]
    pub profile: BrandVoiceProfile,
    pub updated_at_ms: i64,
}

/// Persist a validated profile, replacing any previous one for the user
pub async fn save(
    pool: &SqlitePool,
    user_id: &str,
    profile: &BrandVoiceProfile,
) -> Result<StoredBrandVoice, ApiError> {
    let samples_json = serde_json::to_string(&profile.samples)?;
    let preferences_json = serde_json::to_string(&profile.preferences)?;
    let now_ms = Utc::now().timestamp_millis();

    sqlx::query(&queries::upsert(
        user_id,
        &profile.tone,
        &profile.style,
        &samples_json,
        &preferences_json,
        now_ms,
    ))
    .execute(pool)
    .await?;

    Ok(StoredBrandVoice {
        profile: profile.clone(),
        updated_at_ms: now_ms,
    })
}

/// Load a user's profile, if one has been trained
pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<Option<StoredBrandVoice>, ApiError> {
    let row = sqlx::query(&queries::select_by_user(user_id))
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let samples: Vec<String> = serde_json::from_str(&row.try_get::<String, _>(3)?)?;
    let preferences: BTreeMap<String, String> =
        serde_json::from_str(&row.try_get::<String, _>(4)?)?;

    Ok(Some(StoredBrandVoice {
        profile: BrandVoiceProfile {
            tone: row.try_get(1)?,
            style: row.try_get(2)?,
            samples,
            preferences,
        },
        updated_at_ms: row.try_get(5)?,
    }))
}
