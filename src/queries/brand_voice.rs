use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};

use crate::schema::BrandVoices;

/// INSERT INTO brand_voices (user_id, tone, style, samples, preferences, updated_at_ms)
/// VALUES (?, ?, ?, ?, ?, ?)
/// ON CONFLICT (user_id) DO UPDATE SET tone, style, samples, preferences, updated_at_ms
pub fn upsert(
    user_id: &str,
    tone: &str,
    style: &str,
    samples_json: &str,
    preferences_json: &str,
    updated_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(BrandVoices::Table)
        .columns([
            BrandVoices::UserId,
            BrandVoices::Tone,
            BrandVoices::Style,
            BrandVoices::Samples,
            BrandVoices::Preferences,
            BrandVoices::UpdatedAtMs,
        ])
        .values_panic([
            user_id.into(),
            tone.into(),
            style.into(),
            samples_json.into(),
            preferences_json.into(),
            updated_at_ms.into(),
        ])
        .on_conflict(
            OnConflict::column(BrandVoices::UserId)
                .update_columns([
                    BrandVoices::Tone,
                    BrandVoices::Style,
                    BrandVoices::Samples,
                    BrandVoices::Preferences,
                    BrandVoices::UpdatedAtMs,
                ])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

/// SELECT user_id, tone, style, samples, preferences, updated_at_ms
/// FROM brand_voices WHERE user_id = ?
pub fn select_by_user(user_id: &str) -> String {
    Query::select()
        .columns([
            BrandVoices::UserId,
            BrandVoices::Tone,
            BrandVoices::Style,
            BrandVoices::Samples,
            BrandVoices::Preferences,
            BrandVoices::UpdatedAtMs,
        ])
        .from(BrandVoices::Table)
        .and_where(Expr::col(BrandVoices::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}
