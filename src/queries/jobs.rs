use sea_query::{Cond, Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::{TranscriptionJobs, TransformationJobs};

const TRANSCRIPTION_COLUMNS: [TranscriptionJobs; 11] = [
    TranscriptionJobs::Id,
    TranscriptionJobs::JobId,
    TranscriptionJobs::AssetId,
    TranscriptionJobs::UserId,
    TranscriptionJobs::Language,
    TranscriptionJobs::Status,
    TranscriptionJobs::ResultText,
    TranscriptionJobs::Error,
    TranscriptionJobs::DispatchedAtMs,
    TranscriptionJobs::CreatedAtMs,
    TranscriptionJobs::UpdatedAtMs,
];

const TRANSFORMATION_COLUMNS: [TransformationJobs; 12] = [
    TransformationJobs::Id,
    TransformationJobs::UserId,
    TransformationJobs::Status,
    TransformationJobs::InputText,
    TransformationJobs::Kind,
    TransformationJobs::Length,
    TransformationJobs::Tone,
    TransformationJobs::OutputText,
    TransformationJobs::Error,
    TransformationJobs::DispatchedAtMs,
    TransformationJobs::CreatedAtMs,
    TransformationJobs::UpdatedAtMs,
];

/// INSERT INTO transcription_jobs (id, job_id, asset_id, user_id, language, status,
/// created_at_ms, updated_at_ms) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
pub fn insert_transcription(
    id: &str,
    job_id: &str,
    asset_id: &str,
    user_id: &str,
    language: &str,
    status: &str,
    now_ms: i64,
) -> String {
    Query::insert()
        .into_table(TranscriptionJobs::Table)
        .columns([
            TranscriptionJobs::Id,
            TranscriptionJobs::JobId,
            TranscriptionJobs::AssetId,
            TranscriptionJobs::UserId,
            TranscriptionJobs::Language,
            TranscriptionJobs::Status,
            TranscriptionJobs::CreatedAtMs,
            TranscriptionJobs::UpdatedAtMs,
        ])
        .values_panic([
            id.into(),
            job_id.into(),
            asset_id.into(),
            user_id.into(),
            language.into(),
            status.into(),
            now_ms.into(),
            now_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transcription_jobs WHERE id = ?
pub fn select_transcription_by_id(id: &str) -> String {
    Query::select()
        .columns(TRANSCRIPTION_COLUMNS)
        .from(TranscriptionJobs::Table)
        .and_where(Expr::col(TranscriptionJobs::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transcription_jobs WHERE user_id = ? ORDER BY created_at_ms DESC
pub fn select_transcriptions_by_user(user_id: &str) -> String {
    Query::select()
        .columns(TRANSCRIPTION_COLUMNS)
        .from(TranscriptionJobs::Table)
        .and_where(Expr::col(TranscriptionJobs::UserId).eq(user_id))
        .order_by(TranscriptionJobs::CreatedAtMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE transcription_jobs SET status = ?, result_text = ?, error = ?, updated_at_ms = ?
/// WHERE id = ?
pub fn update_transcription_status(
    id: &str,
    status: &str,
    result_text: Option<&str>,
    error: Option<&str>,
    now_ms: i64,
) -> String {
    let mut update = Query::update()
        .table(TranscriptionJobs::Table)
        .value(TranscriptionJobs::Status, status)
        .value(TranscriptionJobs::UpdatedAtMs, now_ms)
        .and_where(Expr::col(TranscriptionJobs::Id).eq(id))
        .to_owned();

    if let Some(text) = result_text {
        update.value(TranscriptionJobs::ResultText, text);
    }
    if let Some(error) = error {
        update.value(TranscriptionJobs::Error, error);
    }

    update.to_string(SqliteQueryBuilder)
}

/// UPDATE transcription_jobs SET dispatched_at_ms = ? WHERE id = ?
pub fn mark_transcription_dispatched(id: &str, now_ms: i64) -> String {
    Query::update()
        .table(TranscriptionJobs::Table)
        .value(TranscriptionJobs::DispatchedAtMs, now_ms)
        .and_where(Expr::col(TranscriptionJobs::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transcription_jobs WHERE status = 'queued'
/// AND (dispatched_at_ms IS NULL OR dispatched_at_ms < ?) ORDER BY created_at_ms
pub fn select_stale_transcriptions(queued_status: &str, dispatched_before_ms: i64) -> String {
    Query::select()
        .columns(TRANSCRIPTION_COLUMNS)
        .from(TranscriptionJobs::Table)
        .and_where(Expr::col(TranscriptionJobs::Status).eq(queued_status))
        .cond_where(
            Cond::any()
                .add(Expr::col(TranscriptionJobs::DispatchedAtMs).is_null())
                .add(Expr::col(TranscriptionJobs::DispatchedAtMs).lt(dispatched_before_ms)),
        )
        .order_by(TranscriptionJobs::CreatedAtMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO transformation_jobs (id, user_id, status, input_text, kind, length, tone,
/// created_at_ms, updated_at_ms) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
pub fn insert_transformation(
    id: &str,
    user_id: &str,
    status: &str,
    input_text: &str,
    kind: &str,
    length: &str,
    tone: &str,
    now_ms: i64,
) -> String {
    Query::insert()
        .into_table(TransformationJobs::Table)
        .columns([
            TransformationJobs::Id,
            TransformationJobs::UserId,
            TransformationJobs::Status,
            TransformationJobs::InputText,
            TransformationJobs::Kind,
            TransformationJobs::Length,
            TransformationJobs::Tone,
            TransformationJobs::CreatedAtMs,
            TransformationJobs::UpdatedAtMs,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            status.into(),
            input_text.into(),
            kind.into(),
            length.into(),
            tone.into(),
            now_ms.into(),
            now_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transformation_jobs WHERE id = ?
pub fn select_transformation_by_id(id: &str) -> String {
    Query::select()
        .columns(TRANSFORMATION_COLUMNS)
        .from(TransformationJobs::Table)
        .and_where(Expr::col(TransformationJobs::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transformation_jobs WHERE user_id = ? ORDER BY created_at_ms DESC
pub fn select_transformations_by_user(user_id: &str) -> String {
    Query::select()
        .columns(TRANSFORMATION_COLUMNS)
        .from(TransformationJobs::Table)
        .and_where(Expr::col(TransformationJobs::UserId).eq(user_id))
        .order_by(TransformationJobs::CreatedAtMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE transformation_jobs SET status = ?, output_text = ?, error = ?, updated_at_ms = ?
/// WHERE id = ?
pub fn update_transformation_status(
    id: &str,
    status: &str,
    output_text: Option<&str>,
    error: Option<&str>,
    now_ms: i64,
) -> String {
    let mut update = Query::update()
        .table(TransformationJobs::Table)
        .value(TransformationJobs::Status, status)
        .value(TransformationJobs::UpdatedAtMs, now_ms)
        .and_where(Expr::col(TransformationJobs::Id).eq(id))
        .to_owned();

    if let Some(text) = output_text {
        update.value(TransformationJobs::OutputText, text);
    }
    if let Some(error) = error {
        update.value(TransformationJobs::Error, error);
    }

    update.to_string(SqliteQueryBuilder)
}

/// UPDATE transformation_jobs SET dispatched_at_ms = ? WHERE id = ?
pub fn mark_transformation_dispatched(id: &str, now_ms: i64) -> String {
    Query::update()
        .table(TransformationJobs::Table)
        .value(TransformationJobs::DispatchedAtMs, now_ms)
        .and_where(Expr::col(TransformationJobs::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT * FROM transformation_jobs WHERE status = 'queued'
/// AND (dispatched_at_ms IS NULL OR dispatched_at_ms < ?) ORDER BY created_at_ms
pub fn select_stale_transformations(queued_status: &str, dispatched_before_ms: i64) -> String {
    Query::select()
        .columns(TRANSFORMATION_COLUMNS)
        .from(TransformationJobs::Table)
        .and_where(Expr::col(TransformationJobs::Status).eq(queued_status))
        .cond_where(
            Cond::any()
                .add(Expr::col(TransformationJobs::DispatchedAtMs).is_null())
                .add(Expr::col(TransformationJobs::DispatchedAtMs).lt(dispatched_before_ms)),
        )
        .order_by(TransformationJobs::CreatedAtMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}
