use sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use crate::schema::{
    Assets, Balances, BrandVoices, DracmaTransactions, Metadata, Notifications, RateLimitHits,
    TranscriptionJobs, TransformationJobs, Users,
};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users (
///     id TEXT PRIMARY KEY,
///     display_name TEXT NOT NULL,
///     bearer_token TEXT NOT NULL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_users_table() -> String {
    Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(ColumnDef::new(Users::Id).string().primary_key())
        .col(ColumnDef::new(Users::DisplayName).string().not_null())
        .col(ColumnDef::new(Users::BearerToken).string().not_null())
        .col(ColumnDef::new(Users::CreatedAtMs).big_integer().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE UNIQUE INDEX IF NOT EXISTS idx_users_bearer_token ON users(bearer_token)
pub fn create_users_token_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_users_bearer_token")
        .table(Users::Table)
        .col(Users::BearerToken)
        .unique()
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS assets (
///     id TEXT PRIMARY KEY,
///     user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     storage_path TEXT NOT NULL,
///     mime_type TEXT NOT NULL,
///     status TEXT NOT NULL,
///     duration_seconds REAL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_assets_table() -> String {
    Table::create()
        .table(Assets::Table)
        .if_not_exists()
        .col(ColumnDef::new(Assets::Id).string().primary_key())
        .col(ColumnDef::new(Assets::UserId).string().not_null())
        .col(ColumnDef::new(Assets::StoragePath).string().not_null())
        .col(ColumnDef::new(Assets::MimeType).string().not_null())
        .col(ColumnDef::new(Assets::Status).string().not_null())
        .col(ColumnDef::new(Assets::DurationSeconds).double())
        .col(ColumnDef::new(Assets::CreatedAtMs).big_integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Assets::Table, Assets::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_assets_user_id ON assets(user_id)
pub fn create_assets_user_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_assets_user_id")
        .table(Assets::Table)
        .col(Assets::UserId)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS transcription_jobs (
///     id TEXT PRIMARY KEY,
///     job_id TEXT NOT NULL,
///     asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
///     user_id TEXT NOT NULL,
///     language TEXT NOT NULL,
///     status TEXT NOT NULL,
///     result_text TEXT,
///     error TEXT,
///     dispatched_at_ms INTEGER,
///     created_at_ms INTEGER NOT NULL,
///     updated_at_ms INTEGER NOT NULL
/// )
pub fn create_transcription_jobs_table() -> String {
    Table::create()
        .table(TranscriptionJobs::Table)
        .if_not_exists()
        .col(ColumnDef::new(TranscriptionJobs::Id).string().primary_key())
        .col(ColumnDef::new(TranscriptionJobs::JobId).string().not_null())
        .col(ColumnDef::new(TranscriptionJobs::AssetId).string().not_null())
        .col(ColumnDef::new(TranscriptionJobs::UserId).string().not_null())
        .col(ColumnDef::new(TranscriptionJobs::Language).string().not_null())
        .col(ColumnDef::new(TranscriptionJobs::Status).string().not_null())
        .col(ColumnDef::new(TranscriptionJobs::ResultText).text())
        .col(ColumnDef::new(TranscriptionJobs::Error).string())
        .col(ColumnDef::new(TranscriptionJobs::DispatchedAtMs).big_integer())
        .col(
            ColumnDef::new(TranscriptionJobs::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(TranscriptionJobs::UpdatedAtMs)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(TranscriptionJobs::Table, TranscriptionJobs::AssetId)
                .to(Assets::Table, Assets::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_transcription_jobs_status
/// ON transcription_jobs(status, dispatched_at_ms)
pub fn create_transcription_jobs_status_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_transcription_jobs_status")
        .table(TranscriptionJobs::Table)
        .col(TranscriptionJobs::Status)
        .col(TranscriptionJobs::DispatchedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS transformation_jobs (
///     id TEXT PRIMARY KEY,
///     user_id TEXT NOT NULL,
///     status TEXT NOT NULL,
///     input_text TEXT NOT NULL,
///     kind TEXT NOT NULL,
///     length TEXT NOT NULL,
///     tone TEXT NOT NULL,
///     output_text TEXT,
///     error TEXT,
///     dispatched_at_ms INTEGER,
///     created_at_ms INTEGER NOT NULL,
///     updated_at_ms INTEGER NOT NULL
/// )
pub fn create_transformation_jobs_table() -> String {
    Table::create()
        .table(TransformationJobs::Table)
        .if_not_exists()
        .col(ColumnDef::new(TransformationJobs::Id).string().primary_key())
        .col(ColumnDef::new(TransformationJobs::UserId).string().not_null())
        .col(ColumnDef::new(TransformationJobs::Status).string().not_null())
        .col(ColumnDef::new(TransformationJobs::InputText).text().not_null())
        .col(ColumnDef::new(TransformationJobs::Kind).string().not_null())
        .col(ColumnDef::new(TransformationJobs::Length).string().not_null())
        .col(ColumnDef::new(TransformationJobs::Tone).string().not_null())
        .col(ColumnDef::new(TransformationJobs::OutputText).text())
        .col(ColumnDef::new(TransformationJobs::Error).string())
        .col(ColumnDef::new(TransformationJobs::DispatchedAtMs).big_integer())
        .col(
            ColumnDef::new(TransformationJobs::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(TransformationJobs::UpdatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_transformation_jobs_status
/// ON transformation_jobs(status, dispatched_at_ms)
pub fn create_transformation_jobs_status_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_transformation_jobs_status")
        .table(TransformationJobs::Table)
        .col(TransformationJobs::Status)
        .col(TransformationJobs::DispatchedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS balances (
///     user_id TEXT PRIMARY KEY,
///     balance INTEGER NOT NULL,
///     is_unlimited INTEGER NOT NULL DEFAULT 0
/// )
pub fn create_balances_table() -> String {
    Table::create()
        .table(Balances::Table)
        .if_not_exists()
        .col(ColumnDef::new(Balances::UserId).string().primary_key())
        .col(ColumnDef::new(Balances::Balance).big_integer().not_null())
        .col(
            ColumnDef::new(Balances::IsUnlimited)
                .integer()
                .not_null()
                .default(0),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS dracma_transactions (
///     id TEXT PRIMARY KEY,
///     user_id TEXT NOT NULL,
///     delta INTEGER NOT NULL,
///     reason TEXT NOT NULL,
///     reference_type TEXT,
///     reference_id TEXT,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_dracma_transactions_table() -> String {
    Table::create()
        .table(DracmaTransactions::Table)
        .if_not_exists()
        .col(ColumnDef::new(DracmaTransactions::Id).string().primary_key())
        .col(ColumnDef::new(DracmaTransactions::UserId).string().not_null())
        .col(ColumnDef::new(DracmaTransactions::Delta).big_integer().not_null())
        .col(ColumnDef::new(DracmaTransactions::Reason).string().not_null())
        .col(ColumnDef::new(DracmaTransactions::ReferenceType).string())
        .col(ColumnDef::new(DracmaTransactions::ReferenceId).string())
        .col(
            ColumnDef::new(DracmaTransactions::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_dracma_transactions_user
/// ON dracma_transactions(user_id, created_at_ms)
pub fn create_dracma_transactions_user_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_dracma_transactions_user")
        .table(DracmaTransactions::Table)
        .col(DracmaTransactions::UserId)
        .col(DracmaTransactions::CreatedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS notifications (
///     id TEXT PRIMARY KEY,
///     user_id TEXT NOT NULL,
///     kind TEXT NOT NULL,
///     payload TEXT NOT NULL,
///     is_read INTEGER NOT NULL DEFAULT 0,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_notifications_table() -> String {
    Table::create()
        .table(Notifications::Table)
        .if_not_exists()
        .col(ColumnDef::new(Notifications::Id).string().primary_key())
        .col(ColumnDef::new(Notifications::UserId).string().not_null())
        .col(ColumnDef::new(Notifications::Kind).string().not_null())
        .col(ColumnDef::new(Notifications::Payload).text().not_null())
        .col(
            ColumnDef::new(Notifications::IsRead)
                .integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(Notifications::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_notifications_user
/// ON notifications(user_id, is_read, created_at_ms)
pub fn create_notifications_user_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_notifications_user")
        .table(Notifications::Table)
        .col(Notifications::UserId)
        .col(Notifications::IsRead)
        .col(Notifications::CreatedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS brand_voices (
///     user_id TEXT PRIMARY KEY,
///     tone TEXT NOT NULL,
///     style TEXT NOT NULL,
///     samples TEXT NOT NULL,
///     preferences TEXT NOT NULL,
///     updated_at_ms INTEGER NOT NULL
/// )
pub fn create_brand_voices_table() -> String {
    Table::create()
        .table(BrandVoices::Table)
        .if_not_exists()
        .col(ColumnDef::new(BrandVoices::UserId).string().primary_key())
        .col(ColumnDef::new(BrandVoices::Tone).string().not_null())
        .col(ColumnDef::new(BrandVoices::Style).string().not_null())
        .col(ColumnDef::new(BrandVoices::Samples).text().not_null())
        .col(ColumnDef::new(BrandVoices::Preferences).text().not_null())
        .col(
            ColumnDef::new(BrandVoices::UpdatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS rate_limit_hits (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id TEXT NOT NULL,
///     bucket TEXT NOT NULL,
///     requested_at_ms INTEGER NOT NULL
/// )
pub fn create_rate_limit_hits_table() -> String {
    Table::create()
        .table(RateLimitHits::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(RateLimitHits::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(RateLimitHits::UserId).string().not_null())
        .col(ColumnDef::new(RateLimitHits::Bucket).string().not_null())
        .col(
            ColumnDef::new(RateLimitHits::RequestedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_rate_limit_hits_window
/// ON rate_limit_hits(user_id, bucket, requested_at_ms)
pub fn create_rate_limit_hits_window_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_rate_limit_hits_window")
        .table(RateLimitHits::Table)
        .col(RateLimitHits::UserId)
        .col(RateLimitHits::Bucket)
        .col(RateLimitHits::RequestedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// All statements needed to bring an empty database up to the current schema,
/// in dependency order
pub fn all_statements() -> Vec<String> {
    vec![
        create_metadata_table(),
        create_users_table(),
        create_users_token_index(),
        create_assets_table(),
        create_assets_user_index(),
        create_transcription_jobs_table(),
        create_transcription_jobs_status_index(),
        create_transformation_jobs_table(),
        create_transformation_jobs_status_index(),
        create_balances_table(),
        create_dracma_transactions_table(),
        create_dracma_transactions_user_index(),
        create_notifications_table(),
        create_notifications_user_index(),
        create_brand_voices_table(),
        create_rate_limit_hits_table(),
        create_rate_limit_hits_window_index(),
    ]
}
