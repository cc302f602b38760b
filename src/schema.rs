use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Users table - accounts with their bearer tokens
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    DisplayName,
    BearerToken,
    CreatedAtMs,
}

/// Assets table - uploaded media file references
#[derive(Iden)]
pub enum Assets {
    Table,
    Id,
    UserId,
    StoragePath,
    MimeType,
    Status,
    DurationSeconds,
    CreatedAtMs,
}

/// Transcription jobs table - one audio/video-to-text request each
#[derive(Iden)]
pub enum TranscriptionJobs {
    Table,
    Id,
    JobId,
    AssetId,
    UserId,
    Language,
    Status,
    ResultText,
    Error,
    DispatchedAtMs,
    CreatedAtMs,
    UpdatedAtMs,
}

/// Transformation jobs table - one text-transform request each
#[derive(Iden)]
pub enum TransformationJobs {
    Table,
    Id,
    UserId,
    Status,
    InputText,
    Kind,
    Length,
    Tone,
    OutputText,
    Error,
    DispatchedAtMs,
    CreatedAtMs,
    UpdatedAtMs,
}

/// Balances table - one dracma balance per user
#[derive(Iden)]
pub enum Balances {
    Table,
    UserId,
    Balance,
    IsUnlimited,
}

/// Dracma transactions table - immutable ledger entries
#[derive(Iden)]
pub enum DracmaTransactions {
    Table,
    Id,
    UserId,
    Delta,
    Reason,
    ReferenceType,
    ReferenceId,
    CreatedAtMs,
}

/// Notifications table - user-scoped event records
#[derive(Iden)]
pub enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Payload,
    IsRead,
    CreatedAtMs,
}

/// Brand voices table - one style profile per user
#[derive(Iden)]
pub enum BrandVoices {
    Table,
    UserId,
    Tone,
    Style,
    Samples,
    Preferences,
    UpdatedAtMs,
}

/// Rate limit hits table - fixed-window request tracking
#[derive(Iden)]
pub enum RateLimitHits {
    Table,
    Id,
    UserId,
    Bucket,
    RequestedAtMs,
}
