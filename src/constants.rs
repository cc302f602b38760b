use rand::Rng;

/// Expected database schema version
/// All databases must use this version for compatibility
pub const EXPECTED_DB_VERSION: &str = "1";

/// Transformation input bounds (characters)
pub const TRANSFORM_INPUT_MIN_CHARS: usize = 10;
pub const TRANSFORM_INPUT_MAX_CHARS: usize = 50_000;

/// Brand voice profile bounds
pub const BRAND_VOICE_MIN_SAMPLES: usize = 1;
pub const BRAND_VOICE_MAX_SAMPLES: usize = 50;
pub const BRAND_VOICE_SAMPLE_MAX_CHARS: usize = 10_000;
pub const BRAND_VOICE_FIELD_MAX_CHARS: usize = 500;

/// Fixed-window rate limit for the worker proxy
pub const RATE_LIMIT_MAX_REQUESTS: i64 = 10;
pub const RATE_LIMIT_WINDOW_SECS: i64 = 60;

/// Client-side job polling interval
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Outbound worker call discipline
pub const WORKER_TIMEOUT_SECS: u64 = 60;
pub const WORKER_MAX_ATTEMPTS: u32 = 3;
pub const WORKER_BACKOFF_BASE_MS: u64 = 500;

/// Dracma costs per operation and the grant for new accounts
pub const TRANSCRIPTION_COST: i64 = 10;
pub const TRANSFORMATION_COST: i64 = 5;
pub const STARTING_GRANT: i64 = 100;

/// A queued job whose dispatch is older than this is eligible for re-dispatch
pub const DEFAULT_STALE_AFTER_SECS: i64 = 120;

/// Generate a bearer token for a new user account
pub fn generate_bearer_token() -> String {
    format!(
        "ak_{}",
        rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(32)
            .map(char::from)
            .collect::<String>()
    )
}
