use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_STALE_AFTER_SECS, STARTING_GRANT, TRANSCRIPTION_COST, TRANSFORMATION_COST,
    WORKER_TIMEOUT_SECS,
};

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_worker_timeout_secs() -> u64 {
    WORKER_TIMEOUT_SECS
}

fn default_stale_after_secs() -> i64 {
    DEFAULT_STALE_AFTER_SECS
}

/// Storage configuration (maps to [storage] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per bucket
    pub root_dir: PathBuf,
    /// Bucket names scanned by the orphan cleanup sweep
    pub buckets: Vec<String>,
}

/// Dracma pricing overrides (maps to [billing] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Cost of one transcription job in dracmas
    pub transcription_cost: Option<i64>,
    /// Cost of one transformation job in dracmas
    pub transformation_cost: Option<i64>,
    /// Dracmas granted when a balance row is first provisioned
    pub starting_grant: Option<i64>,
}

/// Service configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory for the SQLite database (default: data)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database file name without extension (required)
    pub database_name: String,
    /// API server port (default: 8080)
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Bearer token authorizing service-level calls (worker callbacks, sweeps)
    pub service_token: String,
    /// URL of the whisper/LLM worker that picks up dispatched jobs
    pub worker_url: String,
    /// Timeout for outbound worker calls in seconds (default: 60)
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    /// Queued jobs dispatched longer ago than this are re-dispatched by the
    /// stale sweep (default: 120)
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,
    /// Storage configuration (maps to [storage] section in TOML)
    pub storage: StorageConfig,
    /// Dracma pricing (maps to [billing] section in TOML)
    pub billing: Option<BillingConfig>,
}

impl AppConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&raw)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants before use
    pub fn validate(&self) -> Result<(), String> {
        if self.service_token.trim().is_empty() {
            return Err("service_token must not be empty".to_string());
        }

        url::Url::parse(&self.worker_url)
            .map_err(|e| format!("Invalid worker_url '{}': {}", self.worker_url, e))?;

        if self.storage.buckets.is_empty() {
            return Err("[storage] must declare at least one bucket".to_string());
        }

        if self.stale_after_secs <= 0 {
            return Err("stale_after_secs must be positive".to_string());
        }

        if let Some(billing) = &self.billing {
            for (key, value) in [
                ("transcription_cost", billing.transcription_cost),
                ("transformation_cost", billing.transformation_cost),
                ("starting_grant", billing.starting_grant),
            ] {
                if value.is_some_and(|v| v < 0) {
                    return Err(format!("[billing] {} must not be negative", key));
                }
            }
        }

        Ok(())
    }

    pub fn transcription_cost(&self) -> i64 {
        self.billing
            .as_ref()
            .and_then(|b| b.transcription_cost)
            .unwrap_or(TRANSCRIPTION_COST)
    }

    pub fn transformation_cost(&self) -> i64 {
        self.billing
            .as_ref()
            .and_then(|b| b.transformation_cost)
            .unwrap_or(TRANSFORMATION_COST)
    }

    pub fn starting_grant(&self) -> i64 {
        self.billing
            .as_ref()
            .and_then(|b| b.starting_grant)
            .unwrap_or(STARTING_GRANT)
    }

    /// Absolute path of a bucket directory under the storage root
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.storage.root_dir.join(bucket)
    }
}
