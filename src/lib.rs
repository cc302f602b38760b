// Library interface for testing

// Declare all modules
pub mod assets;
pub mod auth;
pub mod brand_voice;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod notifications;
pub mod prompt;
pub mod queries;
pub mod rate_limit;
pub mod schema;
pub mod serve;
pub mod validate;
pub mod worker;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
