use std::path::Path;
use std::str::FromStr;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Open a file-based database pool for production use
/// Enables WAL mode and foreign keys, creating the file if needed
pub async fn open_database_pool(data_dir: &Path, name: &str) -> Result<SqlitePool, DynError> {
    let db_path = data_dir.join(format!("{}.sqlite", name));
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Create all tables and indexes, stamping the schema version on first run
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    for statement in ddl::all_statements() {
        sqlx::query(&statement).execute(pool).await?;
    }

    let version: Option<String> = sqlx::query_scalar(&metadata::select_by_key("version"))
        .fetch_optional(pool)
        .await?;

    match version {
        None => {
            sqlx::query(&metadata::insert("version", EXPECTED_DB_VERSION))
                .execute(pool)
                .await?;
        }
        Some(v) if v == EXPECTED_DB_VERSION => {}
        Some(v) => {
            return Err(format!(
                "Unsupported database version: '{}'. This application only supports version '{}'",
                v, EXPECTED_DB_VERSION
            )
            .into());
        }
    }

    Ok(())
}

/// Open a pool and bring the schema up to date in one step
pub async fn open_and_init(data_dir: &Path, name: &str) -> Result<SqlitePool, DynError> {
    let pool = open_database_pool(data_dir, name).await?;
    init_database_schema(&pool).await?;
    Ok(pool)
}

/// Create an in-memory database pool for testing
/// Foreign keys are enabled for CASCADE delete coverage
pub async fn create_test_pool_in_memory() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Valid in-memory connection string")
        .foreign_keys(true);

    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory database");

    init_database_schema(&pool)
        .await
        .expect("Failed to initialize test schema");
    pool
}

/// Create a file-backed database pool in a temporary directory for testing
/// Returns (pool, guard) - keep the guard alive to prevent temp file deletion
pub async fn create_test_pool_in_temporary_file() -> Result<(SqlitePool, tempfile::TempDir), DynError>
{
    let guard = tempfile::tempdir()?;
    let pool = open_database_pool(guard.path(), "test").await?;
    init_database_schema(&pool).await?;
    Ok((pool, guard))
}
