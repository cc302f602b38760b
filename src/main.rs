use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use arcanum_backend::cleanup;
use arcanum_backend::config::AppConfig;
use arcanum_backend::db;
use arcanum_backend::ledger;
use arcanum_backend::serve;
use arcanum_backend::worker::WorkerClient;
use arcanum_backend::auth;

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Arcanum job and dracma ledger backend")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete stored files with no referencing asset row
    CleanupOrphans {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Re-dispatch queued jobs the worker never picked up
    RetryStale {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Provision a user account and print its bearer token
    CreateUser {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Display name for the account
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), DynError> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Serve { config } => {
            let config = AppConfig::load(&config)?;
            serve::serve(config).await?;
        }
        Command::CleanupOrphans { config } => {
            let config = AppConfig::load(&config)?;
            let pool = db::open_and_init(&config.data_dir, &config.database_name).await?;
            let report = cleanup::cleanup_orphans(&pool, &config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::RetryStale { config } => {
            let config = AppConfig::load(&config)?;
            let pool = db::open_and_init(&config.data_dir, &config.database_name).await?;
            let worker = WorkerClient::new(&config.worker_url, config.worker_timeout_secs)?;
            let report = cleanup::retry_stale_jobs(&pool, &config, &worker).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::CreateUser { config, name } => {
            let config = AppConfig::load(&config)?;
            std::fs::create_dir_all(&config.data_dir)?;
            let pool = db::open_and_init(&config.data_dir, &config.database_name).await?;
            let (user_id, token) = auth::create_user(&pool, &name).await?;
            ledger::ensure_balance(&pool, &user_id, config.starting_grant()).await?;
            info!("Created user {}", user_id);
            println!("user_id: {}", user_id);
            println!("token: {}", token);
        }
    }

    Ok(())
}
