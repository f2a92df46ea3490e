use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vetflow_migrate::{config::Config, database::Database, logging, migrate::MigrationRunner};

#[derive(Parser)]
#[command(name = "vetflow-migrate")]
#[command(version = "0.1.0")]
#[command(about = "Migrate a legacy KeySoft veterinary export into the VetFlow schema")]
#[command(long_about = None)]
struct Cli {
    /// Path to the legacy KeySoft JSON export (falls back to the
    /// configured default path)
    input: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Clean and validate only, without opening a transaction or touching
    /// the target store
    #[arg(long)]
    dry_run: bool,

    /// Database URL (overrides config file and DATABASE_URL)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    } else if let Ok(database_url) = std::env::var("DATABASE_URL") {
        config.database.url = database_url;
    }

    let log_files = logging::init(&config.migration.log_dir, &cli.log_level)?;
    info!("Starting vetflow-migrate v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", cli.config);
    info!("Run log: {}", log_files.log_file.display());

    let database = if cli.dry_run {
        // Dry runs never open a connection; a lazy pool satisfies the
        // runner without touching any store.
        Database::from_pool(sqlx::SqlitePool::connect_lazy("sqlite::memory:")?)
    } else {
        info!("Using database: {}", config.database.url);
        let database = Database::new(&config.database).await?;
        database.migrate().await?;
        info!("Database connection established and schema applied");
        database
    };

    let input_path = cli
        .input
        .unwrap_or_else(|| config.migration.default_input.clone());

    let runner = MigrationRunner::new(database, config);
    runner.run(&input_path, cli.dry_run).await?;

    Ok(())
}
