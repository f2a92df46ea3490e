//! Dual-sink audit logging
//!
//! Every run writes a timestamped full log and a separate errors-only log
//! next to the id-mapping snapshot, in addition to the console output.
//! Both files are append-only for the duration of the run.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub struct LogFiles {
    pub log_file: PathBuf,
    pub error_file: PathBuf,
}

pub fn init(log_dir: &Path, log_level: &str) -> Result<LogFiles> {
    std::fs::create_dir_all(log_dir)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let log_file = log_dir.join(format!("migration-{timestamp}.log"));
    let error_file = log_dir.join(format!("errors-{timestamp}.log"));

    let log_writer = Arc::new(open_append(&log_file)?);
    let error_writer = Arc::new(open_append(&error_file)?);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vetflow_migrate={log_level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(log_writer),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR),
        )
        .init();

    Ok(LogFiles {
        log_file,
        error_file,
    })
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
