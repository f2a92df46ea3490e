//! Per-entity mappers
//!
//! Each mapper consumes cleaned records plus the id mapping directory and
//! issues inserts through the run's open transaction. Record-level
//! problems (missing required fields, unresolvable optional references,
//! insert failures) are logged and skipped; only mandatory dependency
//! misses and mapping conflicts escalate and roll the run back.

pub mod catalog;
pub mod client;
pub mod consultation;
pub mod doctor;
pub mod pet;

pub use catalog::CatalogMapper;
pub use client::ClientMapper;
pub use consultation::ConsultationMapper;
pub use doctor::DoctorMapper;
pub use pet::PetMapper;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::errors::MigrationError;
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::IdMappingDirectory;

/// Mutable per-run state threaded through every mapper call: the open
/// transaction's connection and the id mapping directory.
pub struct MigrationContext<'a> {
    pub tx: &'a mut SqliteConnection,
    pub ids: &'a mut IdMappingDirectory,
}

/// Outcome of a single record within a batch.
pub enum RecordOutcome {
    Migrated,
    Skipped,
}

#[async_trait]
pub trait EntityMapper {
    type Record: Send + Sync;

    async fn migrate_batch(
        &self,
        records: &[Self::Record],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError>;
}

/// Fold one record result into the batch stats, keeping record-level
/// isolation: datastore errors for a single row are logged by the caller
/// and counted, everything else escalates.
pub(crate) fn tally(
    stats: &mut BatchStats,
    outcome: Result<RecordOutcome, MigrationError>,
    context: &str,
) -> Result<(), MigrationError> {
    match outcome {
        Ok(RecordOutcome::Migrated) => stats.migrated += 1,
        Ok(RecordOutcome::Skipped) => stats.skipped += 1,
        Err(MigrationError::Database(error)) => {
            tracing::error!("Failed to migrate {}: {}", context, error);
            stats.errors += 1;
        }
        Err(escalated) => return Err(escalated),
    }
    Ok(())
}
