//! Migration orchestration
//!
//! The runner sequences the migration steps inside a single database
//! transaction: cleaning and validation happen outside it, every mapper
//! pass happens inside it, and the run commits or rolls back as one unit.
//! Ordering is load-bearing: catalogs before doctors before clients before
//! pets before consultations, because each later entity resolves foreign
//! legacy references through mappings written by the earlier passes.

pub mod batch;
pub mod id_mapping;
pub mod mappers;

use std::path::Path;

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::{count_rows, Database, TargetTable};
use crate::errors::MigrationError;
use crate::legacy::cleaner::{CleanData, DataCleaner, DeclaredCounts};
use crate::legacy::validator::{DataValidator, ValidationReport};
use crate::legacy::LegacyExport;
use self::batch::{BatchProcessor, BatchStats};
use self::id_mapping::IdMappingDirectory;
use self::mappers::{
    CatalogMapper, ClientMapper, ConsultationMapper, DoctorMapper, EntityMapper, MigrationContext,
    PetMapper,
};

/// End-of-run report: per-entity outcome counts plus the advisory
/// validation result.
#[derive(Debug, Default)]
pub struct MigrationSummary {
    pub species_types: BatchStats,
    pub breeds: BatchStats,
    pub doctors: BatchStats,
    pub clients: BatchStats,
    pub pets: BatchStats,
    pub consultations: BatchStats,
    pub validation: ValidationReport,
    pub dry_run: bool,
}

pub struct MigrationRunner {
    database: Database,
    config: Config,
}

impl MigrationRunner {
    pub fn new(database: Database, config: Config) -> Self {
        Self { database, config }
    }

    pub async fn run(
        &self,
        input_path: &Path,
        dry_run: bool,
    ) -> Result<MigrationSummary, MigrationError> {
        info!("=== KEYSOFT MIGRATION START ===");
        info!("Mode: {}", if dry_run { "DRY RUN (no changes)" } else { "PRODUCTION" });
        info!("Input: {}", input_path.display());

        info!("Step 1: Loading legacy export...");
        let export = LegacyExport::load(input_path)?;
        let clean = DataCleaner::clean_all(&export);

        info!("Step 2: Validating data integrity...");
        let validation = self.validate(&clean);
        self.log_statistics(&clean.declared);

        let mut summary = MigrationSummary {
            validation,
            dry_run,
            ..Default::default()
        };

        if dry_run {
            info!("DRY RUN: finishing without touching the database.");
            return Ok(summary);
        }

        let mut ids = IdMappingDirectory::new();
        let mut tx = self.database.pool().begin().await?;

        match self.run_mappers(&mut tx, &mut ids, &clean, &mut summary).await {
            Ok(()) => {
                info!("Step 8: Validating migration...");
                self.post_validate(&mut tx, &clean.declared).await?;
                tx.commit().await?;
                info!("=== MIGRATION COMPLETED SUCCESSFULLY ===");
            }
            Err(migration_error) => {
                error!("Error during migration, rolling back: {migration_error}");
                if let Err(rollback_error) = tx.rollback().await {
                    error!("Rollback itself failed: {rollback_error}");
                }
                self.log_summary(&summary);
                return Err(migration_error);
            }
        }

        // Persist mappings for post-hoc audit
        let snapshot_path = self.config.migration.log_dir.join("id-mappings.json");
        std::fs::create_dir_all(&self.config.migration.log_dir)?;
        ids.save_to_file(&snapshot_path)?;
        info!("Mappings saved to: {}", snapshot_path.display());

        info!("Mapping statistics:");
        for (namespace, count) in ids.statistics() {
            info!("  {namespace}: {count} records mapped");
        }

        self.log_summary(&summary);
        Ok(summary)
    }

    async fn run_mappers(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        ids: &mut IdMappingDirectory,
        clean: &CleanData,
        summary: &mut MigrationSummary,
    ) -> Result<(), MigrationError> {
        let mut ctx = MigrationContext { tx: &mut *tx, ids };
        let migration = &self.config.migration;

        info!("Step 3: Migrating catalogs (species, breeds)...");
        let catalog = CatalogMapper::new(self.config.catalog.clone());
        summary.species_types = catalog
            .migrate_species_types(&clean.species_types, &mut ctx)
            .await?;
        info!("  ✓ {} species types migrated", summary.species_types.migrated);
        summary.breeds = catalog.migrate_breeds(&clean.breeds, &mut ctx).await?;
        info!("  ✓ {} breeds migrated", summary.breeds.migrated);

        info!("Step 4: Migrating doctors...");
        summary.doctors = DoctorMapper.migrate_batch(&clean.doctors, &mut ctx).await?;
        info!("  ✓ {} doctors migrated", summary.doctors.migrated);

        info!("Step 5: Migrating clients...");
        summary.clients = BatchProcessor::new(migration.client_batch_size)
            .process(&clean.clients, &mut ctx, |ctx, chunk, _| {
                Box::pin(async move { ClientMapper.migrate_batch(chunk, ctx).await })
            })
            .await?;
        info!("  ✓ {} clients migrated", summary.clients.migrated);

        info!("Step 6: Migrating pets...");
        summary.pets = BatchProcessor::new(migration.pet_batch_size)
            .process(&clean.pets, &mut ctx, |ctx, chunk, _| {
                Box::pin(async move { PetMapper.migrate_batch(chunk, ctx).await })
            })
            .await?;
        info!("  ✓ {} pets migrated", summary.pets.migrated);

        info!("Step 7: Migrating consultations (this may take several minutes)...");
        summary.consultations = BatchProcessor::new(migration.consultation_batch_size)
            .process(&clean.consultations, &mut ctx, |ctx, chunk, _| {
                Box::pin(async move { ConsultationMapper.migrate_batch(chunk, ctx).await })
            })
            .await?;
        info!("  ✓ {} consultations migrated", summary.consultations.migrated);

        Ok(())
    }

    fn validate(&self, clean: &CleanData) -> ValidationReport {
        let validator = DataValidator::new(self.config.migration.max_anomalies);
        let report = validator.validate(clean);

        info!("Validation results:");
        info!("  - Doctors: {} valid", report.doctors);
        info!("  - Clients: {} valid", report.clients);
        info!("  - Pets: {} valid", report.pets);
        info!("  - Consultations: {} valid", report.consultations);

        let total = report.total_anomalies();
        if total > 0 {
            warn!("Found {total} validation warnings");
            let shown = self.config.migration.reported_anomalies;
            for anomaly in report.anomalies.iter().take(shown) {
                warn!("  - {anomaly}");
            }
            if total > shown {
                warn!("  ... and {} more warnings", total - shown);
            }
        }

        report
    }

    fn log_statistics(&self, declared: &DeclaredCounts) {
        info!("DATA TO MIGRATE:");
        info!("  Doctors:        {} records", declared.doctors);
        info!("  Clients:        {} records", declared.clients);
        info!("  Pets:           {} records", declared.pets);
        info!("  Consultations:  {} records", declared.consultations);
        info!("  Species types:  {} records", declared.species_types);
        info!("  Breeds:         {} records", declared.breeds);
        if declared.accounts > 0 {
            info!("  Account statements present but not migrated: {}", declared.accounts);
        }
    }

    async fn post_validate(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        declared: &DeclaredCounts,
    ) -> Result<(), MigrationError> {
        let conn: &mut SqliteConnection = &mut *tx;

        info!("FINAL VALIDATION:");
        let checks = [
            ("doctors", TargetTable::Doctors, declared.doctors),
            ("clients", TargetTable::Clients, declared.clients),
            ("pets", TargetTable::Pets, declared.pets),
            ("consultations", TargetTable::Consultations, declared.consultations),
        ];
        for (label, table, expected) in checks {
            let actual = count_rows(&mut *conn, table).await?;
            let percentage = if expected > 0 {
                actual as f64 / expected as f64 * 100.0
            } else {
                100.0
            };
            let marker = if actual == expected { "✓" } else { "⚠" };
            info!("  {marker} {label}: {actual}/{expected} ({percentage:.1}%)");
        }
        Ok(())
    }

    fn log_summary(&self, summary: &MigrationSummary) {
        info!("RUN SUMMARY (migrated/skipped/errors):");
        let entries = [
            ("species types", summary.species_types),
            ("breeds", summary.breeds),
            ("doctors", summary.doctors),
            ("clients", summary.clients),
            ("pets", summary.pets),
            ("consultations", summary.consultations),
        ];
        for (label, stats) in entries {
            info!(
                "  {label}: {}/{}/{}",
                stats.migrated, stats.skipped, stats.errors
            );
        }
    }
}
