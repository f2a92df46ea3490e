//! Species type and breed migration
//!
//! Catalogs go first: every later entity resolves species/breed references
//! through the mappings written here. The legacy breed table carries no
//! species column, so breeds fall back to the configured canine species
//! unless the breed name appears in the feline lookup list. A missing base
//! species catalog is a mandatory dependency and fails the run.

use tracing::warn;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::errors::MigrationError;
use crate::legacy::cleaner::{CleanBreed, CleanSpeciesType};
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::Namespace;
use crate::migrate::mappers::{tally, MigrationContext, RecordOutcome};
use crate::models::{Breed, SpeciesType};

pub struct CatalogMapper {
    config: CatalogConfig,
}

impl CatalogMapper {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    pub async fn migrate_species_types(
        &self,
        records: &[CleanSpeciesType],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_species_type(record, ctx).await;
            tally(&mut stats, outcome, &format!("species type {}", record.name))?;
        }
        Ok(stats)
    }

    async fn migrate_species_type(
        &self,
        record: &CleanSpeciesType,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        if record.name.is_empty() || record.code.is_empty() {
            warn!("Species type without name or code, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        // Idempotent re-run: reuse an existing row with the same name
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM species_types WHERE name = ?")
                .bind(&record.name)
                .fetch_optional(&mut *ctx.tx)
                .await?;

        if let Some(id) = existing {
            let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            ctx.ids.insert(Namespace::Species, &record.code, id)?;
            return Ok(RecordOutcome::Migrated);
        }

        let species = SpeciesType {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            description: None,
        };
        sqlx::query("INSERT INTO species_types (id, name, description) VALUES (?, ?, ?)")
            .bind(species.id.to_string())
            .bind(&species.name)
            .bind(&species.description)
            .execute(&mut *ctx.tx)
            .await?;

        ctx.ids.insert(Namespace::Species, &record.code, species.id)?;
        Ok(RecordOutcome::Migrated)
    }

    pub async fn migrate_breeds(
        &self,
        records: &[CleanBreed],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_breed(record, ctx).await;
            tally(&mut stats, outcome, &format!("breed {}", record.name))?;
        }
        Ok(stats)
    }

    async fn migrate_breed(
        &self,
        record: &CleanBreed,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        if record.name.is_empty() || record.code.is_empty() {
            warn!("Breed without name or code, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        // The base species catalog is a hard dependency; a miss here
        // aborts the run instead of producing orphan breeds.
        let species_code = if self.config.feline_breeds.iter().any(|b| b == &record.name) {
            &self.config.feline_species_code
        } else {
            &self.config.default_species_code
        };
        let species_type_id = ctx.ids.require(Namespace::Species, species_code)?;

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM breeds WHERE name = ?")
            .bind(&record.name)
            .fetch_optional(&mut *ctx.tx)
            .await?;

        if let Some(id) = existing {
            let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            ctx.ids.insert(Namespace::Breeds, &record.code, id)?;
            return Ok(RecordOutcome::Migrated);
        }

        let breed = Breed {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            description: None,
            species_type_id,
        };
        sqlx::query(
            "INSERT INTO breeds (id, name, description, species_type_id) VALUES (?, ?, ?, ?)",
        )
        .bind(breed.id.to_string())
        .bind(&breed.name)
        .bind(&breed.description)
        .bind(breed.species_type_id.to_string())
        .execute(&mut *ctx.tx)
        .await?;

        ctx.ids.insert(Namespace::Breeds, &record.code, breed.id)?;
        Ok(RecordOutcome::Migrated)
    }
}
