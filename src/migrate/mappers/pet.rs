use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::errors::MigrationError;
use crate::legacy::cleaner::CleanPet;
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::Namespace;
use crate::migrate::mappers::{tally, EntityMapper, MigrationContext, RecordOutcome};
use crate::models::Pet;
use crate::utils::dates;

pub struct PetMapper;

#[async_trait]
impl EntityMapper for PetMapper {
    type Record = CleanPet;

    async fn migrate_batch(
        &self,
        records: &[CleanPet],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_one(record, ctx).await;
            tally(&mut stats, outcome, &format!("pet {}", record.name))?;
        }
        Ok(stats)
    }
}

impl PetMapper {
    async fn migrate_one(
        &self,
        record: &CleanPet,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        let Some(ficha) = record.ficha else {
            warn!("Pet {} has no ficha number, skipping", record.name);
            return Ok(RecordOutcome::Skipped);
        };

        if record.name.is_empty() {
            warn!("Pet without name, ficha: {}", ficha);
            return Ok(RecordOutcome::Skipped);
        }

        // Owner and species are mandatory references, but an unresolvable
        // one only skips this record: the legacy source has no enforced
        // integrity and orphan rows are expected.
        let Some(client_id) = ctx.ids.get(Namespace::Clients, &record.owner_rut) else {
            warn!(
                "Pet {}: client not found (RUT: {})",
                record.name, record.owner_rut
            );
            return Ok(RecordOutcome::Skipped);
        };

        let species_code = record.species_code.as_deref().unwrap_or_default();
        let Some(species_type_id) = ctx.ids.get(Namespace::Species, species_code) else {
            warn!(
                "Pet {}: species type not found ({})",
                record.name, species_code
            );
            return Ok(RecordOutcome::Skipped);
        };

        // Breed is optional, a miss is not critical
        let breed_id = record
            .breed_code
            .as_deref()
            .and_then(|code| ctx.ids.get(Namespace::Breeds, code));

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM pets WHERE ficha = ?")
            .bind(ficha)
            .fetch_optional(&mut *ctx.tx)
            .await?;

        if let Some(id) = existing {
            let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            ctx.ids.insert(Namespace::Pets, &ficha.to_string(), id)?;
            return Ok(RecordOutcome::Migrated);
        }

        // Status code 0 means alive; absent status degrades to alive
        let is_alive = matches!(record.status_code.as_deref(), Some("0") | None);
        let pet = Pet {
            id: Uuid::new_v4(),
            ficha,
            name: record.name.clone(),
            client_id,
            species_type_id,
            breed_id,
            sex: record.sex,
            size: record.size.clone(),
            color: Some(record.color.clone()),
            birth_date: approximate_birth_date(record.age_years, record.age_months),
            is_alive,
            death_date: if is_alive {
                None
            } else {
                dates::parse_optional(record.death_date.as_deref()).map(|dt| dt.date_naive())
            },
            photo_url: None,
        };

        sqlx::query(
            "INSERT INTO pets (id, ficha, name, client_id, species_type_id, breed_id, sex, size,
                               color, birth_date, is_alive, death_date, photo_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pet.id.to_string())
        .bind(pet.ficha)
        .bind(&pet.name)
        .bind(pet.client_id.to_string())
        .bind(pet.species_type_id.to_string())
        .bind(pet.breed_id.map(|b| b.to_string()))
        .bind(pet.sex.as_str())
        .bind(&pet.size)
        .bind(&pet.color)
        .bind(pet.birth_date)
        .bind(pet.is_alive)
        .bind(pet.death_date)
        .bind(&pet.photo_url)
        .execute(&mut *ctx.tx)
        .await?;

        ctx.ids.insert(Namespace::Pets, &ficha.to_string(), pet.id)?;
        Ok(RecordOutcome::Migrated)
    }
}

/// Approximate birth date from the legacy age-in-years/months fields.
/// Unknown age (both zero) and any date landing in the future are treated
/// as unknown rather than stored.
fn approximate_birth_date(years: i64, months: i64) -> Option<NaiveDate> {
    if years <= 0 && months <= 0 {
        return None;
    }

    let today = Utc::now().date_naive();
    let total_months = u32::try_from(years * 12 + months).ok()?;
    let birth = today.checked_sub_months(Months::new(total_months))?;

    (birth <= today).then_some(birth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn unknown_age_has_no_birth_date() {
        assert_eq!(approximate_birth_date(0, 0), None);
    }

    #[test]
    fn age_is_subtracted_from_today() {
        let birth = approximate_birth_date(3, 6).unwrap();
        let today = Utc::now().date_naive();
        let elapsed_months =
            (today.year() - birth.year()) * 12 + today.month() as i32 - birth.month() as i32;
        assert_eq!(elapsed_months, 42);
        assert!(birth <= today);
    }

    #[test]
    fn months_only_age_works() {
        let birth = approximate_birth_date(0, 8).unwrap();
        assert!(birth < Utc::now().date_naive());
    }
}
