use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::MigrationError;
use crate::legacy::cleaner::CleanDoctor;
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::Namespace;
use crate::migrate::mappers::{tally, EntityMapper, MigrationContext, RecordOutcome};
use crate::models::Doctor;

pub struct DoctorMapper;

#[async_trait]
impl EntityMapper for DoctorMapper {
    type Record = CleanDoctor;

    async fn migrate_batch(
        &self,
        records: &[CleanDoctor],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_one(record, ctx).await;
            tally(&mut stats, outcome, &format!("doctor {}", record.name))?;
        }
        Ok(stats)
    }
}

impl DoctorMapper {
    async fn migrate_one(
        &self,
        record: &CleanDoctor,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        if record.name.is_empty() {
            warn!(
                "Doctor without name, code: {}",
                record.code.as_deref().unwrap_or("?")
            );
            return Ok(RecordOutcome::Skipped);
        }

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM doctors WHERE name = ?")
            .bind(&record.name)
            .fetch_optional(&mut *ctx.tx)
            .await?;

        if let Some(id) = existing {
            let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            if let Some(code) = &record.code {
                ctx.ids.insert(Namespace::Doctors, code, id)?;
            }
            return Ok(RecordOutcome::Migrated);
        }

        let doctor = Doctor {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            specialty: None,
            license_number: record.license_number.clone(),
            phone: None,
            email: None,
            is_active: true,
        };
        sqlx::query(
            "INSERT INTO doctors (id, name, specialty, license_number, phone, email, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(doctor.id.to_string())
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .bind(&doctor.license_number)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(doctor.is_active)
        .execute(&mut *ctx.tx)
        .await?;

        match &record.code {
            Some(code) => {
                ctx.ids.insert(Namespace::Doctors, code, doctor.id)?;
                info!("  ✓ Doctor: {} ({} → {})", doctor.name, code, doctor.id);
            }
            None => warn!(
                "Doctor {} has no legacy code; consultations cannot reference it",
                record.name
            ),
        }

        Ok(RecordOutcome::Migrated)
    }
}
