use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::errors::MigrationError;
use crate::legacy::cleaner::CleanConsultation;
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::Namespace;
use crate::migrate::mappers::{tally, EntityMapper, MigrationContext, RecordOutcome};
use crate::models::{Consultation, ConsultationStatus, ConsultationType};
use crate::utils::dates;

pub struct ConsultationMapper;

#[async_trait]
impl EntityMapper for ConsultationMapper {
    type Record = CleanConsultation;

    async fn migrate_batch(
        &self,
        records: &[CleanConsultation],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_one(record, ctx).await;
            let number = record.number.unwrap_or_default();
            tally(&mut stats, outcome, &format!("consultation {number}"))?;
        }
        Ok(stats)
    }
}

impl ConsultationMapper {
    async fn migrate_one(
        &self,
        record: &CleanConsultation,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        let Some(number) = record.number else {
            warn!("Consultation without visit number, skipping");
            return Ok(RecordOutcome::Skipped);
        };

        let Some(ficha) = record.ficha else {
            warn!("Consultation {}: no pet ficha", number);
            return Ok(RecordOutcome::Skipped);
        };
        let Some(pet_id) = ctx.ids.get(Namespace::Pets, &ficha.to_string()) else {
            warn!("Consultation {}: pet not found (ficha: {})", number, ficha);
            return Ok(RecordOutcome::Skipped);
        };

        let Some(client_id) = ctx.ids.get(Namespace::Clients, &record.client_rut) else {
            warn!(
                "Consultation {}: client not found (RUT: {})",
                number, record.client_rut
            );
            return Ok(RecordOutcome::Skipped);
        };

        let doctor_code = record.doctor_code.as_deref().unwrap_or_default();
        let Some(doctor_id) = ctx.ids.get(Namespace::Doctors, doctor_code) else {
            warn!(
                "Consultation {}: doctor not found (code: {})",
                number, doctor_code
            );
            return Ok(RecordOutcome::Skipped);
        };

        let Some(date) = dates::parse_optional(record.date.as_deref()) else {
            warn!(
                "Consultation {}: missing or unparsable date ({:?})",
                number, record.date
            );
            return Ok(RecordOutcome::Skipped);
        };

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM consultations WHERE consultation_number = ?")
                .bind(number)
                .fetch_optional(&mut *ctx.tx)
                .await?;
        if existing.is_some() {
            return Ok(RecordOutcome::Migrated);
        }

        let consultation_type = type_from_code(record.type_code.as_deref());
        let (balance, status) = derive_balance(record.amount, record.paid);
        let next_visit_date = dates::parse_optional(record.next_visit_date.as_deref());

        let consultation = Consultation {
            id: Uuid::new_v4(),
            consultation_number: number,
            pet_id,
            client_id,
            doctor_id,
            date,
            consultation_type,
            reason: None,
            symptoms: record.symptoms.clone(),
            diagnosis: record.diagnosis.clone(),
            treatment: record.treatment.clone(),
            exams: None,
            next_visit_date,
            // The next visit inherits this visit's type when one is scheduled
            next_visit_type: next_visit_date.map(|_| consultation_type),
            next_treatment: record.next_treatment.clone(),
            amount: record.amount,
            paid: record.paid,
            balance,
            status,
        };

        sqlx::query(
            "INSERT INTO consultations (id, consultation_number, pet_id, client_id, doctor_id,
                date, type, reason, symptoms, diagnosis, treatment, exams, next_visit_date,
                next_visit_type, next_treatment, amount, paid, balance, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(consultation.id.to_string())
        .bind(consultation.consultation_number)
        .bind(consultation.pet_id.to_string())
        .bind(consultation.client_id.to_string())
        .bind(consultation.doctor_id.to_string())
        .bind(consultation.date)
        .bind(consultation.consultation_type.as_str())
        .bind(&consultation.reason)
        .bind(&consultation.symptoms)
        .bind(&consultation.diagnosis)
        .bind(&consultation.treatment)
        .bind(&consultation.exams)
        .bind(consultation.next_visit_date)
        .bind(consultation.next_visit_type.map(|t| t.as_str()))
        .bind(&consultation.next_treatment)
        .bind(consultation.amount)
        .bind(consultation.paid)
        .bind(consultation.balance)
        .bind(consultation.status.as_str())
        .execute(&mut *ctx.tx)
        .await?;

        Ok(RecordOutcome::Migrated)
    }
}

/// Legacy type code 1 is a curative visit, everything else counts as
/// prophylactic.
fn type_from_code(code: Option<&str>) -> ConsultationType {
    match code {
        Some("1") => ConsultationType::Curative,
        _ => ConsultationType::Prophylactic,
    }
}

fn derive_balance(amount: f64, paid: f64) -> (f64, ConsultationStatus) {
    let balance = amount - paid;
    let status = if balance > 0.0 {
        ConsultationStatus::Active
    } else {
        ConsultationStatus::Completed
    };
    (balance, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_paid_consultation_is_completed() {
        let (balance, status) = derive_balance(50000.0, 50000.0);
        assert_eq!(balance, 0.0);
        assert_eq!(status, ConsultationStatus::Completed);
    }

    #[test]
    fn outstanding_balance_keeps_consultation_active() {
        let (balance, status) = derive_balance(50000.0, 20000.0);
        assert_eq!(balance, 30000.0);
        assert_eq!(status, ConsultationStatus::Active);
    }

    #[test]
    fn overpayment_counts_as_completed() {
        let (balance, status) = derive_balance(30000.0, 40000.0);
        assert!(balance < 0.0);
        assert_eq!(status, ConsultationStatus::Completed);
    }

    #[test]
    fn type_code_one_is_curative() {
        assert_eq!(type_from_code(Some("1")), ConsultationType::Curative);
        assert_eq!(type_from_code(Some("2")), ConsultationType::Prophylactic);
        assert_eq!(type_from_code(None), ConsultationType::Prophylactic);
    }
}
