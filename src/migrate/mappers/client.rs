use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::errors::MigrationError;
use crate::legacy::cleaner::CleanClient;
use crate::migrate::batch::BatchStats;
use crate::migrate::id_mapping::Namespace;
use crate::migrate::mappers::{tally, EntityMapper, MigrationContext, RecordOutcome};
use crate::models::Client;

pub struct ClientMapper;

#[async_trait]
impl EntityMapper for ClientMapper {
    type Record = CleanClient;

    async fn migrate_batch(
        &self,
        records: &[CleanClient],
        ctx: &mut MigrationContext<'_>,
    ) -> Result<BatchStats, MigrationError> {
        let mut stats = BatchStats::default();
        for record in records {
            let outcome = self.migrate_one(record, ctx).await;
            tally(&mut stats, outcome, &format!("client RUT {}", record.rut))?;
        }
        Ok(stats)
    }
}

impl ClientMapper {
    async fn migrate_one(
        &self,
        record: &CleanClient,
        ctx: &mut MigrationContext<'_>,
    ) -> Result<RecordOutcome, MigrationError> {
        if record.name.is_empty() {
            warn!("Client without name, RUT: {}", record.rut);
            return Ok(RecordOutcome::Skipped);
        }

        // RUT is the natural key: a repeated run against a partially
        // populated target re-maps instead of duplicating.
        if !record.rut.is_empty() {
            let existing: Option<String> =
                sqlx::query_scalar("SELECT id FROM clients WHERE rut = ?")
                    .bind(&record.rut)
                    .fetch_optional(&mut *ctx.tx)
                    .await?;

            if let Some(id) = existing {
                let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                ctx.ids.insert(Namespace::Clients, &record.rut, id)?;
                return Ok(RecordOutcome::Migrated);
            }
        }

        let client = Client {
            id: Uuid::new_v4(),
            rut: (!record.rut.is_empty()).then(|| record.rut.clone()),
            name: record.name.clone(),
            address: record.address.clone(),
            commune: record.commune.clone(),
            city: None,
            phone: record.phone.clone(),
            email: None,
            client_type: "Normal".to_string(),
            discount: 0,
        };
        sqlx::query(
            "INSERT INTO clients (id, rut, name, address, commune, city, phone, email, client_type, discount)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(client.id.to_string())
        .bind(&client.rut)
        .bind(&client.name)
        .bind(&client.address)
        .bind(&client.commune)
        .bind(&client.city)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.client_type)
        .bind(client.discount)
        .execute(&mut *ctx.tx)
        .await?;

        if !record.rut.is_empty() {
            ctx.ids.insert(Namespace::Clients, &record.rut, client.id)?;
        } else {
            warn!("Client {} has no RUT; pets cannot reference it", client.name);
        }

        Ok(RecordOutcome::Migrated)
    }
}
