//! Target entity models for the VetFlow schema
//!
//! All identifiers are freshly generated UUIDs; legacy codes never appear
//! in referential fields. Foreign keys are resolved through the id mapping
//! directory during migration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpeciesType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Breed {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub species_type_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub rut: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub commune: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub client_type: String,
    pub discount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pet {
    pub id: Uuid,
    /// Legacy sequential record number, kept as the natural key
    pub ficha: i64,
    pub name: String,
    pub client_id: Uuid,
    pub species_type_id: Uuid,
    pub breed_id: Option<Uuid>,
    pub sex: PetSex,
    pub size: String,
    pub color: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_alive: bool,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Consultation {
    pub id: Uuid,
    pub consultation_number: i64,
    pub pet_id: Uuid,
    pub client_id: Uuid,
    pub doctor_id: Uuid,
    pub date: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub exams: Option<String>,
    pub next_visit_date: Option<DateTime<Utc>>,
    pub next_visit_type: Option<ConsultationType>,
    pub next_treatment: Option<String>,
    pub amount: f64,
    pub paid: f64,
    pub balance: f64,
    pub status: ConsultationStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PetSex {
    M,
    F,
}

impl PetSex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum ConsultationType {
    Curative,
    Prophylactic,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Curative => "Curative",
            Self::Prophylactic => "Prophylactic",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum ConsultationStatus {
    Active,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}
