//! Legacy KeySoft export loading and raw record extraction
//!
//! The export is a single JSON document with one `{ rowCount, columns,
//! data }` table per legacy entity. Rows are untyped bags of fields whose
//! column names sometimes arrive mojibake-mangled (the source was dumped
//! through a Windows-1252 round trip, so `Dueños` may appear as `DueÃ±os`
//! or with replacement characters). Extraction therefore tolerates key
//! variants by suffix matching and coerces string-or-number values instead
//! of failing.

pub mod cleaner;
pub mod validator;

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::errors::MigrationError;

/// One legacy table as exported: declared row count, column names, and the
/// raw rows themselves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTable {
    #[serde(rename = "rowCount", default)]
    pub row_count: i64,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// The full export document with canonicalized table keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyExport {
    #[serde(rename = "Doctores", default)]
    pub doctors: LegacyTable,
    #[serde(rename = "Dueños", default)]
    pub owners: LegacyTable,
    /// Pets; the legacy system called the pet table "Especies"
    #[serde(rename = "Especies", default)]
    pub pets: LegacyTable,
    /// Treatment/consultation history
    #[serde(rename = "Tratamientos", default)]
    pub consultations: LegacyTable,
    #[serde(rename = "TipoEspecie", default)]
    pub species_types: LegacyTable,
    #[serde(rename = "Razas", default)]
    pub breeds: LegacyTable,
    /// Account statements; carried through load but never migrated
    #[serde(rename = "EstCuenta", default)]
    pub accounts: LegacyTable,
}

impl LegacyExport {
    /// Load the export from disk, canonicalizing the mis-encoded owners
    /// key before deserialization.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        if !path.exists() {
            return Err(MigrationError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let size = std::fs::metadata(path)?.len();
        info!(
            "Reading legacy export: {} ({:.2} MB)",
            path.display(),
            size as f64 / 1024.0 / 1024.0
        );

        let contents = std::fs::read_to_string(path)?;
        let mut document: Map<String, Value> = serde_json::from_str(&contents)?;

        // The owners table key holds an ñ and is the one key reliably
        // mangled in real exports ("DueÃ±os", "Due�os", ...).
        let owners_key = document
            .keys()
            .find(|k| k.starts_with("Due") && k.ends_with("os"))
            .cloned();
        if let Some(key) = owners_key {
            if key != "Dueños" {
                let table = document.remove(&key).unwrap_or(Value::Null);
                document.insert("Dueños".to_string(), table);
            }
        }

        Ok(serde_json::from_value(Value::Object(document))?)
    }
}

/// Look up a row field by canonical name, falling back to any key that
/// ends with the given suffix (covers mojibake-mangled column names).
fn field<'a>(row: &'a Map<String, Value>, canonical: &str, suffix: &str) -> Option<&'a Value> {
    if let Some(v) = row.get(canonical) {
        return Some(v);
    }
    row.iter()
        .find(|(k, _)| k.ends_with(suffix))
        .map(|(_, v)| v)
}

fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

fn row(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

#[derive(Debug, Clone, Default)]
pub struct RawDoctor {
    pub code: Option<String>,
    pub name: Option<String>,
    pub license_number: Option<String>,
}

impl RawDoctor {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            code: as_string(field(row, "DoctCodi", "Codi")),
            name: as_string(field(row, "DoctNomb", "Nomb")),
            license_number: as_string(field(row, "DoctNcmv", "Ncmv")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawClient {
    pub rut: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub commune: Option<String>,
    pub phone: Option<String>,
}

impl RawClient {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            rut: as_string(field(row, "DueñRutd", "Rutd")),
            name: as_string(field(row, "DueñNomb", "Nomb")),
            address: as_string(field(row, "DueñDire", "Dire")),
            commune: as_string(field(row, "DueñComu", "Comu")),
            phone: as_string(field(row, "DueñTele", "Tele")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawPet {
    pub ficha: Option<i64>,
    pub name: Option<String>,
    pub owner_rut: Option<String>,
    pub species_code: Option<String>,
    pub breed_code: Option<String>,
    pub sex: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub age_years: Option<i64>,
    pub age_months: Option<i64>,
    pub status_code: Option<String>,
    pub death_date: Option<String>,
}

impl RawPet {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            ficha: as_i64(field(row, "EspeNrfi", "Nrfi")),
            name: as_string(field(row, "EspeNoes", "Noes")),
            owner_rut: as_string(field(row, "EspeRutd", "Rutd")),
            species_code: as_string(field(row, "EspeTies", "Ties")),
            breed_code: as_string(field(row, "EspeRaza", "Raza")),
            sex: as_string(field(row, "EspeSexo", "Sexo")),
            size: as_string(field(row, "EspeTama", "Tama")),
            color: as_string(field(row, "EspeColo", "Colo")),
            // "EspeAños" is the usual mojibake victim in pet rows
            age_years: as_i64(field(row, "EspeAños", "os")),
            age_months: as_i64(field(row, "EspeMese", "Mese")),
            status_code: as_string(field(row, "EspeEsta", "Esta")),
            death_date: as_string(field(row, "EspeFede", "Fede")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawConsultation {
    pub number: Option<i64>,
    pub ficha: Option<i64>,
    pub client_rut: Option<String>,
    pub doctor_code: Option<String>,
    pub date: Option<String>,
    pub type_code: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub next_visit_date: Option<String>,
    pub next_treatment: Option<String>,
    pub amount: Option<f64>,
    pub paid: Option<f64>,
}

impl RawConsultation {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            number: as_i64(field(row, "TratNrvi", "Nrvi")),
            ficha: as_i64(field(row, "TratNrfi", "Nrfi")),
            client_rut: as_string(field(row, "TratRutd", "Rutd")),
            doctor_code: as_string(field(row, "TratMedi", "Medi")),
            date: as_string(field(row, "TratFevi", "Fevi")),
            type_code: as_string(field(row, "TratTipo", "Tipo")),
            symptoms: as_string(field(row, "TratSint", "Sint")),
            diagnosis: as_string(field(row, "TratDiag", "Diag")),
            treatment: as_string(field(row, "TratTrat", "Trat")),
            next_visit_date: as_string(field(row, "TratPrvi", "Prvi")),
            next_treatment: as_string(field(row, "TratPrtr", "Prtr")),
            amount: as_f64(field(row, "TratValo", "Valo")),
            paid: as_f64(field(row, "TratVapa", "Vapa")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawSpeciesType {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl RawSpeciesType {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            code: as_string(field(row, "TiesCodi", "Codi")),
            name: as_string(field(row, "TiesDesc", "Desc")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawBreed {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl RawBreed {
    pub fn from_row(value: &Value) -> Self {
        let Some(row) = row(value) else {
            return Self::default();
        };
        Self {
            code: as_string(field(row, "RazaCodi", "Codi")),
            name: as_string(field(row, "RazaDesc", "Desc")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_client_fields_from_mangled_columns() {
        let raw = RawClient::from_row(&json!({
            "DueÃ±Rutd": "12.345.678-9",
            "DueÃ±Nomb": "maria lopez",
            "DueÃ±Tele": "(56) 9-1234",
        }));
        assert_eq!(raw.rut.as_deref(), Some("12.345.678-9"));
        assert_eq!(raw.name.as_deref(), Some("maria lopez"));
        assert_eq!(raw.phone.as_deref(), Some("(56) 9-1234"));
        assert!(raw.address.is_none());
    }

    #[test]
    fn coerces_numeric_strings_and_numbers() {
        let raw = RawConsultation::from_row(&json!({
            "TratNrvi": "42",
            "TratValo": 50000,
            "TratVapa": "20000",
        }));
        assert_eq!(raw.number, Some(42));
        assert_eq!(raw.amount, Some(50000.0));
        assert_eq!(raw.paid, Some(20000.0));
    }

    #[test]
    fn non_object_row_degrades_to_empty_record() {
        let raw = RawPet::from_row(&json!("not a row"));
        assert!(raw.name.is_none());
        assert!(raw.ficha.is_none());
    }

    #[test]
    fn pet_age_survives_mangled_anos_column() {
        let raw = RawPet::from_row(&json!({
            "EspeNoes": "FIRULAIS",
            "EspeAÃ±os": 3,
            "EspeMese": "6",
        }));
        assert_eq!(raw.age_years, Some(3));
        assert_eq!(raw.age_months, Some(6));
    }
}
