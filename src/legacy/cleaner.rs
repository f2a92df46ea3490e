//! Pure normalization of raw legacy records
//!
//! The cleaner is a 1:1 transform: no record is dropped or merged here.
//! Malformed individual fields degrade to defaults instead of aborting;
//! required-field policy is left to the validator and the mappers.

use crate::legacy::{
    LegacyExport, RawBreed, RawClient, RawConsultation, RawDoctor, RawPet, RawSpeciesType,
};
use crate::models::PetSex;

/// Mojibake repair table: UTF-8 bytes of accented characters re-decoded
/// through Windows-1252. Every entry is a two-character sequence starting
/// with U+00C3, so one ordered pass is enough and re-cleaning clean text
/// is a no-op.
const ENCODING_REPAIRS: &[(&str, &str)] = &[
    ("\u{c3}\u{2018}", "Ñ"), // Ã‘
    ("\u{c3}\u{b1}", "ñ"),   // Ã±
    ("\u{c3}\u{a1}", "á"),   // Ã¡
    ("\u{c3}\u{a9}", "é"),   // Ã©
    ("\u{c3}\u{ad}", "í"),   // Ã followed by a soft hyphen
    ("\u{c3}\u{b3}", "ó"),   // Ã³
    ("\u{c3}\u{ba}", "ú"),   // Ãº
    ("\u{c3}\u{81}", "Á"),   // Ã followed by C1 control 0x81
    ("\u{c3}\u{2030}", "É"), // Ã‰
    ("\u{c3}\u{8d}", "Í"),   // Ã followed by C1 control 0x8D
    ("\u{c3}\u{201c}", "Ó"), // Ã“
    ("\u{c3}\u{161}", "Ú"),  // Ãš
];

#[derive(Debug, Clone, Default)]
pub struct CleanDoctor {
    pub code: Option<String>,
    pub name: String,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanClient {
    pub rut: String,
    pub name: String,
    pub address: Option<String>,
    pub commune: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CleanPet {
    pub ficha: Option<i64>,
    pub name: String,
    pub owner_rut: String,
    pub species_code: Option<String>,
    pub breed_code: Option<String>,
    pub sex: PetSex,
    pub size: String,
    pub color: String,
    pub age_years: i64,
    pub age_months: i64,
    pub status_code: Option<String>,
    pub death_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanConsultation {
    pub number: Option<i64>,
    pub ficha: Option<i64>,
    pub client_rut: String,
    pub doctor_code: Option<String>,
    pub date: Option<String>,
    pub type_code: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub next_visit_date: Option<String>,
    pub next_treatment: Option<String>,
    pub amount: f64,
    pub paid: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CleanSpeciesType {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CleanBreed {
    pub code: String,
    pub name: String,
}

/// Declared row counts from the export envelope, kept for progress
/// reporting and post-migration validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredCounts {
    pub doctors: i64,
    pub clients: i64,
    pub pets: i64,
    pub consultations: i64,
    pub species_types: i64,
    pub breeds: i64,
    pub accounts: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CleanData {
    pub doctors: Vec<CleanDoctor>,
    pub clients: Vec<CleanClient>,
    pub pets: Vec<CleanPet>,
    pub consultations: Vec<CleanConsultation>,
    pub species_types: Vec<CleanSpeciesType>,
    pub breeds: Vec<CleanBreed>,
    pub declared: DeclaredCounts,
}

pub struct DataCleaner;

impl DataCleaner {
    pub fn clean_all(export: &LegacyExport) -> CleanData {
        CleanData {
            doctors: export
                .doctors
                .data
                .iter()
                .map(|v| Self::clean_doctor(&RawDoctor::from_row(v)))
                .collect(),
            clients: export
                .owners
                .data
                .iter()
                .map(|v| Self::clean_client(&RawClient::from_row(v)))
                .collect(),
            pets: export
                .pets
                .data
                .iter()
                .map(|v| Self::clean_pet(&RawPet::from_row(v)))
                .collect(),
            consultations: export
                .consultations
                .data
                .iter()
                .map(|v| Self::clean_consultation(&RawConsultation::from_row(v)))
                .collect(),
            species_types: export
                .species_types
                .data
                .iter()
                .map(|v| Self::clean_species_type(&RawSpeciesType::from_row(v)))
                .collect(),
            breeds: export
                .breeds
                .data
                .iter()
                .map(|v| Self::clean_breed(&RawBreed::from_row(v)))
                .collect(),
            declared: DeclaredCounts {
                doctors: export.doctors.row_count,
                clients: export.owners.row_count,
                pets: export.pets.row_count,
                consultations: export.consultations.row_count,
                species_types: export.species_types.row_count,
                breeds: export.breeds.row_count,
                accounts: export.accounts.row_count,
            },
        }
    }

    fn clean_doctor(raw: &RawDoctor) -> CleanDoctor {
        CleanDoctor {
            code: raw.code.as_deref().map(|c| c.trim().to_string()),
            name: Self::clean_name(raw.name.as_deref()),
            license_number: raw
                .license_number
                .as_deref()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        }
    }

    fn clean_client(raw: &RawClient) -> CleanClient {
        CleanClient {
            rut: Self::clean_rut(raw.rut.as_deref().unwrap_or_default()),
            name: Self::clean_name(raw.name.as_deref()),
            address: raw
                .address
                .as_deref()
                .map(Self::fix_encoding)
                .filter(|a| !a.trim().is_empty()),
            commune: raw
                .commune
                .as_deref()
                .map(Self::fix_encoding)
                .filter(|c| !c.trim().is_empty()),
            phone: {
                let phone = Self::clean_phone(raw.phone.as_deref().unwrap_or_default());
                (!phone.is_empty()).then_some(phone)
            },
        }
    }

    fn clean_pet(raw: &RawPet) -> CleanPet {
        CleanPet {
            ficha: raw.ficha,
            name: Self::clean_name(raw.name.as_deref()),
            owner_rut: Self::clean_rut(raw.owner_rut.as_deref().unwrap_or_default()),
            species_code: raw.species_code.as_deref().map(|c| c.trim().to_string()),
            breed_code: raw.breed_code.as_deref().map(|c| c.trim().to_string()),
            // Legacy sex code H (hembra) maps to F; anything else is M
            sex: match raw.sex.as_deref() {
                Some("H") => PetSex::F,
                _ => PetSex::M,
            },
            size: raw
                .size
                .as_deref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "M".to_string()),
            color: raw
                .color
                .as_deref()
                .map(|c| Self::fix_encoding(c).trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "S/C".to_string()),
            age_years: raw.age_years.unwrap_or(0).max(0),
            age_months: raw.age_months.unwrap_or(0).max(0),
            status_code: raw.status_code.as_deref().map(|s| s.trim().to_string()),
            death_date: raw.death_date.clone(),
        }
    }

    fn clean_consultation(raw: &RawConsultation) -> CleanConsultation {
        CleanConsultation {
            number: raw.number,
            ficha: raw.ficha,
            client_rut: Self::clean_rut(raw.client_rut.as_deref().unwrap_or_default()),
            doctor_code: raw.doctor_code.as_deref().map(|c| c.trim().to_string()),
            date: raw.date.clone(),
            type_code: raw.type_code.as_deref().map(|t| t.trim().to_string()),
            symptoms: Self::clean_free_text(raw.symptoms.as_deref()),
            diagnosis: Self::clean_free_text(raw.diagnosis.as_deref()),
            treatment: Self::clean_free_text(raw.treatment.as_deref()),
            next_visit_date: raw.next_visit_date.clone(),
            next_treatment: Self::clean_free_text(raw.next_treatment.as_deref()),
            amount: raw.amount.unwrap_or(0.0),
            paid: raw.paid.unwrap_or(0.0),
        }
    }

    fn clean_species_type(raw: &RawSpeciesType) -> CleanSpeciesType {
        CleanSpeciesType {
            code: raw.code.as_deref().unwrap_or_default().trim().to_string(),
            name: Self::fix_encoding(raw.name.as_deref().unwrap_or_default())
                .trim()
                .to_string(),
        }
    }

    fn clean_breed(raw: &RawBreed) -> CleanBreed {
        CleanBreed {
            code: raw.code.as_deref().unwrap_or_default().trim().to_string(),
            name: Self::clean_name(raw.name.as_deref()),
        }
    }

    /// Encoding repair + trim + uppercase, the treatment every legacy
    /// name/description column gets.
    pub fn clean_name(input: Option<&str>) -> String {
        Self::fix_encoding(input.unwrap_or_default())
            .trim()
            .to_uppercase()
    }

    pub fn fix_encoding(text: &str) -> String {
        if !text.contains('\u{c3}') {
            return text.to_string();
        }
        let mut fixed = text.to_string();
        for (mangled, proper) in ENCODING_REPAIRS {
            if fixed.contains(mangled) {
                fixed = fixed.replace(mangled, proper);
            }
        }
        fixed
    }

    /// Keep digits and `+` only, bounded to 15 characters.
    pub fn clean_phone(phone: &str) -> String {
        phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .take(15)
            .collect()
    }

    /// Keep digits, the check digit `k`/`K` and `-` only.
    pub fn clean_rut(rut: &str) -> String {
        rut.chars()
            .filter(|c| c.is_ascii_digit() || *c == 'k' || *c == 'K' || *c == '-')
            .collect()
    }

    fn clean_free_text(text: Option<&str>) -> Option<String> {
        text.map(Self::fix_encoding)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::RawClient;

    #[test]
    fn repairs_mangled_accents_and_case_folds() {
        // "josé pérez" after a Windows-1252 round trip
        let mangled = "  jos\u{c3}\u{a9} p\u{c3}\u{a9}rez  ";
        assert_eq!(DataCleaner::clean_name(Some(mangled)), "JOSÉ PÉREZ");
    }

    #[test]
    fn repairs_mangled_enye() {
        assert_eq!(
            DataCleaner::fix_encoding("NU\u{c3}\u{2018}EZ mu\u{c3}\u{b1}oz"),
            "NUÑEZ muñoz"
        );
    }

    #[test]
    fn cleaning_clean_text_is_a_noop() {
        let clean = "JOSÉ PÉREZ ÑUÑOA";
        assert_eq!(DataCleaner::clean_name(Some(clean)), clean);
        assert_eq!(DataCleaner::fix_encoding(clean), clean);
    }

    #[test]
    fn phone_keeps_digits_and_plus_capped_at_15() {
        assert_eq!(DataCleaner::clean_phone("(56) 9-8765 4321"), "56987654321");
        assert_eq!(
            DataCleaner::clean_phone("+56 9 8765 4321 ext 99887766"),
            "+56987654321998"
        );
    }

    #[test]
    fn rut_keeps_digits_check_digit_and_dash() {
        assert_eq!(DataCleaner::clean_rut("12.345.678-K"), "12345678-K");
        assert_eq!(DataCleaner::clean_rut(" 7.654.321-k "), "7654321-k");
    }

    #[test]
    fn sex_code_h_maps_to_f_everything_else_to_m() {
        let mut raw = crate::legacy::RawPet {
            sex: Some("H".to_string()),
            ..Default::default()
        };
        assert_eq!(DataCleaner::clean_pet(&raw).sex, PetSex::F);

        raw.sex = Some("M".to_string());
        assert_eq!(DataCleaner::clean_pet(&raw).sex, PetSex::M);

        raw.sex = Some("X".to_string());
        assert_eq!(DataCleaner::clean_pet(&raw).sex, PetSex::M);

        raw.sex = None;
        assert_eq!(DataCleaner::clean_pet(&raw).sex, PetSex::M);
    }

    #[test]
    fn pet_defaults_for_size_color_and_ages() {
        let pet = DataCleaner::clean_pet(&crate::legacy::RawPet::default());
        assert_eq!(pet.size, "M");
        assert_eq!(pet.color, "S/C");
        assert_eq!(pet.age_years, 0);
        assert_eq!(pet.age_months, 0);
    }

    #[test]
    fn client_with_absent_optionals_degrades_to_none() {
        let clean = DataCleaner::clean_client(&RawClient::default());
        assert!(clean.name.is_empty());
        assert!(clean.rut.is_empty());
        assert!(clean.address.is_none());
        assert!(clean.phone.is_none());
    }

    #[test]
    fn consultation_money_defaults_to_zero() {
        let clean = DataCleaner::clean_consultation(&crate::legacy::RawConsultation::default());
        assert_eq!(clean.amount, 0.0);
        assert_eq!(clean.paid, 0.0);
    }
}
