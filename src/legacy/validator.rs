//! Advisory pre-flight validation of cleaned data
//!
//! The scan only counts and describes problems; the migration policy is
//! "attempt everything, let per-record mapper logic decide skip vs.
//! insert", so nothing here ever blocks a run.

use std::fmt;

use crate::legacy::cleaner::CleanData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub valid: usize,
    pub total: usize,
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.valid, self.total)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub doctors: EntityCounts,
    pub clients: EntityCounts,
    pub pets: EntityCounts,
    pub consultations: EntityCounts,
    pub anomalies: Vec<String>,
    /// Anomalies seen beyond the storage cap
    pub truncated_anomalies: usize,
}

pub struct DataValidator {
    max_anomalies: usize,
}

impl DataValidator {
    pub fn new(max_anomalies: usize) -> Self {
        Self { max_anomalies }
    }

    pub fn validate(&self, data: &CleanData) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (index, doctor) in data.doctors.iter().enumerate() {
            report.doctors.total += 1;
            if doctor.name.is_empty() {
                self.record(&mut report, format!("doctor {index}: empty name"));
            } else {
                report.doctors.valid += 1;
            }
        }

        for (index, client) in data.clients.iter().enumerate() {
            report.clients.total += 1;
            if client.name.is_empty() {
                self.record(&mut report, format!("client {index}: empty name"));
            } else if client.rut.is_empty() {
                self.record(&mut report, format!("client {index}: empty RUT"));
            } else {
                report.clients.valid += 1;
            }
        }

        for (index, pet) in data.pets.iter().enumerate() {
            report.pets.total += 1;
            if pet.name.is_empty() {
                self.record(&mut report, format!("pet {index}: empty name"));
            } else if pet.owner_rut.is_empty() {
                self.record(&mut report, format!("pet {index}: no owner RUT"));
            } else if pet.species_code.as_deref().unwrap_or_default().is_empty() {
                self.record(&mut report, format!("pet {index}: no species type"));
            } else {
                report.pets.valid += 1;
            }
        }

        for (index, consultation) in data.consultations.iter().enumerate() {
            report.consultations.total += 1;
            if consultation.ficha.is_none() {
                self.record(&mut report, format!("consultation {index}: no ficha number"));
            } else if consultation.client_rut.is_empty() {
                self.record(&mut report, format!("consultation {index}: no client RUT"));
            } else if consultation.date.as_deref().unwrap_or_default().is_empty() {
                self.record(&mut report, format!("consultation {index}: no date"));
            } else {
                report.consultations.valid += 1;
            }
        }

        report
    }

    fn record(&self, report: &mut ValidationReport, anomaly: String) {
        if report.anomalies.len() < self.max_anomalies {
            report.anomalies.push(anomaly);
        } else {
            report.truncated_anomalies += 1;
        }
    }
}

impl ValidationReport {
    pub fn total_anomalies(&self) -> usize {
        self.anomalies.len() + self.truncated_anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::cleaner::{CleanClient, CleanConsultation, CleanData, CleanDoctor};

    fn client(name: &str, rut: &str) -> CleanClient {
        CleanClient {
            rut: rut.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn counts_valid_and_invalid_clients() {
        let data = CleanData {
            clients: vec![
                client("MARIA LOPEZ", "1-9"),
                client("", "2-7"),
                client("PEDRO SOTO", ""),
            ],
            ..Default::default()
        };

        let report = DataValidator::new(100).validate(&data);
        assert_eq!(report.clients.valid, 1);
        assert_eq!(report.clients.total, 3);
        assert_eq!(report.anomalies.len(), 2);
        assert!(report.anomalies[0].contains("empty name"));
        assert!(report.anomalies[1].contains("empty RUT"));
    }

    #[test]
    fn anomaly_list_is_bounded() {
        let data = CleanData {
            doctors: (0..50).map(|_| CleanDoctor::default()).collect(),
            ..Default::default()
        };

        let report = DataValidator::new(10).validate(&data);
        assert_eq!(report.anomalies.len(), 10);
        assert_eq!(report.truncated_anomalies, 40);
        assert_eq!(report.total_anomalies(), 50);
        assert_eq!(report.doctors.valid, 0);
    }

    #[test]
    fn consultation_needs_ficha_client_and_date() {
        let good = CleanConsultation {
            ficha: Some(12),
            client_rut: "1-9".to_string(),
            date: Some("2020-01-01".to_string()),
            ..Default::default()
        };
        let missing_date = CleanConsultation {
            date: None,
            ..good.clone()
        };

        let data = CleanData {
            consultations: vec![good, missing_date],
            ..Default::default()
        };
        let report = DataValidator::new(100).validate(&data);
        assert_eq!(report.consultations.valid, 1);
        assert_eq!(report.consultations.total, 2);
    }
}
