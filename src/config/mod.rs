use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub migration: MigrationConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Directory receiving the run log, errors log and id-mapping snapshot
    pub log_dir: PathBuf,
    /// Default legacy input document when none is given on the command line
    pub default_input: PathBuf,
    pub client_batch_size: usize,
    pub pet_batch_size: usize,
    pub consultation_batch_size: usize,
    /// Retry policy for the retry-capable batch path. The transactional
    /// entity passes never retry (a failed chunk aborts the transaction),
    /// so these only apply to callers using `process_with_retry`.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Upper bound on stored validation anomaly strings
    pub max_anomalies: usize,
    /// How many anomalies to echo into the log
    pub reported_anomalies: usize,
}

/// Breed-to-species defaults. The legacy breed table carries no species
/// reference, so breeds fall back to the canine species unless the breed
/// name appears in the feline lookup list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub default_species_code: String,
    pub feline_species_code: String,
    pub feline_breeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./vetflow.db".to_string(),
                max_connections: Some(5),
            },
            migration: MigrationConfig {
                log_dir: PathBuf::from("./migration-logs"),
                default_input: PathBuf::from("./data/keysoft_all.json"),
                client_batch_size: 1000,
                pet_batch_size: 500,
                // Consultations carry the widest rows, keep chunks small
                consultation_batch_size: 200,
                max_retries: 3,
                retry_base_delay_ms: 1000,
                max_anomalies: 100,
                reported_anomalies: 10,
            },
            catalog: CatalogConfig {
                default_species_code: "00001".to_string(),
                feline_species_code: "00002".to_string(),
                feline_breeds: vec![
                    "SIAMES".to_string(),
                    "PERSA".to_string(),
                    "ANGORA".to_string(),
                    "SIBERIANO".to_string(),
                    "BENGALA".to_string(),
                    "EUROPEO".to_string(),
                ],
            },
        }
    }
}

impl Config {
    pub fn load(config_file: &str) -> Result<Self> {
        if std::path::Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.database.url, config.database.url);
        assert_eq!(parsed.migration.client_batch_size, 1000);
        assert_eq!(parsed.catalog.default_species_code, "00001");
    }
}
