//! Legacy-key to new-key mapping directory
//!
//! One directory instance is constructed per migration run and passed by
//! reference into every mapper; it is never global state. Namespaces keep
//! the per-entity key spaces disjoint. A legacy key may only ever map to a
//! single new key: re-asserting the identical pair is a no-op (idempotent
//! re-runs rely on this), asserting a different new key for an existing
//! pair is a batch-level error rather than a silent overwrite.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Doctors,
    Clients,
    Pets,
    Species,
    Breeds,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doctors => "doctors",
            Self::Clients => "clients",
            Self::Pets => "pets",
            Self::Species => "species",
            Self::Breeds => "breeds",
        }
    }

    pub const ALL: [Namespace; 5] = [
        Self::Doctors,
        Self::Clients,
        Self::Pets,
        Self::Species,
        Self::Breeds,
    ];
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub struct IdMappingDirectory {
    mappings: BTreeMap<Namespace, HashMap<String, Uuid>>,
}

impl IdMappingDirectory {
    pub fn new() -> Self {
        let mut mappings = BTreeMap::new();
        for namespace in Namespace::ALL {
            mappings.insert(namespace, HashMap::new());
        }
        Self { mappings }
    }

    /// Record a legacy → new key pair.
    ///
    /// Identical re-insertion succeeds silently; a conflicting new key for
    /// an already-mapped legacy key fails, because anything inserted
    /// against the first key would be silently orphaned by an overwrite.
    pub fn insert(
        &mut self,
        namespace: Namespace,
        legacy_key: &str,
        new_key: Uuid,
    ) -> Result<(), MigrationError> {
        let map = self.mappings.entry(namespace).or_default();
        match map.get(legacy_key) {
            Some(existing) if *existing != new_key => Err(MigrationError::MappingConflict {
                namespace,
                legacy_key: legacy_key.to_string(),
                existing: *existing,
                attempted: new_key,
            }),
            Some(_) => Ok(()),
            None => {
                map.insert(legacy_key.to_string(), new_key);
                Ok(())
            }
        }
    }

    /// Soft lookup, used for optional foreign references.
    pub fn get(&self, namespace: Namespace, legacy_key: &str) -> Option<Uuid> {
        self.mappings.get(&namespace)?.get(legacy_key).copied()
    }

    /// Hard lookup for mandatory dependencies; a miss aborts the run.
    pub fn require(&self, namespace: Namespace, legacy_key: &str) -> Result<Uuid, MigrationError> {
        self.get(namespace, legacy_key)
            .ok_or_else(|| MigrationError::MappingNotFound {
                namespace,
                legacy_key: legacy_key.to_string(),
            })
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        self.mappings.get(&namespace).map_or(0, |m| m.len())
    }

    pub fn statistics(&self) -> BTreeMap<Namespace, usize> {
        self.mappings
            .iter()
            .map(|(namespace, map)| (*namespace, map.len()))
            .collect()
    }

    /// Serialize every namespace to a JSON snapshot for post-hoc audit.
    pub fn save_to_file(&self, path: &Path) -> Result<(), MigrationError> {
        let mut document = serde_json::Map::new();
        for (namespace, map) in &self.mappings {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let entries: Vec<_> = entries
                .into_iter()
                .map(|(legacy, new)| json!({ "legacyKey": legacy, "newKey": new }))
                .collect();
            document.insert(namespace.as_str().to_string(), json!(entries));
        }

        let contents = serde_json::to_string_pretty(&serde_json::Value::Object(document))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut directory = IdMappingDirectory::new();
        let id = Uuid::new_v4();
        directory.insert(Namespace::Clients, "12345678-9", id).unwrap();

        assert_eq!(directory.get(Namespace::Clients, "12345678-9"), Some(id));
        // Namespaces are disjoint
        assert_eq!(directory.get(Namespace::Doctors, "12345678-9"), None);
        assert_eq!(directory.require(Namespace::Clients, "12345678-9").unwrap(), id);
    }

    #[test]
    fn require_fails_on_missing_key() {
        let directory = IdMappingDirectory::new();
        let err = directory.require(Namespace::Species, "00001").unwrap_err();
        assert!(matches!(err, MigrationError::MappingNotFound { .. }));
    }

    #[test]
    fn identical_reinsert_is_a_noop() {
        let mut directory = IdMappingDirectory::new();
        let id = Uuid::new_v4();
        directory.insert(Namespace::Pets, "100", id).unwrap();
        directory.insert(Namespace::Pets, "100", id).unwrap();
        assert_eq!(directory.len(Namespace::Pets), 1);
    }

    #[test]
    fn conflicting_remap_is_rejected() {
        let mut directory = IdMappingDirectory::new();
        directory
            .insert(Namespace::Pets, "100", Uuid::new_v4())
            .unwrap();
        let err = directory
            .insert(Namespace::Pets, "100", Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, MigrationError::MappingConflict { .. }));
        assert_eq!(directory.len(Namespace::Pets), 1);
    }

    #[test]
    fn statistics_report_per_namespace_counts() {
        let mut directory = IdMappingDirectory::new();
        directory
            .insert(Namespace::Doctors, "01", Uuid::new_v4())
            .unwrap();
        directory
            .insert(Namespace::Doctors, "02", Uuid::new_v4())
            .unwrap();
        directory
            .insert(Namespace::Breeds, "0001", Uuid::new_v4())
            .unwrap();

        let stats = directory.statistics();
        assert_eq!(stats[&Namespace::Doctors], 2);
        assert_eq!(stats[&Namespace::Breeds], 1);
        assert_eq!(stats[&Namespace::Clients], 0);
    }

    #[test]
    fn snapshot_contains_every_namespace() {
        let mut directory = IdMappingDirectory::new();
        let id = Uuid::new_v4();
        directory.insert(Namespace::Species, "00001", id).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id-mappings.json");
        directory.save_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["species"][0]["legacyKey"], "00001");
        assert_eq!(parsed["species"][0]["newKey"], id.to_string());
        assert!(parsed["doctors"].as_array().unwrap().is_empty());
    }
}
