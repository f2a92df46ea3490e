//! One-shot migration of a legacy KeySoft veterinary practice export into
//! the VetFlow relational schema.
//!
//! The pipeline is: load the JSON export → clean → validate (advisory) →
//! begin one transaction → catalogs → doctors → clients → pets →
//! consultations → post-count validation → commit, with legacy keys
//! remapped to fresh identifiers through a per-run mapping directory.

pub mod config;
pub mod database;
pub mod errors;
pub mod legacy;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use errors::MigrationError;
pub use migrate::{MigrationRunner, MigrationSummary};
