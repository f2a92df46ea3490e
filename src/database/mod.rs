//! Target datastore access
//!
//! The migration treats the store as a transactional datastore: the
//! orchestrator begins one transaction, every mapper writes through a
//! reborrowed connection from it, and the run commits or rolls back as a
//! single unit.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqliteConnection};

use crate::config::DatabaseConfig;

/// Embedded target schema, applied statement by statement.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS species_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT
    )",
    "CREATE TABLE IF NOT EXISTS breeds (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        species_type_id TEXT NOT NULL REFERENCES species_types(id)
    )",
    "CREATE TABLE IF NOT EXISTS doctors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        specialty TEXT,
        license_number TEXT,
        phone TEXT,
        email TEXT,
        is_active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        rut TEXT,
        name TEXT NOT NULL,
        address TEXT,
        commune TEXT,
        city TEXT,
        phone TEXT,
        email TEXT,
        client_type TEXT NOT NULL DEFAULT 'Normal',
        discount INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_clients_rut ON clients(rut)",
    "CREATE TABLE IF NOT EXISTS pets (
        id TEXT PRIMARY KEY,
        ficha INTEGER NOT NULL,
        name TEXT NOT NULL,
        client_id TEXT NOT NULL REFERENCES clients(id),
        species_type_id TEXT NOT NULL REFERENCES species_types(id),
        breed_id TEXT REFERENCES breeds(id),
        sex TEXT NOT NULL,
        size TEXT NOT NULL,
        color TEXT,
        birth_date TEXT,
        is_alive INTEGER NOT NULL DEFAULT 1,
        death_date TEXT,
        photo_url TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_pets_ficha ON pets(ficha)",
    "CREATE TABLE IF NOT EXISTS consultations (
        id TEXT PRIMARY KEY,
        consultation_number INTEGER NOT NULL,
        pet_id TEXT NOT NULL REFERENCES pets(id),
        client_id TEXT NOT NULL REFERENCES clients(id),
        doctor_id TEXT NOT NULL REFERENCES doctors(id),
        date TEXT NOT NULL,
        type TEXT NOT NULL,
        reason TEXT,
        symptoms TEXT,
        diagnosis TEXT,
        treatment TEXT,
        exams TEXT,
        next_visit_date TEXT,
        next_visit_type TEXT,
        next_treatment TEXT,
        amount REAL NOT NULL DEFAULT 0,
        paid REAL NOT NULL DEFAULT 0,
        balance REAL NOT NULL DEFAULT 0,
        status TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_consultations_number ON consultations(consultation_number)",
];

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        // Create database if it doesn't exist (for SQLite)
        if !Sqlite::database_exists(&config.url).await? {
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool; used by tests running against
    /// `sqlite::memory:`.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Count the rows of one target table inside the active transaction.
pub async fn count_rows(conn: &mut SqliteConnection, table: TargetTable) -> sqlx::Result<i64> {
    let sql = match table {
        TargetTable::SpeciesTypes => "SELECT COUNT(*) FROM species_types",
        TargetTable::Breeds => "SELECT COUNT(*) FROM breeds",
        TargetTable::Doctors => "SELECT COUNT(*) FROM doctors",
        TargetTable::Clients => "SELECT COUNT(*) FROM clients",
        TargetTable::Pets => "SELECT COUNT(*) FROM pets",
        TargetTable::Consultations => "SELECT COUNT(*) FROM consultations",
    };
    sqlx::query_scalar(sql).fetch_one(conn).await
}

#[derive(Debug, Clone, Copy)]
pub enum TargetTable {
    SpeciesTypes,
    Breeds,
    Doctors,
    Clients,
    Pets,
    Consultations,
}
