//! Report storage
//!
//! Provides the `reports` collection: an append-only list of JSON documents
//! with store-assigned ids.

mod schema;

use schema::SCHEMA;

use crate::report::{StoredReport, WasteReport};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Malformed report document: {0}")]
    Document(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Report Operations ====================

    /// Append a report under the given id
    pub fn insert_report(&self, id: &str, report: &WasteReport) -> DbResult<()> {
        let document = serde_json::to_string(report)?;
        self.conn().execute(
            "INSERT INTO reports (id, document, reported_by, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, document, report.reported_by, report.created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// All reports in insertion order
    pub fn list_reports(&self) -> DbResult<Vec<StoredReport>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, document FROM reports ORDER BY seq")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let reports = rows
            .map(|row| -> DbResult<StoredReport> {
                let (id, document) = row?;
                let report: WasteReport = serde_json::from_str(&document)?;
                Ok(StoredReport { id, report })
            })
            .collect::<DbResult<Vec<_>>>()?;
        Ok(reports)
    }
}
