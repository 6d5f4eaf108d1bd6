//! SQLite storage for shared documents
//!
//! Backs the store server. Each document is kept as its full JSON body with
//! a revision counter bumped on every write; there is no merge, the last
//! write replaces the body.

mod migrations;
mod parse;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::remote::ResourceKey;
use parse::{parse_body, parse_datetime, parse_resource_key, OptionalExt};

/// A persisted document and its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: ResourceKey,
    pub body: Value,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

/// Main database handle
pub struct DocumentDatabase {
    conn: Connection,
}

impl DocumentDatabase {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        migrations::run_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::get_current_version(&self.conn).unwrap_or(0)
    }

    /// Load one document, `None` if it was never written
    #[instrument(skip(self), fields(key = %key))]
    pub fn load(&self, key: ResourceKey) -> Result<Option<StoredDocument>> {
        let doc = self
            .conn
            .query_row(
                "SELECT key, body, revision, updated_at FROM documents WHERE key = ?1",
                params![key.path()],
                Self::row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// Replace a document body, returning the stored revision
    #[instrument(skip(self, body), fields(key = %key))]
    pub fn save(&self, key: ResourceKey, body: &Value) -> Result<StoredDocument> {
        let now = Utc::now();
        let revision: i64 = self.conn.query_row(
            "INSERT INTO documents (key, body, revision, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                revision = documents.revision + 1,
                updated_at = excluded.updated_at
             RETURNING revision",
            params![key.path(), serde_json::to_string(body)?, now.to_rfc3339()],
            |row| row.get(0),
        )?;

        Ok(StoredDocument {
            key,
            body: body.clone(),
            revision: revision as u64,
            updated_at: now,
        })
    }

    /// All stored documents, ordered by key
    pub fn list(&self) -> Result<Vec<StoredDocument>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, body, revision, updated_at FROM documents ORDER BY key")?;
        let docs = stmt
            .query_map([], Self::row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
        let key: String = row.get(0)?;
        let body: String = row.get(1)?;
        let revision: i64 = row.get(2)?;
        let updated_at: String = row.get(3)?;

        Ok(StoredDocument {
            key: parse_resource_key(0, &key)?,
            body: parse_body(1, &body)?,
            revision: revision as u64,
            updated_at: parse_datetime(3, &updated_at)?,
        })
    }
}
