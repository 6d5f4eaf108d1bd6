//! Schema migrations for the document database
//!
//! Applied versions are recorded in `schema_migrations`; each pending
//! migration runs in its own transaction together with its record.

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use crate::error::Result;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Versions start at 1 and increase by one
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Shared documents",
    sql: "CREATE TABLE IF NOT EXISTS documents (
              key TEXT PRIMARY KEY,
              body TEXT NOT NULL,
              revision INTEGER NOT NULL DEFAULT 1,
              updated_at TEXT NOT NULL
          );",
}];

/// Highest applied version, 0 for a fresh database
pub(crate) fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

#[instrument(skip(conn))]
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version INTEGER PRIMARY KEY,
             description TEXT NOT NULL,
             applied_at TEXT NOT NULL
         );",
    )?;

    let current = get_current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(version = current, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.description, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
    }

    Ok(())
}
