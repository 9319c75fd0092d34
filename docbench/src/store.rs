//! Store setup: connection opening, pragmas and the fixed schema.

use crate::error::{BenchError, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::Path;

pub const RECORDS_TABLE: &str = "resources";
pub const RELATIONS_TABLE: &str = "relations";

/// Open the store. A file-backed store is deleted first so every run starts
/// empty; `None` opens an in-memory database.
pub fn open_store(path: Option<&Path>) -> Result<Connection> {
    let conn = match path {
        Some(path) => {
            remove_existing(path)?;
            info!("Opening store at {}", path.display());
            Connection::open(path).map_err(BenchError::setup("open store"))?
        }
        None => {
            info!("Opening in-memory store");
            Connection::open_in_memory().map_err(BenchError::setup("open store"))?
        }
    };
    configure_connection(&conn)?;
    Ok(conn)
}

fn remove_existing(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        match fs::remove_file(&candidate) {
            Ok(()) => debug!("Removed stale {}", Path::new(&candidate).display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(BenchError::StaleStore {
                    path: candidate.into(),
                    source,
                })
            }
        }
    }
    Ok(())
}

/// Pragmas for bulk loading. Durability is irrelevant: data is discarded at
/// process end.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = OFF;
         PRAGMA cache_size = -131072;
         PRAGMA temp_store = MEMORY;",
    )
    .map_err(BenchError::setup("configure connection"))
}

/// Create the records and relations tables.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE resources (
            id   TEXT PRIMARY KEY,
            name TEXT,
            data TEXT
         );
         CREATE TABLE relations (
            resource_id TEXT,
            related_id  TEXT
         );",
    )
    .map_err(BenchError::setup("create schema"))
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(count as u64)
}
