//! Temporary unique index on `resources.name`.
//!
//! The index only lives while relation edges are being resolved: it turns
//! every name lookup into a B-tree probe instead of a table scan, and it is
//! dropped before the query phase so the benchmarks run against the bare table.

use crate::error::{BenchError, Result};
use log::info;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

pub const NAME_INDEX: &str = "idx_resources_name";

#[derive(Debug, Clone)]
pub struct IndexManager {
    index_name: String,
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new(NAME_INDEX)
    }
}

impl IndexManager {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn exists(&self, conn: &Connection) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1",
                [&self.index_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create the unique index. Fails if it already exists or if two
    /// records share a name.
    pub fn create_name_index(&self, conn: &Connection) -> Result<()> {
        if self.exists(conn)? {
            return Err(BenchError::IndexAlreadyExists(self.index_name.clone()));
        }

        conn.execute_batch(&format!(
            "CREATE UNIQUE INDEX {} ON resources (name)",
            self.index_name
        ))
        .map_err(|source| {
            if source.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
                BenchError::DuplicateNames {
                    index: self.index_name.clone(),
                    source,
                }
            } else {
                BenchError::Setup {
                    stage: "create name index",
                    source,
                }
            }
        })?;

        info!("Created index {}", self.index_name);
        Ok(())
    }

    pub fn drop_name_index(&self, conn: &Connection) -> Result<()> {
        if !self.exists(conn)? {
            return Err(BenchError::IndexMissing(self.index_name.clone()));
        }
        conn.execute_batch(&format!("DROP INDEX {}", self.index_name))
            .map_err(BenchError::setup("drop name index"))?;

        info!("Dropped index {}", self.index_name);
        Ok(())
    }

    /// Run `f` with the index in place. The index is dropped afterwards even
    /// if `f` fails; `f`'s error takes precedence over a drop error.
    pub fn with_name_index<T, F>(&self, conn: &mut Connection, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        self.create_name_index(conn)?;
        let outcome = f(conn);
        let dropped = self.drop_name_index(conn);
        let value = outcome?;
        dropped?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_schema, open_store};

    fn store_with_names(names: &[&str]) -> Connection {
        let conn = open_store(None).unwrap();
        create_schema(&conn).unwrap();
        for (i, name) in names.iter().enumerate() {
            conn.execute(
                "INSERT INTO resources (id, name, data) VALUES (?1, ?2, '{}')",
                rusqlite::params![format!("id-{i}"), name],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn create_then_drop() {
        let conn = store_with_names(&["name-0", "name-1"]);
        let index = IndexManager::default();

        assert!(!index.exists(&conn).unwrap());
        index.create_name_index(&conn).unwrap();
        assert!(index.exists(&conn).unwrap());
        index.drop_name_index(&conn).unwrap();
        assert!(!index.exists(&conn).unwrap());
    }

    #[test]
    fn creating_twice_fails() {
        let conn = store_with_names(&["name-0"]);
        let index = IndexManager::default();
        index.create_name_index(&conn).unwrap();
        let err = index.create_name_index(&conn).unwrap_err();
        assert!(matches!(err, BenchError::IndexAlreadyExists(ref n) if n == NAME_INDEX));
    }

    #[test]
    fn dropping_without_creating_fails() {
        let conn = store_with_names(&[]);
        let err = IndexManager::default().drop_name_index(&conn).unwrap_err();
        assert!(matches!(err, BenchError::IndexMissing(_)));
    }

    #[test]
    fn duplicate_names_block_creation() {
        let conn = store_with_names(&["name-0", "name-0"]);
        let index = IndexManager::default();
        let err = index.create_name_index(&conn).unwrap_err();
        assert!(matches!(err, BenchError::DuplicateNames { .. }));
        assert!(!index.exists(&conn).unwrap());
    }

    #[test]
    fn index_enforces_uniqueness_only_while_present() {
        let conn = store_with_names(&["name-0"]);
        let index = IndexManager::default();
        let insert_dup = |id: &str| {
            conn.execute(
                "INSERT INTO resources (id, name, data) VALUES (?1, 'name-0', '{}')",
                [id],
            )
        };

        index.create_name_index(&conn).unwrap();
        assert!(insert_dup("dup-a").is_err());

        index.drop_name_index(&conn).unwrap();
        insert_dup("dup-a").unwrap();
        insert_dup("dup-b").unwrap();
    }

    #[test]
    fn scoped_index_is_dropped_after_error() {
        let mut conn = store_with_names(&["name-0"]);
        let index = IndexManager::default();

        let result: Result<()> = index.with_name_index(&mut conn, |conn| {
            assert!(IndexManager::default().exists(conn).unwrap());
            Err(BenchError::Config("boom".into()))
        });

        assert!(matches!(result, Err(BenchError::Config(_))));
        assert!(!index.exists(&conn).unwrap());
    }

    #[test]
    fn scoped_index_returns_closure_value() {
        let mut conn = store_with_names(&["name-0", "name-1"]);
        let index = IndexManager::new("idx_custom");
        let count = index
            .with_name_index(&mut conn, |conn| {
                let n: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |r| r.get(0))?;
                Ok(n)
            })
            .unwrap();
        assert_eq!(count, 2);
        assert!(!index.exists(&conn).unwrap());
    }
}
