pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Open or create the cache database at `path` and apply the schema.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
  // Ensure parent directory exists
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  Ok(conn)
}

/// Open a private in-memory database with the schema applied.
pub fn open_in_memory() -> Result<Connection, StoreError> {
  let conn = Connection::open_in_memory()?;
  run_migrations(&conn)?;
  Ok(conn)
}

/// Get the default database path
pub fn default_path() -> Result<PathBuf, StoreError> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or(StoreError::NoDataDir)?;

  Ok(data_dir.join("netreg").join("cache.db"))
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
  conn.execute_batch(schema::SCHEMA)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_directories_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    let conn = open(&path).unwrap();
    assert!(path.exists());

    let tables: Vec<String> = conn
      .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
      .unwrap()
      .query_map([], |row| row.get(0))
      .unwrap()
      .collect::<Result<_, _>>()
      .unwrap();
    assert_eq!(tables, vec!["networks", "organizations"]);
  }

  #[test]
  fn test_schema_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    drop(open(&path).unwrap());
    open(&path).unwrap();
  }
}
