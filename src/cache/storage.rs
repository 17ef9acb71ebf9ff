//! Cache storage trait and SQLite implementation.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Params, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

use super::traits::{Cacheable, StoreEvent};
use crate::db;
use crate::error::StoreError;

/// Trait for cache storage backends, one implementation per entity type.
///
/// Writes are upserts keyed by [`Cacheable::cache_key`]: the last write for a
/// key wins.
pub trait RecordStore<T: Cacheable>: Send + Sync {
  /// Insert or replace every record.
  fn upsert_all(&self, records: &[T]) -> Result<(), StoreError>;

  /// Get a single record by primary key.
  fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

  /// Records whose search field contains `fragment`.
  fn find_matching(&self, fragment: &str) -> Result<Vec<T>, StoreError>;

  /// Records referencing `key`. Empty for entities without a reference.
  fn find_by_foreign_key(&self, key: &str) -> Result<Vec<T>, StoreError>;

  fn all(&self) -> Result<Vec<T>, StoreError>;

  fn clear(&self) -> Result<(), StoreError>;

  /// Change notifications for all entity types held by this store.
  fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Table layout of a cached entity. The first column is the primary key.
#[derive(Debug)]
pub struct TableSpec {
  pub name: &'static str,
  pub columns: &'static [&'static str],
  /// Column matched by substring lookups
  pub search_column: &'static str,
  pub foreign_key_column: Option<&'static str>,
}

impl TableSpec {
  fn key_column(&self) -> &'static str {
    self.columns[0]
  }

  fn select(&self) -> String {
    format!("SELECT {} FROM {}", self.columns.join(", "), self.name)
  }
}

/// Row mapping for entities stored by [`SqliteStorage`].
pub trait SqlRecord: Cacheable + Sized {
  const TABLE: TableSpec;

  /// Values in [`TableSpec::columns`] order.
  fn to_row(&self) -> Vec<Value>;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  changes: broadcast::Sender<StoreEvent>,
}

impl SqliteStorage {
  /// Open the cache at `path`, or at the default location when `None`.
  pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
    let conn = match path {
      Some(path) => db::open(path)?,
      None => db::open(&db::default_path()?)?,
    };
    Ok(Self::from_connection(conn))
  }

  pub fn open_in_memory() -> Result<Self, StoreError> {
    Ok(Self::from_connection(db::open_in_memory()?))
  }

  fn from_connection(conn: Connection) -> Self {
    let (changes, _) = broadcast::channel(16);
    Self {
      conn: Mutex::new(conn),
      changes,
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::LockPoisoned)
  }

  fn query<T: SqlRecord, P: Params>(&self, sql: &str, params: P) -> Result<Vec<T>, StoreError> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare_cached(sql)?;
    let records = stmt
      .query_map(params, T::from_row)?
      .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
  }

  fn notify(&self, entity_type: &'static str) {
    // No subscribers is fine.
    let _ = self.changes.send(StoreEvent { entity_type });
  }
}

impl<T: SqlRecord> RecordStore<T> for SqliteStorage {
  fn upsert_all(&self, records: &[T]) -> Result<(), StoreError> {
    if records.is_empty() {
      return Ok(());
    }

    let table = &T::TABLE;
    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let sql = format!(
      "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
      table.name,
      table.columns.join(", "),
      placeholders
    );

    {
      let mut conn = self.lock()?;
      let tx = conn.transaction()?;
      {
        let mut stmt = tx.prepare_cached(&sql)?;
        for record in records {
          stmt.execute(params_from_iter(record.to_row()))?;
        }
      }
      tx.commit()?;
    }

    debug!(table = table.name, count = records.len(), "upserted records");
    self.notify(T::entity_type());
    Ok(())
  }

  fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
    let table = &T::TABLE;
    let sql = format!("{} WHERE {} = ?1", table.select(), table.key_column());

    let conn = self.lock()?;
    let record = conn.query_row(&sql, [key], T::from_row).optional()?;
    Ok(record)
  }

  fn find_matching(&self, fragment: &str) -> Result<Vec<T>, StoreError> {
    let table = &T::TABLE;
    let sql = format!(
      "{} WHERE {} LIKE '%' || ?1 || '%' ORDER BY rowid",
      table.select(),
      table.search_column
    );
    self.query(&sql, [fragment])
  }

  fn find_by_foreign_key(&self, key: &str) -> Result<Vec<T>, StoreError> {
    let table = &T::TABLE;
    let Some(column) = table.foreign_key_column else {
      return Ok(Vec::new());
    };
    let sql = format!("{} WHERE {} = ?1 ORDER BY rowid", table.select(), column);
    self.query(&sql, [key])
  }

  fn all(&self) -> Result<Vec<T>, StoreError> {
    let sql = format!("{} ORDER BY rowid", T::TABLE.select());
    self.query(&sql, [])
  }

  fn clear(&self) -> Result<(), StoreError> {
    let sql = format!("DELETE FROM {}", T::TABLE.name);
    self.lock()?.execute(&sql, [])?;
    self.notify(T::entity_type());
    Ok(())
  }

  fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
    self.changes.subscribe()
  }
}
