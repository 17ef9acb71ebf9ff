//! Caching implementations for registry types.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use crate::cache::{Cacheable, SqlRecord, TableSpec};

use super::types::{Network, Organization};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Organization {
  fn cache_key(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "organisation"
  }
}

impl Cacheable for Network {
  fn cache_key(&self) -> &str {
    &self.inetnum
  }

  fn entity_type() -> &'static str {
    "inetnum"
  }
}

// ============================================================================
// Row mapping
// ============================================================================

impl SqlRecord for Organization {
  const TABLE: TableSpec = TableSpec {
    name: "organizations",
    columns: &["id", "name", "country", "created"],
    search_column: "name",
    foreign_key_column: None,
  };

  fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Text(self.id.clone()),
      Value::Text(self.name.clone()),
      optional_text(self.country.as_deref()),
      optional_text(self.created.map(|c| c.to_rfc3339()).as_deref()),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let created: Option<String> = row.get(3)?;
    let created = created
      .map(|s| parse_timestamp(&s))
      .transpose()
      .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Organization {
      id: row.get(0)?,
      name: row.get(1)?,
      country: row.get(2)?,
      created,
    })
  }
}

impl SqlRecord for Network {
  const TABLE: TableSpec = TableSpec {
    name: "networks",
    columns: &["inetnum", "netname", "country", "organization_id"],
    search_column: "inetnum",
    foreign_key_column: Some("organization_id"),
  };

  fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Text(self.inetnum.clone()),
      Value::Text(self.netname.clone()),
      optional_text(self.country.as_deref()),
      Value::Text(self.organization_id.clone()),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Network {
      inetnum: row.get(0)?,
      netname: row.get(1)?,
      country: row.get(2)?,
      organization_id: row.get(3)?,
    })
  }
}

fn optional_text(value: Option<&str>) -> Value {
  value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
  DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use std::sync::Arc;

  use super::*;
  use crate::cache::{RecordStore, SqliteStorage};

  fn org(id: &str, name: &str) -> Organization {
    Organization {
      id: id.into(),
      name: name.into(),
      country: Some("NL".into()),
      created: Some(Utc.with_ymd_and_hms(2004, 4, 17, 9, 57, 29).unwrap()),
    }
  }

  fn net(inetnum: &str, org_id: &str) -> Network {
    Network {
      inetnum: inetnum.into(),
      netname: format!("NET-{}", inetnum),
      country: None,
      organization_id: org_id.into(),
    }
  }

  #[test]
  fn test_last_write_wins() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let first = org("ORG-A", "Acme");
    let second = Organization {
      name: "Acme Corp".into(),
      country: None,
      created: None,
      ..first.clone()
    };

    storage.upsert_all(&[first]).unwrap();
    storage.upsert_all(&[second.clone()]).unwrap();

    let stored: Option<Organization> = storage.get("ORG-A").unwrap();
    assert_eq!(stored, Some(second));
    assert_eq!(RecordStore::<Organization>::all(&storage).unwrap().len(), 1);
  }

  #[test]
  fn test_duplicate_keys_in_one_batch_keep_the_last() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .upsert_all(&[net("1.0.0.0/8", "ORG-A"), net("1.0.0.0/8", "ORG-B")])
      .unwrap();

    let stored: Option<Network> = storage.get("1.0.0.0/8").unwrap();
    assert_eq!(stored.unwrap().organization_id, "ORG-B");
  }

  #[test]
  fn test_substring_and_foreign_key_lookups() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .upsert_all(&[org("ORG-A", "Acme Corp"), org("ORG-B", "Globex")])
      .unwrap();
    storage
      .upsert_all(&[
        net("10.1.0.0 - 10.1.255.255", "ORG-A"),
        net("10.2.0.0 - 10.2.255.255", "ORG-B"),
        net("192.168.0.0 - 192.168.0.255", "ORG-A"),
      ])
      .unwrap();

    let orgs: Vec<Organization> = storage.find_matching("acme").unwrap();
    assert_eq!(orgs, vec![org("ORG-A", "Acme Corp")]);

    let nets: Vec<Network> = storage.find_matching("10.2.").unwrap();
    assert_eq!(nets.len(), 1);

    let nets: Vec<Network> = storage.find_by_foreign_key("ORG-A").unwrap();
    assert_eq!(nets.len(), 2);
    assert!(nets.iter().all(|n| n.organization_id == "ORG-A"));

    let orgs: Vec<Organization> = storage.find_by_foreign_key("ORG-A").unwrap();
    assert!(orgs.is_empty());
  }

  #[test]
  fn test_network_may_reference_uncached_organization() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.upsert_all(&[net("1.2.3.0/24", "ORG-MISSING")]).unwrap();

    let orgs: Option<Organization> = storage.get("ORG-MISSING").unwrap();
    assert!(orgs.is_none());
    let stored: Option<Network> = storage.get("1.2.3.0/24").unwrap();
    assert!(stored.is_some());
  }

  #[test]
  fn test_clear_only_touches_one_table() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.upsert_all(&[org("ORG-A", "Acme")]).unwrap();
    storage.upsert_all(&[net("1.2.3.0/24", "ORG-A")]).unwrap();

    RecordStore::<Network>::clear(&storage).unwrap();

    assert!(RecordStore::<Network>::all(&storage).unwrap().is_empty());
    assert_eq!(RecordStore::<Organization>::all(&storage).unwrap().len(), 1);
  }

  #[test]
  fn test_writes_publish_change_events() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let mut events = RecordStore::<Organization>::subscribe(&storage);

    storage.upsert_all(&[org("ORG-A", "Acme")]).unwrap();
    storage.upsert_all(&[net("1.2.3.0/24", "ORG-A")]).unwrap();
    RecordStore::<Network>::upsert_all(&storage, &[]).unwrap();

    assert_eq!(events.try_recv().unwrap().entity_type, "organisation");
    assert_eq!(events.try_recv().unwrap().entity_type, "inetnum");
    assert!(events.try_recv().is_err());
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let storage = SqliteStorage::open(Some(&path)).unwrap();
      storage.upsert_all(&[org("ORG-A", "Acme")]).unwrap();
    }

    let storage = Arc::new(SqliteStorage::open(Some(&path)).unwrap());
    let stored: Option<Organization> = storage.get("ORG-A").unwrap();
    assert_eq!(stored, Some(org("ORG-A", "Acme")));
  }
}
