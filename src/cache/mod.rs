//! Local-first caching layer.
//!
//! This module provides a registry-agnostic cache-aside mechanism that:
//! - Persists entities keyed by a primary key with upsert semantics
//! - Serves any cache hit without contacting the network
//! - Fills the cache as a by-product of every successful remote miss
//! - Applies an explicit policy when the remote call fails
//! - Publishes change events so callers can watch a table

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{RecordStore, SqlRecord, SqliteStorage, TableSpec};
pub use traits::{Cacheable, Lookup, OnRemoteFailure, StoreEvent};
