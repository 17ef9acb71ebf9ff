//! Core traits and types for the caching system.

/// Trait for entities that can be cached.
///
/// Implementors provide a primary key that is unique within their entity type.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Primary key (organisation id, inetnum)
  fn cache_key(&self) -> &str;

  /// Entity type name, used in change events and error messages
  fn entity_type() -> &'static str;
}

/// Which cached records a list lookup starts from.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
  /// Records whose search field contains the fragment
  Matching(&'a str),
  /// Records referencing the given key
  ForeignKey(&'a str),
}

impl<'a> Lookup<'a> {
  pub fn key(&self) -> &'a str {
    match self {
      Lookup::Matching(key) | Lookup::ForeignKey(key) => key,
    }
  }
}

/// What a cache miss does when the remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnRemoteFailure {
  /// Log and return an empty list. For single-entity lookups this behaves
  /// like [`OnRemoteFailure::NotFound`].
  ReturnEmpty,
  /// Report the key as not found, discarding the cause.
  NotFound,
  /// Surface the remote error unchanged.
  Propagate,
}

/// Emitted by a store after every write that changed a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
  pub entity_type: &'static str,
}
