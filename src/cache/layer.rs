//! Cache layer that orchestrates caching logic with network fetching.

use futures::stream::{self, Stream, StreamExt};
use std::future::{self, Future};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::storage::RecordStore;
use super::traits::{Cacheable, Lookup, OnRemoteFailure};
use crate::error::{HttpError, RepositoryError, StoreError};

/// Cache-aside coordinator for one entity type.
///
/// The store is always consulted first and any hit is returned as is; there
/// is no expiry. On a miss the remote fetcher runs, its response goes through
/// the extractor, and the extracted entities are persisted before they are
/// returned.
pub struct CacheLayer<T, S> {
  store: Arc<S>,
  _entity: PhantomData<fn() -> T>,
}

impl<T, S> CacheLayer<T, S>
where
  T: Cacheable,
  S: RecordStore<T> + 'static,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      _entity: PhantomData,
    }
  }

  /// Fetch a list with cache-first strategy.
  ///
  /// 1. Check cache - if non-empty, return immediately
  /// 2. Otherwise fetch from network and extract
  /// 3. Store everything extracted, then return it
  /// 4. On network failure, apply `policy`
  pub async fn fetch_list<R, F, Fut, X>(
    &self,
    lookup: Lookup<'_>,
    policy: OnRemoteFailure,
    fetch: F,
    extract: X,
  ) -> Result<Vec<T>, RepositoryError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, HttpError>>,
    X: FnOnce(&R) -> Vec<T>,
  {
    let cached = match lookup {
      Lookup::Matching(fragment) => self.store.find_matching(fragment)?,
      Lookup::ForeignKey(key) => self.store.find_by_foreign_key(key)?,
    };
    if !cached.is_empty() {
      debug!(entity = T::entity_type(), ?lookup, hits = cached.len(), "served from cache");
      return Ok(cached);
    }

    match fetch().await {
      Ok(response) => {
        let entities = extract(&response);
        self.store.upsert_all(&entities)?;
        info!(entity = T::entity_type(), ?lookup, count = entities.len(), "cached remote results");
        Ok(entities)
      }
      Err(error) => match policy {
        OnRemoteFailure::ReturnEmpty => {
          warn!(entity = T::entity_type(), ?lookup, %error, "remote lookup failed, returning no results");
          Ok(Vec::new())
        }
        OnRemoteFailure::NotFound => Err(not_found::<T>(lookup.key(), &error)),
        OnRemoteFailure::Propagate => Err(error.into()),
      },
    }
  }

  /// Fetch a single entity by primary key.
  ///
  /// Only the first extracted entity is kept. An empty extraction is always
  /// [`RepositoryError::NotFound`].
  pub async fn fetch_one<R, F, Fut, X>(
    &self,
    key: &str,
    policy: OnRemoteFailure,
    fetch: F,
    extract: X,
  ) -> Result<T, RepositoryError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, HttpError>>,
    X: FnOnce(&R) -> Vec<T>,
  {
    if let Some(cached) = self.store.get(key)? {
      debug!(entity = T::entity_type(), key, "served from cache");
      return Ok(cached);
    }

    match fetch().await {
      Ok(response) => {
        let Some(entity) = extract(&response).into_iter().next() else {
          debug!(entity = T::entity_type(), key, "remote lookup returned nothing usable");
          return Err(RepositoryError::NotFound {
            entity: T::entity_type(),
            key: key.to_string(),
          });
        };
        self.store.upsert_all(std::slice::from_ref(&entity))?;
        info!(entity = T::entity_type(), key, "cached remote entity");
        Ok(entity)
      }
      Err(error) => match policy {
        OnRemoteFailure::ReturnEmpty | OnRemoteFailure::NotFound => {
          Err(not_found::<T>(key, &error))
        }
        OnRemoteFailure::Propagate => Err(error.into()),
      },
    }
  }

  /// Every cached entity of this type.
  pub fn all(&self) -> Result<Vec<T>, StoreError> {
    self.store.all()
  }

  /// Snapshot of all cached entities now and after every later change.
  pub fn watch(&self) -> impl Stream<Item = Result<Vec<T>, StoreError>> + Send + 'static {
    // Subscribe before reading so no write between the two is missed.
    let receiver = self.store.subscribe();
    let store = Arc::clone(&self.store);
    let initial = store.all();

    let updates = stream::unfold((receiver, store), |(mut receiver, store)| async move {
      loop {
        match receiver.recv().await {
          Ok(event) if event.entity_type != T::entity_type() => continue,
          Ok(_) | Err(RecvError::Lagged(_)) => {
            let snapshot = store.all();
            return Some((snapshot, (receiver, store)));
          }
          Err(RecvError::Closed) => return None,
        }
      }
    });

    stream::once(future::ready(initial)).chain(updates)
  }

  pub fn clear(&self) -> Result<(), StoreError> {
    self.store.clear()
  }
}

impl<T, S> Clone for CacheLayer<T, S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      _entity: PhantomData,
    }
  }
}

fn not_found<T: Cacheable>(key: &str, cause: &HttpError) -> RepositoryError {
  warn!(entity = T::entity_type(), key, error = %cause, "remote lookup failed, reporting not found");
  RepositoryError::NotFound {
    entity: T::entity_type(),
    key: key.to_string(),
  }
}
