//! Cache-aside repositories for organisations and networks.

use futures::Stream;
use std::sync::Arc;

use crate::cache::{CacheLayer, Lookup, OnRemoteFailure, RecordStore};
use crate::error::{RepositoryError, StoreError};

use super::client::{ObjectType, RegistrySource};
use super::extract::{extract_networks, extract_organizations};
use super::types::{Network, Organization};

/// How each kind of operation reacts to a failed remote call.
///
/// The defaults hide remote failures from list lookups (an empty list) and
/// turn them into not-found for id lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
  /// Text searches and organisation network listings
  pub search: OnRemoteFailure,
  /// Lookups by primary key
  pub lookup: OnRemoteFailure,
}

impl Default for FailurePolicy {
  fn default() -> Self {
    Self {
      search: OnRemoteFailure::ReturnEmpty,
      lookup: OnRemoteFailure::NotFound,
    }
  }
}

/// Organisations, plus the networks they hold.
pub struct OrganizationRepository<S> {
  source: Arc<dyn RegistrySource>,
  organizations: CacheLayer<Organization, S>,
  networks: CacheLayer<Network, S>,
  policy: FailurePolicy,
}

impl<S> OrganizationRepository<S>
where
  S: RecordStore<Organization> + RecordStore<Network> + 'static,
{
  pub fn new(source: Arc<dyn RegistrySource>, store: Arc<S>) -> Self {
    Self {
      source,
      organizations: CacheLayer::new(Arc::clone(&store)),
      networks: CacheLayer::new(store),
      policy: FailurePolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Organisations whose name contains `name`.
  pub async fn search_by_text(&self, name: &str) -> Result<Vec<Organization>, RepositoryError> {
    self
      .organizations
      .fetch_list(
        Lookup::Matching(name),
        self.policy.search,
        || self.source.search_by_query_string(name),
        extract_organizations,
      )
      .await
  }

  pub async fn get_by_id(&self, id: &str) -> Result<Organization, RepositoryError> {
    self
      .organizations
      .fetch_one(
        id,
        self.policy.lookup,
        || self.source.get_object_by_id(ObjectType::Organisation, id),
        extract_organizations,
      )
      .await
  }

  /// Networks held by the organisation `org_id`.
  pub async fn get_organization_networks(
    &self,
    org_id: &str,
  ) -> Result<Vec<Network>, RepositoryError> {
    self
      .networks
      .fetch_list(
        Lookup::ForeignKey(org_id),
        self.policy.search,
        || self.source.search_by_inverse_org(org_id),
        extract_networks,
      )
      .await
  }

  /// Every cached organisation. Never contacts the registry.
  pub fn organizations(&self) -> Result<Vec<Organization>, StoreError> {
    self.organizations.all()
  }

  /// Cached organisations now and after every change to them.
  pub fn watch_organizations(
    &self,
  ) -> impl Stream<Item = Result<Vec<Organization>, StoreError>> + Send + 'static {
    self.organizations.watch()
  }

  pub fn clear_cache(&self) -> Result<(), StoreError> {
    self.organizations.clear()
  }
}

impl<S> Clone for OrganizationRepository<S> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
      organizations: self.organizations.clone(),
      networks: self.networks.clone(),
      policy: self.policy,
    }
  }
}

/// IP network blocks.
pub struct NetworkRepository<S> {
  source: Arc<dyn RegistrySource>,
  networks: CacheLayer<Network, S>,
  policy: FailurePolicy,
}

impl<S> NetworkRepository<S>
where
  S: RecordStore<Network> + 'static,
{
  pub fn new(source: Arc<dyn RegistrySource>, store: Arc<S>) -> Self {
    Self {
      source,
      networks: CacheLayer::new(store),
      policy: FailurePolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Networks whose inetnum contains `text`.
  pub async fn search_by_text(&self, text: &str) -> Result<Vec<Network>, RepositoryError> {
    self
      .networks
      .fetch_list(
        Lookup::Matching(text),
        self.policy.search,
        || self.source.search_by_ip(text),
        extract_networks,
      )
      .await
  }

  /// Network with exactly this inetnum.
  pub async fn get_by_id(&self, inetnum: &str) -> Result<Network, RepositoryError> {
    self
      .networks
      .fetch_one(
        inetnum,
        self.policy.lookup,
        || self.source.get_object_by_id(ObjectType::Inetnum, inetnum),
        extract_networks,
      )
      .await
  }

  pub fn clear_cache(&self) -> Result<(), StoreError> {
    self.networks.clear()
  }
}

impl<S> Clone for NetworkRepository<S> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
      networks: self.networks.clone(),
      policy: self.policy,
    }
  }
}
