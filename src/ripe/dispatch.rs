//! Routes free-text queries to the matching repository.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::cache::RecordStore;
use crate::error::{RepositoryError, StoreError};

use super::repository::{NetworkRepository, OrganizationRepository};
use super::types::{Network, Organization};

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^((25[0-5]|2[0-4][0-9]|[0-1]?[0-9]{1,2})\.){3}(25[0-5]|2[0-4][0-9]|[0-1]?[0-9]{1,2})$",
  )
  .expect("valid IPv4 pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
  /// A full dotted-quad IPv4 literal
  IpAddress,
  /// Anything else, treated as an organisation name fragment
  Name,
}

/// Classify `query` without trimming or normalising it.
pub fn classify(query: &str) -> QueryKind {
  if IPV4.is_match(query) {
    QueryKind::IpAddress
  } else {
    QueryKind::Name
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
  Networks(Vec<Network>),
  Organizations(Vec<Organization>),
  NothingFound,
}

/// Single entry point for free-text search.
pub struct SearchDispatcher<S> {
  organizations: OrganizationRepository<S>,
  networks: NetworkRepository<S>,
}

impl<S> SearchDispatcher<S>
where
  S: RecordStore<Organization> + RecordStore<Network> + 'static,
{
  pub fn new(organizations: OrganizationRepository<S>, networks: NetworkRepository<S>) -> Self {
    Self {
      organizations,
      networks,
    }
  }

  /// IP literals search networks, everything else searches organisations.
  /// An empty result is never retried against the other kind.
  pub async fn search(&self, query: &str) -> Result<SearchOutcome, RepositoryError> {
    let kind = classify(query);
    debug!(query, ?kind, "dispatching search");

    let outcome = match kind {
      QueryKind::IpAddress => {
        let networks = self.networks.search_by_text(query).await?;
        if networks.is_empty() {
          SearchOutcome::NothingFound
        } else {
          SearchOutcome::Networks(networks)
        }
      }
      QueryKind::Name => {
        let organizations = self.organizations.search_by_text(query).await?;
        if organizations.is_empty() {
          SearchOutcome::NothingFound
        } else {
          SearchOutcome::Organizations(organizations)
        }
      }
    };
    Ok(outcome)
  }

  pub fn organizations(&self) -> &OrganizationRepository<S> {
    &self.organizations
  }

  pub fn networks(&self) -> &NetworkRepository<S> {
    &self.networks
  }

  /// Empty both caches.
  pub fn clear_cache(&self) -> Result<(), StoreError> {
    self.organizations.clear_cache()?;
    self.networks.clear_cache()
  }
}
