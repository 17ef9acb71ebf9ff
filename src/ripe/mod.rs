//! RIPE database domain: entities, response shapes, the REST client and the
//! cache-aside repositories built on top of it.

pub mod api_types;
mod cache;
pub mod client;
pub mod dispatch;
pub mod extract;
pub mod repository;
pub mod types;

pub use client::{ObjectType, RegistrySource, RipeClient};
pub use dispatch::{classify, QueryKind, SearchDispatcher, SearchOutcome};
pub use repository::{FailurePolicy, NetworkRepository, OrganizationRepository};
pub use types::{Network, Organization};
