//! Mapping from raw search responses to domain entities.
//!
//! Objects missing a required attribute are dropped, never reported as errors.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::api_types::SearchResponse;
use super::types::{Network, Organization};

/// Format of the `created` attribute, e.g. `2004-04-17T09:57:29Z`.
pub const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Networks from objects carrying `inetnum`, `netname` and `org`.
pub fn extract_networks(response: &SearchResponse) -> Vec<Network> {
  response
    .objects()
    .iter()
    .filter_map(|object| {
      Some(Network {
        inetnum: object.attribute("inetnum")?.to_string(),
        netname: object.attribute("netname")?.to_string(),
        country: object.attribute("country").map(String::from),
        organization_id: object.attribute("org")?.to_string(),
      })
    })
    .collect()
}

/// Organisations from objects carrying `org-name`, a parseable `created` and
/// `organisation`.
pub fn extract_organizations(response: &SearchResponse) -> Vec<Organization> {
  response
    .objects()
    .iter()
    .filter_map(|object| {
      let name = object.attribute("org-name")?;
      let created = parse_created(object.attribute("created")?)?;
      let id = object.attribute("organisation")?;

      Some(Organization {
        id: id.to_string(),
        name: name.to_string(),
        country: object.attribute("country").map(String::from),
        created: Some(created),
      })
    })
    .collect()
}

pub fn parse_created(value: &str) -> Option<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(value, CREATED_FORMAT)
    .map(|dt| dt.and_utc())
    .ok()
}
