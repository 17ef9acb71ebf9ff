//! Serde-deserializable types matching RIPE REST API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs. Every field is
//! optional; the extractor decides what is required.

use serde::Deserialize;

/// Body of `search.json` and of single-object lookups.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
  pub objects: Option<ObjectList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectList {
  pub object: Option<Vec<RegistryObject>>,
}

#[derive(Debug, Deserialize)]
pub struct RegistryObject {
  #[serde(rename = "type")]
  pub object_type: Option<String>,
  pub link: Option<Link>,
  #[serde(rename = "primary-key")]
  pub primary_key: Option<AttributeList>,
  pub attributes: Option<AttributeList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttributeList {
  #[serde(default)]
  pub attribute: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
pub struct Attribute {
  pub name: Option<String>,
  pub value: Option<String>,
  pub link: Option<Link>,
  #[serde(rename = "referenced-type")]
  pub referenced_type: Option<String>,
  pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
  #[serde(rename = "type")]
  pub link_type: Option<String>,
  pub href: Option<String>,
}

impl SearchResponse {
  /// Objects in response order. Empty when the list is absent.
  pub fn objects(&self) -> &[RegistryObject] {
    self
      .objects
      .as_ref()
      .and_then(|list| list.object.as_deref())
      .unwrap_or_default()
  }
}

impl RegistryObject {
  /// Value of the first attribute called `name`.
  ///
  /// `None` when the object has no attribute list, no such attribute, or the
  /// attribute has no value.
  pub fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .as_ref()?
      .attribute
      .iter()
      .find(|a| a.name.as_deref() == Some(name))?
      .value
      .as_deref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_search_document_and_ignores_extra_fields() {
    let body = r#"{
      "service": {"name": "search"},
      "objects": {"object": [{
        "type": "inetnum",
        "link": {"type": "locator", "href": "https://rest.db.ripe.net/ripe/inetnum/193.0.0.0 - 193.0.7.255"},
        "source": {"id": "ripe"},
        "primary-key": {"attribute": [{"name": "inetnum", "value": "193.0.0.0 - 193.0.7.255"}]},
        "attributes": {"attribute": [
          {"name": "inetnum", "value": "193.0.0.0 - 193.0.7.255"},
          {"name": "netname", "value": "RIPE-NCC"},
          {"name": "org", "value": "ORG-RIEN1-RIPE", "link": {"type": "locator", "href": "x"}, "referenced-type": "organisation"},
          {"name": "remarks", "value": "first", "comment": "note"},
          {"name": "remarks", "value": "second"}
        ]}
      }]},
      "terms-and-conditions": {"type": "locator", "href": "http://www.ripe.net/db/support/db-terms-conditions.pdf"}
    }"#;

    let response: SearchResponse = serde_json::from_str(body).unwrap();
    let objects = response.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].object_type.as_deref(), Some("inetnum"));
    assert_eq!(objects[0].attribute("netname"), Some("RIPE-NCC"));
    assert_eq!(objects[0].attribute("remarks"), Some("first"));
    assert_eq!(objects[0].attribute("country"), None);
  }

  #[test]
  fn test_absent_object_list_is_empty() {
    let response: SearchResponse = serde_json::from_str("{}").unwrap();
    assert!(response.objects().is_empty());

    let response: SearchResponse = serde_json::from_str(r#"{"objects": {}}"#).unwrap();
    assert!(response.objects().is_empty());
  }

  #[test]
  fn test_object_without_attributes_has_no_values() {
    let response: SearchResponse =
      serde_json::from_str(r#"{"objects": {"object": [{"type": "organisation"}]}}"#).unwrap();
    assert_eq!(response.objects()[0].attribute("organisation"), None);
  }
}
