use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::fmt;
use url::Url;

use crate::config::ApiConfig;
use crate::error::HttpError;
use crate::http::{HttpRequest, Pipeline, ReqwestTransport};

use super::api_types::SearchResponse;

/// Object types the registry can look up by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
  Organisation,
  Inetnum,
}

impl ObjectType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ObjectType::Organisation => "organisation",
      ObjectType::Inetnum => "inetnum",
    }
  }
}

impl fmt::Display for ObjectType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Read-only registry queries. Every call is idempotent.
#[async_trait]
pub trait RegistrySource: Send + Sync {
  /// Free-text organisation search.
  async fn search_by_query_string(&self, text: &str) -> Result<SearchResponse, HttpError>;

  /// Single object by primary key.
  async fn get_object_by_id(
    &self,
    object_type: ObjectType,
    id: &str,
  ) -> Result<SearchResponse, HttpError>;

  /// Networks whose `org` attribute references `org_id`.
  async fn search_by_inverse_org(&self, org_id: &str) -> Result<SearchResponse, HttpError>;

  /// Networks containing or matching `ip`.
  async fn search_by_ip(&self, ip: &str) -> Result<SearchResponse, HttpError>;
}

/// RIPE REST API client
#[derive(Clone)]
pub struct RipeClient {
  pipeline: Pipeline,
  base_url: Url,
  source: String,
}

impl RipeClient {
  /// Client over the standard pipeline and a `reqwest` transport.
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let client_config = config.client_config();
    let transport = ReqwestTransport::new(&client_config)
      .map_err(|e| eyre!("Failed to create registry client: {}", e))?;
    let pipeline = Pipeline::standard(transport, &client_config);

    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid registry URL {}: {}", config.base_url, e))?;

    Self::with_pipeline(base_url, &config.source, pipeline)
  }

  pub fn with_pipeline(base_url: Url, source: &str, pipeline: Pipeline) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Registry URL {} cannot carry a path", base_url));
    }

    Ok(Self {
      pipeline,
      base_url,
      source: source.to_string(),
    })
  }

  fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, HttpError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| HttpError::InvalidRequest {
        message: format!("{} cannot carry a path", self.base_url),
      })?
      .pop_if_empty()
      .extend(segments);
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
  }

  fn search_url(&self, query: &[(&str, &str)]) -> Result<Url, HttpError> {
    self.url(&["search.json"], query)
  }

  async fn get(&self, url: Url) -> Result<SearchResponse, HttpError> {
    let response = self.pipeline.execute(HttpRequest::get(url)).await?;
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| HttpError::Decode {
      message: e.to_string(),
    })
  }
}

#[async_trait]
impl RegistrySource for RipeClient {
  async fn search_by_query_string(&self, text: &str) -> Result<SearchResponse, HttpError> {
    let url = self.search_url(&[
      ("query-string", text),
      ("source", self.source.as_str()),
      ("type-filter", "organisation"),
      ("flags", "no-referenced"),
    ])?;
    self.get(url).await
  }

  async fn get_object_by_id(
    &self,
    object_type: ObjectType,
    id: &str,
  ) -> Result<SearchResponse, HttpError> {
    let file = format!("{}.json", id);
    let url = self.url(&[self.source.as_str(), object_type.as_str(), file.as_str()], &[])?;
    self.get(url).await
  }

  async fn search_by_inverse_org(&self, org_id: &str) -> Result<SearchResponse, HttpError> {
    let url = self.search_url(&[
      ("inverse-attribute", "org"),
      ("type-filter", "inetnum"),
      ("source", self.source.as_str()),
      ("query-string", org_id),
      ("flags", "no-referenced"),
    ])?;
    self.get(url).await
  }

  async fn search_by_ip(&self, ip: &str) -> Result<SearchResponse, HttpError> {
    let url = self.search_url(&[
      ("query-string", ip),
      ("source", self.source.as_str()),
      ("type-filter", "inetnum"),
      ("flags", "no-referenced"),
    ])?;
    self.get(url).await
  }
}
