use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

use super::message::{HttpRequest, HttpResponse};
use super::pipeline::{Next, Stage};
use crate::error::HttpError;

/// Adds fixed headers to every attempt. Headers already set on the request win.
pub struct DefaultHeaders {
  headers: HeaderMap,
}

impl DefaultHeaders {
  pub fn new(headers: HeaderMap) -> Self {
    Self { headers }
  }

  /// `Accept: application/json` plus a crate `User-Agent`.
  pub fn json() -> Self {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("netreg/", env!("CARGO_PKG_VERSION"))),
    );
    Self::new(headers)
  }
}

#[async_trait]
impl Stage for DefaultHeaders {
  async fn handle(
    &self,
    mut request: HttpRequest,
    next: Next<'_>,
  ) -> Result<HttpResponse, HttpError> {
    for (name, value) in &self.headers {
      if !request.headers.contains_key(name) {
        request.headers.insert(name.clone(), value.clone());
      }
    }
    next.run(request).await
  }
}
