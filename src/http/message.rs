use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::HttpError;

/// An outgoing request. Cloned once per retry attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  pub headers: HeaderMap,
}

impl HttpRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      headers: HeaderMap::new(),
    }
  }

  /// Header value as a string, if present and valid UTF-8.
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }
}

#[derive(Debug)]
enum Body {
  Buffered(Vec<u8>),
  /// Unread body still attached to the underlying connection
  Streaming(reqwest::Response),
}

/// A received response. The body stays unread until [`HttpResponse::bytes`]
/// is called. Dropping or [`release`](HttpResponse::release)-ing a response
/// with an unread body closes its connection instead of returning it to the
/// pool. A fully read body leaves the connection reusable.
#[derive(Debug)]
pub struct HttpResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  body: Body,
}

impl HttpResponse {
  /// Build a response from an in-memory body.
  pub fn from_bytes(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: HeaderMap::new(),
      body: Body::Buffered(body.into()),
    }
  }

  pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
    Self {
      status: response.status(),
      headers: response.headers().clone(),
      body: Body::Streaming(response),
    }
  }

  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  /// Reason phrase for the status code.
  pub fn reason(&self) -> &'static str {
    self.status.canonical_reason().unwrap_or("Unknown Status")
  }

  /// Read the whole body.
  pub async fn bytes(self) -> Result<Vec<u8>, HttpError> {
    match self.body {
      Body::Buffered(bytes) => Ok(bytes),
      Body::Streaming(response) => response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| HttpError::transport(format!("failed to read response body: {}", e))),
    }
  }

  /// Discard the body without reading it, closing the connection if the body
  /// was still streaming.
  pub fn release(self) {
    drop(self.body);
  }
}
