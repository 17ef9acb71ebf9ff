use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::message::{HttpRequest, HttpResponse};
use super::pipeline::{Next, Stage};
use crate::error::HttpError;

/// Fixed-delay retry for transport failures and 5xx responses.
///
/// Only safe for idempotent requests. Any status below 500 ends the loop at
/// once, so 4xx responses reach the caller after a single attempt.
pub struct Retry {
  max_retries: u32,
  delay: Duration,
}

impl Retry {
  /// `max_retries` is the total number of attempts and is at least one.
  pub fn new(max_retries: u32, delay: Duration) -> Self {
    Self {
      max_retries: max_retries.max(1),
      delay,
    }
  }
}

#[async_trait]
impl Stage for Retry {
  async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, HttpError> {
    let mut last_error = None;

    for attempt in 1..=self.max_retries {
      debug!(attempt, url = %request.url, "sending request");

      match next.run(request.clone()).await {
        Ok(response) if !response.status.is_server_error() => return Ok(response),
        Ok(response) => {
          let error = HttpError::Server {
            code: response.status.as_u16(),
            message: response.reason().to_string(),
          };
          response.release();
          warn!(attempt, url = %request.url, %error, "attempt failed with server error");
          last_error = Some(error);
        }
        Err(error) if error.is_retryable() => {
          warn!(attempt, url = %request.url, %error, "attempt failed");
          last_error = Some(error);
        }
        Err(error) => return Err(error),
      }

      if attempt < self.max_retries {
        tokio::time::sleep(self.delay).await;
      }
    }

    Err(last_error.unwrap_or_else(|| {
      HttpError::transport(format!(
        "no response after {} attempts",
        self.max_retries
      ))
    }))
  }
}

#[cfg(test)]
mod tests {
  use std::time::Instant;

  use super::*;
  use crate::http::pipeline::testing::ScriptedTransport;
  use crate::http::{Classification, Pipeline};

  fn request() -> HttpRequest {
    HttpRequest::get("https://rest.db.ripe.net/search.json".parse().unwrap())
  }

  fn pipeline(transport: &ScriptedTransport, max_retries: u32) -> Pipeline {
    Pipeline::builder(transport.clone())
      .stage(Classification)
      .stage(Retry::new(max_retries, Duration::from_millis(1)))
      .build()
  }

  #[tokio::test]
  async fn test_recovers_after_two_server_errors() {
    let transport = ScriptedTransport::new(vec![Ok((503, "")), Ok((503, "")), Ok((200, "ok"))]);

    let response = pipeline(&transport, 3).execute(request()).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(transport.calls(), 3);
  }

  #[tokio::test]
  async fn test_persistent_server_error_exhausts_attempts() {
    let transport = ScriptedTransport::always(503, "");

    let err = pipeline(&transport, 3).execute(request()).await.unwrap_err();

    assert!(matches!(err, HttpError::Server { code: 503, .. }));
    assert_eq!(transport.calls(), 3);
  }

  #[tokio::test]
  async fn test_client_error_is_not_retried() {
    let transport = ScriptedTransport::always(404, "");

    let err = pipeline(&transport, 3).execute(request()).await.unwrap_err();

    assert!(matches!(err, HttpError::Client { code: 404, .. }));
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_transport_failures_are_retried_and_last_one_surfaces() {
    let transport = ScriptedTransport::new(vec![
      Err(HttpError::transport("connection refused")),
      Err(HttpError::transport("connection reset")),
    ]);

    let err = pipeline(&transport, 4).execute(request()).await.unwrap_err();

    assert_eq!(err, HttpError::transport("connection reset"));
    assert_eq!(transport.calls(), 4);
  }

  #[tokio::test]
  async fn test_transport_failure_then_success() {
    let transport = ScriptedTransport::new(vec![
      Err(HttpError::transport("timed out")),
      Ok((200, "{}")),
    ]);

    let response = pipeline(&transport, 3).execute(request()).await.unwrap();

    assert!(response.is_success());
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_zero_retries_still_attempts_once() {
    let transport = ScriptedTransport::always(200, "");
    pipeline(&transport, 0).execute(request()).await.unwrap();
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_waits_between_attempts_but_not_after_last() {
    let transport = ScriptedTransport::always(500, "");
    let pipeline = Pipeline::builder(transport.clone())
      .stage(Retry::new(3, Duration::from_millis(40)))
      .build();

    let started = Instant::now();
    let err = pipeline.execute(request()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, HttpError::Server { code: 500, .. }));
    assert!(elapsed >= Duration::from_millis(80));
    assert!(elapsed < Duration::from_millis(1000));
  }
}
