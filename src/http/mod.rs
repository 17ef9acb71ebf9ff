//! Resilient HTTP pipeline for read-only registry queries.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s wrapped around a single
//! [`Transport`] call. The standard composition, outermost first, is:
//!
//! 1. [`Classification`] - turns a final non-2xx response into an [`HttpError`]
//! 2. [`Retry`] - repeats transport failures and 5xx responses
//! 3. [`DefaultHeaders`] - adds `Accept` and `User-Agent`
//! 4. [`Instrumentation`] - records connection lifecycle timings
//!
//! Classification must stay outside retry so that retry sees raw status codes.
//!
//! [`HttpError`]: crate::error::HttpError

mod classify;
mod headers;
mod instrument;
mod message;
mod pipeline;
mod retry;
mod transport;

use std::time::Duration;

pub use classify::Classification;
pub use headers::DefaultHeaders;
pub use instrument::{CallTimeline, Instrumentation, Phase};
pub use message::{HttpRequest, HttpResponse};
pub use pipeline::{Next, Pipeline, PipelineBuilder, Stage, Transport};
pub use retry::Retry;
pub use transport::ReqwestTransport;

#[cfg(test)]
pub(crate) use pipeline::testing as pipeline_testing;

/// Client settings passed explicitly to the pipeline and transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Per-attempt connect timeout
  pub connect_timeout: Duration,
  /// Per-attempt read timeout
  pub read_timeout: Duration,
  /// Total attempts for a retryable request, including the first
  pub max_retries: u32,
  /// Fixed wait between attempts
  pub retry_delay: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      connect_timeout: Duration::from_secs(30),
      read_timeout: Duration::from_secs(30),
      max_retries: 3,
      retry_delay: Duration::from_millis(1000),
    }
  }
}
