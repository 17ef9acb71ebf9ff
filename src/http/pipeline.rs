//! Stage chaining.

use std::sync::Arc;

use async_trait::async_trait;

use super::classify::Classification;
use super::headers::DefaultHeaders;
use super::instrument::Instrumentation;
use super::message::{HttpRequest, HttpResponse};
use super::retry::Retry;
use super::ClientConfig;
use crate::error::HttpError;

/// Performs exactly one HTTP exchange.
///
/// Any received status, including 4xx and 5xx, is returned as `Ok`. Only a
/// failure to obtain a response at all is an `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// One step of the pipeline. A stage may inspect or rewrite the request,
/// call `next` zero or more times, and inspect or replace the outcome.
#[async_trait]
pub trait Stage: Send + Sync {
  async fn handle(&self, request: HttpRequest, next: Next<'_>)
    -> Result<HttpResponse, HttpError>;
}

/// The remainder of the chain below the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
  stages: &'a [Arc<dyn Stage>],
  transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
  /// Hand the request to the next stage, or to the transport at the bottom.
  pub async fn run(self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
    match self.stages.split_first() {
      Some((stage, rest)) => {
        let next = Next {
          stages: rest,
          transport: self.transport,
        };
        stage.handle(request, next).await
      }
      None => self.transport.send(request).await,
    }
  }
}

/// An ordered stage list bound to a transport.
#[derive(Clone)]
pub struct Pipeline {
  stages: Arc<[Arc<dyn Stage>]>,
  transport: Arc<dyn Transport>,
}

impl Pipeline {
  pub fn builder(transport: impl Transport + 'static) -> PipelineBuilder {
    PipelineBuilder {
      stages: Vec::new(),
      transport: Arc::new(transport),
    }
  }

  /// Classification, retry, default headers and instrumentation, in that order.
  pub fn standard(transport: impl Transport + 'static, config: &ClientConfig) -> Self {
    Self::builder(transport)
      .stage(Classification)
      .stage(Retry::new(config.max_retries, config.retry_delay))
      .stage(DefaultHeaders::json())
      .stage(Instrumentation::new())
      .build()
  }

  pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
    Next {
      stages: &self.stages,
      transport: self.transport.as_ref(),
    }
    .run(request)
    .await
  }
}

pub struct PipelineBuilder {
  stages: Vec<Arc<dyn Stage>>,
  transport: Arc<dyn Transport>,
}

impl PipelineBuilder {
  /// Append a stage below the ones already added.
  pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
    self.stages.push(Arc::new(stage));
    self
  }

  pub fn build(self) -> Pipeline {
    Pipeline {
      stages: self.stages.into(),
      transport: self.transport,
    }
  }
}
