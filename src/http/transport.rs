use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tower::{Layer, Service};

use super::instrument::{self, Phase};
use super::message::{HttpRequest, HttpResponse};
use super::pipeline::Transport;
use super::ClientConfig;
use crate::error::HttpError;

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
    let client = reqwest::Client::builder()
      .connect_timeout(config.connect_timeout)
      .read_timeout(config.read_timeout)
      .dns_resolver(Arc::new(TimingResolver))
      .connector_layer(ConnectTimingLayer)
      .build()
      .map_err(|e| HttpError::transport(format!("failed to create HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
    instrument::record(Phase::RequestStart);

    let response = self
      .client
      .request(request.method, request.url)
      .headers(request.headers)
      .send()
      .await
      .map_err(|e| HttpError::transport(e.to_string()))?;

    instrument::record(Phase::ResponseHeadersEnd);
    Ok(HttpResponse::from_reqwest(response))
  }
}

/// System resolver that marks DNS phases on the current call timeline.
struct TimingResolver;

impl Resolve for TimingResolver {
  fn resolve(&self, name: Name) -> Resolving {
    let timeline = instrument::current();
    Box::pin(async move {
      if let Some(timeline) = &timeline {
        timeline.record(Phase::DnsStart);
      }
      // Port is replaced by the connector.
      let resolved = tokio::net::lookup_host((name.as_str(), 0)).await;
      if let Some(timeline) = &timeline {
        timeline.record(Phase::DnsEnd);
      }

      let addrs: Vec<SocketAddr> = resolved?.collect();
      Ok::<Addrs, Box<dyn std::error::Error + Send + Sync>>(Box::new(addrs.into_iter()))
    })
  }
}

/// Marks connect phases around reqwest's connector (DNS, TCP and TLS).
#[derive(Debug, Clone, Copy)]
struct ConnectTimingLayer;

impl<S> Layer<S> for ConnectTimingLayer {
  type Service = ConnectTiming<S>;

  fn layer(&self, inner: S) -> Self::Service {
    ConnectTiming { inner }
  }
}

#[derive(Debug, Clone)]
struct ConnectTiming<S> {
  inner: S,
}

impl<S, R> Service<R> for ConnectTiming<S>
where
  S: Service<R>,
  S::Response: Send + 'static,
  S::Error: Send + 'static,
  S::Future: Send + 'static,
{
  type Response = S::Response;
  type Error = S::Error;
  type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

  fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, request: R) -> Self::Future {
    // The connect future may finish on a pool task, so capture the timeline here.
    let timeline = instrument::current();
    if let Some(timeline) = &timeline {
      timeline.record(Phase::ConnectStart);
    }

    let connecting = self.inner.call(request);
    Box::pin(async move {
      let result = connecting.await;
      if let Some(timeline) = &timeline {
        timeline.record(if result.is_ok() {
          Phase::ConnectEnd
        } else {
          Phase::ConnectFailed
        });
      }
      result
    })
  }
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use std::sync::Mutex;

  use super::*;
  use crate::http::{Instrumentation, Pipeline};

  fn observed_pipeline(transport: ReqwestTransport) -> (Pipeline, Arc<Mutex<Vec<Phase>>>) {
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    let pipeline = Pipeline::builder(transport)
      .stage(Instrumentation::with_observer(move |_, timeline| {
        sink
          .lock()
          .unwrap()
          .extend(timeline.events().into_iter().map(|(phase, _)| phase));
      }))
      .build();
    (pipeline, phases)
  }

  #[tokio::test]
  async fn test_fresh_connection_records_connect_phases_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
      .mount(&server)
      .await;

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let (pipeline, phases) = observed_pipeline(transport);

    // A host name, not an IP literal, so the resolver runs.
    let url = format!("http://localhost:{}/search.json", server.address().port())
      .parse()
      .unwrap();
    pipeline.execute(HttpRequest::get(url)).await.unwrap();

    assert_eq!(
      *phases.lock().unwrap(),
      vec![
        Phase::CallStart,
        Phase::RequestStart,
        Phase::ConnectStart,
        Phase::DnsStart,
        Phase::DnsEnd,
        Phase::ConnectEnd,
        Phase::ResponseHeadersEnd,
        Phase::CallEnd,
      ]
    );
  }

  #[tokio::test]
  async fn test_refused_connection_records_connect_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let (pipeline, phases) = observed_pipeline(transport);

    let url = format!("http://{}/search.json", addr).parse().unwrap();
    pipeline.execute(HttpRequest::get(url)).await.unwrap_err();

    let phases = phases.lock().unwrap();
    assert!(phases.contains(&Phase::ConnectStart));
    assert!(phases.contains(&Phase::ConnectFailed));
    assert!(!phases.contains(&Phase::ResponseHeadersEnd));
    assert_eq!(phases.last(), Some(&Phase::CallFailed));
  }

  #[tokio::test]
  async fn test_sends_request_and_keeps_error_bodies_readable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/search.json"))
      .and(header("accept", "application/json"))
      .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"objects":null}"#))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/missing.json"))
      .respond_with(ResponseTemplate::new(404).set_body_string("no such object"))
      .mount(&server)
      .await;

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let pipeline = Pipeline::builder(transport.clone())
      .stage(crate::http::DefaultHeaders::json())
      .build();

    let url = format!("{}/search.json", server.uri()).parse().unwrap();
    let response = pipeline.execute(HttpRequest::get(url)).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.bytes().await.unwrap(), br#"{"objects":null}"#);

    let url = format!("{}/missing.json", server.uri()).parse().unwrap();
    let response = transport.send(HttpRequest::get(url)).await.unwrap();
    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(response.bytes().await.unwrap(), b"no such object");
  }

  #[tokio::test]
  async fn test_released_body_does_not_block_next_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/missing.json"))
      .respond_with(ResponseTemplate::new(404).set_body_string("x".repeat(64 * 1024)))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/search.json"))
      .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
      .mount(&server)
      .await;

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();

    let url = format!("{}/missing.json", server.uri()).parse().unwrap();
    transport.send(HttpRequest::get(url)).await.unwrap().release();

    let url = format!("{}/search.json", server.uri()).parse().unwrap();
    let response = transport.send(HttpRequest::get(url)).await.unwrap();
    assert_eq!(response.bytes().await.unwrap(), b"{}");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_connection_refused_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let url = format!("http://{}/search.json", addr).parse().unwrap();
    let err = transport.send(HttpRequest::get(url)).await.unwrap_err();

    assert!(matches!(err, HttpError::Transport { .. }));
  }
}
