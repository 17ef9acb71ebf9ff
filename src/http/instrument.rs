//! Connection lifecycle timings.
//!
//! The [`Instrumentation`] stage opens a [`CallTimeline`] for each exchange
//! and makes it reachable from the transport through a task-local, so the
//! transport, its connector layer and its DNS resolver can mark the phases
//! they observe. Connections reused from the pool record no connect or DNS
//! phases. Timings
//! are logged at debug level and never influence the outcome.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::message::{HttpRequest, HttpResponse};
use super::pipeline::{Next, Stage};
use crate::error::HttpError;

tokio::task_local! {
  static CURRENT: Arc<CallTimeline>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  CallStart,
  /// Request handed to the HTTP client, before any connection is chosen
  RequestStart,
  /// New connection started. Encloses DNS, TCP and the TLS handshake.
  ConnectStart,
  DnsStart,
  DnsEnd,
  ConnectEnd,
  ConnectFailed,
  ResponseHeadersEnd,
  CallEnd,
  CallFailed,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Phase::CallStart => "callStart",
      Phase::RequestStart => "requestStart",
      Phase::ConnectStart => "connectStart",
      Phase::DnsStart => "dnsStart",
      Phase::DnsEnd => "dnsEnd",
      Phase::ConnectEnd => "connectEnd",
      Phase::ConnectFailed => "connectFailed",
      Phase::ResponseHeadersEnd => "responseHeadersEnd",
      Phase::CallEnd => "callEnd",
      Phase::CallFailed => "callFailed",
    };
    f.write_str(name)
  }
}

/// Phase marks for one exchange, relative to its start.
#[derive(Debug)]
pub struct CallTimeline {
  started: Instant,
  events: Mutex<Vec<(Phase, Duration)>>,
}

impl CallTimeline {
  fn new() -> Self {
    Self {
      started: Instant::now(),
      events: Mutex::new(Vec::new()),
    }
  }

  pub fn record(&self, phase: Phase) {
    let elapsed = self.started.elapsed();
    if let Ok(mut events) = self.events.lock() {
      events.push((phase, elapsed));
    }
  }

  pub fn events(&self) -> Vec<(Phase, Duration)> {
    self
      .events
      .lock()
      .map(|events| events.clone())
      .unwrap_or_default()
  }
}

/// Timeline of the exchange running on this task, if any.
pub(crate) fn current() -> Option<Arc<CallTimeline>> {
  CURRENT.try_with(Arc::clone).ok()
}

/// Mark a phase on the current timeline. No-op outside an instrumented call.
pub(crate) fn record(phase: Phase) {
  if let Some(timeline) = current() {
    timeline.record(phase);
  }
}

type Observer = Arc<dyn Fn(&Url, &CallTimeline) + Send + Sync>;

/// Innermost stage recording per-attempt timings.
#[derive(Default)]
pub struct Instrumentation {
  observer: Option<Observer>,
}

impl Instrumentation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Also hand each finished timeline to `observer`.
  pub fn with_observer(observer: impl Fn(&Url, &CallTimeline) + Send + Sync + 'static) -> Self {
    Self {
      observer: Some(Arc::new(observer)),
    }
  }
}

#[async_trait]
impl Stage for Instrumentation {
  async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, HttpError> {
    let url = request.url.clone();
    let timeline = Arc::new(CallTimeline::new());
    timeline.record(Phase::CallStart);

    let result = CURRENT.scope(timeline.clone(), next.run(request)).await;

    timeline.record(if result.is_ok() {
      Phase::CallEnd
    } else {
      Phase::CallFailed
    });

    for (phase, elapsed) in timeline.events() {
      debug!(
        target: "netreg::http::lifecycle",
        %url,
        "{} in {}ms",
        phase,
        elapsed.as_millis()
      );
    }
    if let Some(observer) = &self.observer {
      observer(&url, &timeline);
    }

    result
  }
}
