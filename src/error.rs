//! Error types shared by the HTTP pipeline, the cache store and the repositories.

/// Failure of a single remote exchange, as seen by callers of the pipeline.
///
/// Status-bearing variants carry the HTTP code and reason phrase. `Transport`
/// covers I/O failures where no response was received at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
  /// 4xx: the request is invalid or the resource does not exist. Never retried.
  #[error("HTTP client error {code}: {message}")]
  Client { code: u16, message: String },

  /// 5xx: transient upstream failure. Retried.
  #[error("HTTP server error {code}: {message}")]
  Server { code: u16, message: String },

  /// Any other non-2xx status. Not retried.
  #[error("HTTP error {code}: {message}")]
  Generic { code: u16, message: String },

  /// Connection refused, reset, timed out. Retried.
  #[error("transport failure: {message}")]
  Transport { message: String },

  /// The request could not be built (bad base URL, bad path segment).
  #[error("invalid request: {message}")]
  InvalidRequest { message: String },

  /// A successful response whose body is not a registry search document.
  #[error("failed to decode response body: {message}")]
  Decode { message: String },
}

impl HttpError {
  /// Map a non-2xx status onto the matching variant.
  pub fn from_status(code: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    match code {
      400..=499 => Self::Client { code, message },
      500..=599 => Self::Server { code, message },
      _ => Self::Generic { code, message },
    }
  }

  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport {
      message: message.into(),
    }
  }

  /// HTTP status code, if a response was received.
  pub fn code(&self) -> Option<u16> {
    match self {
      Self::Client { code, .. } | Self::Server { code, .. } | Self::Generic { code, .. } => {
        Some(*code)
      }
      Self::Transport { .. } | Self::InvalidRequest { .. } | Self::Decode { .. } => None,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Client { message, .. }
      | Self::Server { message, .. }
      | Self::Generic { message, .. }
      | Self::Transport { message }
      | Self::InvalidRequest { message }
      | Self::Decode { message } => message,
    }
  }

  /// Whether another attempt may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Server { .. } | Self::Transport { .. })
  }
}

/// Failure of the local cache store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to prepare cache directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("could not determine data directory")]
  NoDataDir,

  #[error("cache lock poisoned")]
  LockPoisoned,
}

/// Failure surfaced by a repository operation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
  /// An id lookup produced no entity, locally or remotely.
  #[error("{entity} '{key}' not found")]
  NotFound { entity: &'static str, key: String },

  /// Remote failure, only surfaced under [`OnRemoteFailure::Propagate`].
  ///
  /// [`OnRemoteFailure::Propagate`]: crate::cache::OnRemoteFailure::Propagate
  #[error(transparent)]
  Remote(#[from] HttpError),

  #[error(transparent)]
  Storage(#[from] StoreError),
}

impl RepositoryError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
