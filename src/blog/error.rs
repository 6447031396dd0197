//! Error taxonomy for the post repository and the classifier used when logging
//! transport failures.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Failure reported by a [`Transport`](super::transport::Transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
  /// Backend unreachable, connection reset or timed out
  #[error("network unavailable: {0}")]
  Network(String),
  /// Backend answered with a non-2xx status
  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },
  /// Response body was not the expected JSON
  #[error("invalid response body: {0}")]
  Decode(String),
}

impl TransportError {
  /// Whether retrying the same request could succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Network(_) => true,
      Self::Status { status, .. } => (500..600).contains(status),
      Self::Decode(_) => false,
    }
  }

  pub fn category(&self) -> ErrorCategory {
    ErrorCategory::classify(self)
  }
}

/// Human-facing grouping of transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
  NetworkDown,
  BadRequest,
  NotFound,
  ServerError,
  Unknown,
}

impl ErrorCategory {
  pub fn classify(err: &TransportError) -> Self {
    match err {
      TransportError::Network(_) => Self::NetworkDown,
      TransportError::Status { status: 400, .. } => Self::BadRequest,
      TransportError::Status { status: 404, .. } => Self::NotFound,
      TransportError::Status { status, .. } if (500..600).contains(status) => Self::ServerError,
      _ => Self::Unknown,
    }
  }
}

impl fmt::Display for ErrorCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::NetworkDown => "network-down",
      Self::BadRequest => "bad-request",
      Self::NotFound => "not-found",
      Self::ServerError => "server-error",
      Self::Unknown => "unknown",
    };
    f.write_str(name)
  }
}

/// Readable explanation of a transport failure, suitable for showing a user.
pub fn describe(err: &TransportError) -> String {
  match (ErrorCategory::classify(err), err) {
    (ErrorCategory::NetworkDown, _) => {
      "Network error: Please check your internet connection.".to_string()
    }
    (ErrorCategory::BadRequest, _) => "Bad Request. Please check your input.".to_string(),
    (ErrorCategory::NotFound, _) => "The requested resource was not found.".to_string(),
    (ErrorCategory::ServerError, _) => "Server error. Please try again later.".to_string(),
    (ErrorCategory::Unknown, TransportError::Status { status, message }) => {
      format!("Unexpected error (code {}): {}", status, message)
    }
    (ErrorCategory::Unknown, other) => format!("Unexpected error: {}", other),
  }
}

/// Errors surfaced by [`PostRepository`](super::repository::PostRepository).
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("network unavailable: {0}")]
  NetworkUnavailable(String),

  #[error("server error (HTTP {status}): {message}")]
  ServerError { status: u16, message: String },

  #[error("post {0} not found")]
  NotFound(u64),

  #[error("update of post {0} failed and no cached copy was available")]
  UpdateFailed(u64),

  #[error("store error: {0}")]
  Store(String),

  #[error("decode error: {0}")]
  Decode(String),
}

impl From<TransportError> for ApiError {
  fn from(err: TransportError) -> Self {
    match err {
      TransportError::Network(msg) => Self::NetworkUnavailable(msg),
      TransportError::Status { status, message } => Self::ServerError { status, message },
      TransportError::Decode(msg) => Self::Decode(msg),
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(err: StoreError) -> Self {
    Self::Store(err.to_string())
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

pub type ApiResult<T> = Result<T, ApiError>;
