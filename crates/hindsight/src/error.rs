use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HindsightError>;

/// Top-level failure categories surfaced by the `hindsight` binary
#[derive(Debug, Error)]
pub enum HindsightError {
  #[error("invalid input: {0}")]
  Input(String),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  ExternalApi(#[from] TrackerError),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl HindsightError {
  /// Process exit code for this failure category
  pub fn exit_code(&self) -> i32 {
    match self {
      HindsightError::Config(_) => 2,
      HindsightError::Store(_) => 3,
      HindsightError::ExternalApi(_) => 4,
      HindsightError::Input(_) | HindsightError::Io(_) => 1,
    }
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("history store not found: {}", .0.display())]
  Missing(PathBuf),

  #[error("history store i/o failed for {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("history store line {line} is corrupt: {source}")]
  Corrupt {
    line: usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("history store contains duplicate record id {0}")]
  DuplicateId(u64),

  #[error("failed to encode record {id}: {source}")]
  Encode {
    id: u64,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Error)]
pub enum TrackerError {
  #[error("issue tracker authentication failed: {0}")]
  Auth(String),

  #[error("issue #{0} not found")]
  NotFound(u64),

  #[error("issue tracker {operation} failed: {message}")]
  Request { operation: String, message: String },
}

impl TrackerError {
  pub fn request(operation: &str, message: impl ToString) -> Self {
    TrackerError::Request { operation: operation.to_string(), message: message.to_string() }
  }
}
