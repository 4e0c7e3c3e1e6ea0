//! Error types for `vigil-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("event list must contain at least one event")]
  EmptyEventList,

  #[error("event {event_id} has partition key {found:?}, list is keyed by {expected:?}")]
  MixedPartitionKeys {
    event_id: uuid::Uuid,
    expected: String,
    found:    String,
  },

  #[error("situation id must not be empty")]
  EmptySituationId,

  #[error("situation already stored: {0}")]
  DuplicateSituation(String),

  #[error("situation not found: {0}")]
  NotFound(String),

  #[error("unknown resolution state: {0:?}")]
  UnknownResolutionState(String),

  #[error("unknown severity: {0:?}")]
  UnknownSeverity(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
