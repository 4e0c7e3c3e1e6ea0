//! Error type for `vigil-epn`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Publish under the `Reject` backpressure policy found the target
  /// delivery queue full.
  #[error("delivery queue full for node {node:?}, key {key:?}")]
  QueueFull { node: String, key: String },

  #[error("engine is shut down")]
  ShutDown,

  #[error("core error: {0}")]
  Core(#[from] vigil_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
