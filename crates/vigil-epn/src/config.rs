//! Engine tunables, deserialised from the server's `config.toml`.

use std::time::Duration;

use serde::Deserialize;

/// What `publish` does when a per-(node, key) delivery queue is full.
/// This is an exposed policy choice, never a hidden behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
  /// Await queue space; the publisher blocks.
  #[default]
  Block,
  /// Fail the publish with [`crate::Error::QueueFull`].
  Reject,
}

/// Runtime engine configuration. All fields have defaults so a missing
/// `[engine]` section yields a working engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Depth of each per-(node, key) delivery queue.
  pub queue_depth:        usize,
  /// Retries after the first failed invocation; `0` disables retry.
  pub max_retries:        u32,
  /// Base backoff between retries; attempt `n` waits `n ×` this.
  pub retry_backoff_ms:   u64,
  /// Budget for a single node invocation; exceeding it counts as a
  /// transient failure.
  pub process_timeout_ms: u64,
  pub backpressure:       BackpressurePolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      queue_depth:        64,
      max_retries:        3,
      retry_backoff_ms:   50,
      process_timeout_ms: 5_000,
      backpressure:       BackpressurePolicy::Block,
    }
  }
}

impl EngineConfig {
  pub fn retry_backoff(&self) -> Duration {
    Duration::from_millis(self.retry_backoff_ms)
  }

  pub fn process_timeout(&self) -> Duration {
    Duration::from_millis(self.process_timeout_ms)
  }
}
