//! The processing-node capability contract.
//!
//! A node consumes an [`EventList`] for a partition key, may keep per-key
//! state across invocations, and emits derived events to downstream subjects
//! or a terminal [`Situation`]. The engine is agnostic to the node's
//! internal logic; it relies only on this contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::{event::ActivityEvent, event::EventList, situation::Situation};

// ─── Per-key state ───────────────────────────────────────────────────────────

/// The opaque per-(node, key) state handle.
///
/// Exclusively owned by one node for one partition key; the engine's
/// per-(node, key) serialization — not locking inside node logic — is what
/// prevents concurrent access. The payload is JSON so state can be
/// persisted or replicated without the engine knowing its shape.
#[derive(Debug, Default)]
pub struct KeyState(Option<serde_json::Value>);

impl KeyState {
  /// Decode the current state, if any has been set.
  pub fn get<T: serde::de::DeserializeOwned>(&self) -> crate::Result<Option<T>> {
    self
      .0
      .as_ref()
      .map(|v| serde_json::from_value(v.clone()))
      .transpose()
      .map_err(Into::into)
  }

  /// Replace the state.
  pub fn set<T: serde::Serialize>(&mut self, value: &T) -> crate::Result<()> {
    self.0 = Some(serde_json::to_value(value)?);
    Ok(())
  }

  /// Drop the state, e.g. once a correlation completes.
  pub fn clear(&mut self) { self.0 = None; }

  pub fn is_empty(&self) -> bool { self.0.is_none() }
}

// ─── Node output ─────────────────────────────────────────────────────────────

/// What a node invocation produced.
///
/// Emitting nothing is not an error — it signals "not yet ready"
/// (insufficient correlated events) with state retained for the next
/// delivery.
#[derive(Debug, Default)]
pub struct NodeOutput {
  /// Derived events, grouped by the downstream subject they are published
  /// on. Each group re-enters the engine as a fresh publish.
  pub forwards:  Vec<(String, Vec<ActivityEvent>)>,
  /// A terminal situation, forwarded to the situation sink.
  pub situation: Option<Situation>,
}

impl NodeOutput {
  pub fn none() -> Self { Self::default() }

  pub fn forward(subject: impl Into<String>, events: Vec<ActivityEvent>) -> Self {
    Self {
      forwards:  vec![(subject.into(), events)],
      situation: None,
    }
  }

  pub fn situation(situation: Situation) -> Self {
    Self {
      forwards:  Vec::new(),
      situation: Some(situation),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.forwards.is_empty() && self.situation.is_none()
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A node invocation failure, classified for the engine's retry loop.
#[derive(Debug, Error)]
pub enum ProcessorError {
  /// Retryable: timeout, transient dependency unavailability. The engine
  /// replays the same list against the same state, so processing must be
  /// deterministic over (sequence, prior state).
  #[error("transient node failure: {0}")]
  Transient(String),

  /// Not retryable; the delivery is reported failed immediately.
  #[error("fatal node failure: {0}")]
  Fatal(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A unit of correlation/aggregation/rule logic in the network.
///
/// Invocations for one key are serialized by the engine and receive the
/// key's state handle exclusively. Given the same ordered sequence of lists
/// for a key, a node's observable emissions must be a deterministic function
/// of that sequence and its prior state.
#[async_trait]
pub trait EventProcessor: Send + Sync {
  async fn process(
    &self,
    key: &str,
    events: &EventList,
    state: &mut KeyState,
  ) -> Result<NodeOutput, ProcessorError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_state_round_trip() {
    let mut state = KeyState::default();
    assert!(state.is_empty());

    state.set(&42u64).unwrap();
    assert_eq!(state.get::<u64>().unwrap(), Some(42));

    state.clear();
    assert!(state.get::<u64>().unwrap().is_none());
  }
}
