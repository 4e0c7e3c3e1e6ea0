//! Activity events — the fundamental unit flowing through the network.
//!
//! An activity event is an immutable observation from a monitored
//! application (service invoked, message sent, fault raised). Events are
//! never updated; a node that wants to forward events builds new ones or
//! clones the originals into a fresh list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── ActivityEvent ───────────────────────────────────────────────────────────

/// A single observed runtime fact.
///
/// The correlation set links events belonging to one business transaction.
/// The first correlation identifier doubles as the event's partition key; an
/// event with no correlations partitions alone under its own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
  pub id:           Uuid,
  /// Free-form discriminator, e.g. `"RequestSent"`, `"FaultRaised"`.
  pub event_type:   String,
  pub timestamp:    DateTime<Utc>,
  /// Keys unique, order irrelevant.
  pub properties:   BTreeMap<String, String>,
  /// Identifiers linking related events across a business transaction.
  #[serde(default)]
  pub correlations: Vec<String>,
}

impl ActivityEvent {
  /// Build an event with a fresh id and the current time.
  pub fn new(event_type: impl Into<String>) -> Self {
    Self {
      id:           Uuid::new_v4(),
      event_type:   event_type.into(),
      timestamp:    Utc::now(),
      properties:   BTreeMap::new(),
      correlations: Vec::new(),
    }
  }

  /// Builder-style property attachment.
  pub fn with_property(
    mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  /// Builder-style correlation attachment.
  pub fn with_correlation(mut self, id: impl Into<String>) -> Self {
    self.correlations.push(id.into());
    self
  }

  /// The partition key this event is routed under: the first correlation
  /// identifier, or the event's own id when uncorrelated.
  pub fn partition_key(&self) -> String {
    self
      .correlations
      .first()
      .cloned()
      .unwrap_or_else(|| self.id.to_string())
  }
}

// ─── EventList ───────────────────────────────────────────────────────────────

/// An ordered batch of events sharing one partition key, delivered together
/// to a node invocation.
///
/// Order reflects arrival order and is preserved end-to-end. The list is
/// never mutated after construction; fields are private so the only way to
/// obtain one is through the validating constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventList {
  key:    String,
  events: Vec<ActivityEvent>,
}

impl EventList {
  /// Build a list keyed by the first event's partition key. Fails if the
  /// batch is empty or any event carries a different key.
  pub fn new(events: Vec<ActivityEvent>) -> Result<Self> {
    let first = events.first().ok_or(Error::EmptyEventList)?;
    let key = first.partition_key();

    for event in &events {
      let found = event.partition_key();
      if found != key {
        return Err(Error::MixedPartitionKeys {
          event_id: event.id,
          expected: key,
          found,
        });
      }
    }

    Ok(Self { key, events })
  }

  pub fn key(&self) -> &str { &self.key }

  pub fn events(&self) -> &[ActivityEvent] { &self.events }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn iter(&self) -> std::slice::Iter<'_, ActivityEvent> {
    self.events.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partition_key_prefers_first_correlation() {
    let event = ActivityEvent::new("RequestSent")
      .with_correlation("txn-1")
      .with_correlation("conv-9");
    assert_eq!(event.partition_key(), "txn-1");
  }

  #[test]
  fn uncorrelated_event_partitions_alone() {
    let event = ActivityEvent::new("Heartbeat");
    assert_eq!(event.partition_key(), event.id.to_string());
  }

  #[test]
  fn empty_list_rejected() {
    assert!(matches!(EventList::new(vec![]), Err(Error::EmptyEventList)));
  }

  #[test]
  fn mixed_keys_rejected() {
    let a = ActivityEvent::new("RequestSent").with_correlation("txn-1");
    let b = ActivityEvent::new("ResponseReceived").with_correlation("txn-2");
    assert!(matches!(
      EventList::new(vec![a, b]),
      Err(Error::MixedPartitionKeys { .. })
    ));
  }

  #[test]
  fn list_preserves_arrival_order() {
    let a = ActivityEvent::new("First").with_correlation("txn-1");
    let b = ActivityEvent::new("Second").with_correlation("txn-1");
    let list = EventList::new(vec![a.clone(), b.clone()]).unwrap();
    assert_eq!(list.key(), "txn-1");
    assert_eq!(list.events()[0].id, a.id);
    assert_eq!(list.events()[1].id, b.id);
  }
}
