//! Boundary capabilities around the network engine.
//!
//! All collaborators are injected at engine construction — there is no
//! runtime lookup. Listener and failure reporting are synchronous and
//! expected to be cheap (collect, log, enqueue); the situation sink is
//! async because persisting is not.

use async_trait::async_trait;

use crate::{event::ActivityEvent, event::EventList, situation::Situation};

// ─── Notification channel ────────────────────────────────────────────────────

/// Receives `(subject, events)` callbacks for every publish on a subject the
/// listener subscribed to. Used both internally (monitoring node chains) and
/// externally (test consumers).
pub trait NotificationListener: Send + Sync {
  fn notify(&self, subject: &str, events: &EventList);
}

// ─── Situation sink ──────────────────────────────────────────────────────────

/// Receives terminal situations emitted by processing nodes. The store
/// adapter is the production implementation.
#[async_trait]
pub trait SituationSink: Send + Sync {
  async fn accept(&self, situation: Situation);
}

// ─── Failure sink ────────────────────────────────────────────────────────────

/// A delivery whose retries were exhausted or that failed fatally.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
  pub node:     String,
  pub subject:  String,
  pub key:      String,
  /// Invocation attempts made, including the first.
  pub attempts: u32,
  pub error:    String,
}

/// The observability collaborator failed deliveries are surfaced to instead
/// of being silently dropped.
pub trait FailureSink: Send + Sync {
  fn report(&self, failure: DeliveryFailure);
}

// ─── Activity validation ─────────────────────────────────────────────────────

/// May reject a malformed event before it enters the network. Rejection
/// halts that event's ingestion only; the rest of the batch continues.
pub trait ActivityValidator: Send + Sync {
  fn validate(&self, event: &ActivityEvent) -> Result<(), String>;
}

/// Validator that accepts everything.
#[derive(Debug, Default)]
pub struct AcceptAllValidator;

impl ActivityValidator for AcceptAllValidator {
  fn validate(&self, _event: &ActivityEvent) -> Result<(), String> { Ok(()) }
}
