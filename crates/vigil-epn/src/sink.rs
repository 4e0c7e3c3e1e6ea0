//! Bridge implementations of the engine's boundary traits.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use vigil_core::{
  notify::{DeliveryFailure, FailureSink, SituationSink},
  situation::Situation,
  store::SituationStore,
};

// ─── Store forwarder ─────────────────────────────────────────────────────────

/// Forwards terminal situations from the engine into a [`SituationStore`].
///
/// A rejected store (duplicate id from a replayed detection, backend
/// failure) is logged, never propagated back into the node's delivery —
/// the node already completed successfully.
pub struct StoreForwarder<S> {
  store: Arc<S>,
}

impl<S> StoreForwarder<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }
}

#[async_trait]
impl<S> SituationSink for StoreForwarder<S>
where
  S: SituationStore + 'static,
{
  async fn accept(&self, situation: Situation) {
    let id = situation.id.clone();
    if let Err(err) = self.store.store(situation).await {
      warn!(situation = %id, %err, "failed to store situation");
    }
  }
}

// ─── Tracing failure sink ────────────────────────────────────────────────────

/// Default observability sink: failed deliveries land in the tracing log.
#[derive(Debug, Default)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
  fn report(&self, failure: DeliveryFailure) {
    error!(
      node = failure.node,
      subject = failure.subject,
      key = failure.key,
      attempts = failure.attempts,
      error = failure.error,
      "delivery permanently failed"
    );
  }
}
