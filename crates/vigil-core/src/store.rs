//! The `SituationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `vigil-store-sqlite`).
//! Higher layers (`vigil-api`, the engine's situation sink) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::situation::{ResolutionState, Severity, Situation};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`SituationStore::get_situations`] and
/// [`SituationStore::delete_matching`].
///
/// Every field is optional; the default query matches all situations.
#[derive(Debug, Clone, Default)]
pub struct SituationQuery {
  pub situation_type:   Option<String>,
  pub severity:         Option<Severity>,
  pub resolution_state: Option<ResolutionState>,
  /// All returned situations must carry every listed property with the
  /// given value (equality over the post-promotion property map).
  pub properties:       Vec<(String, String)>,
  /// Creation-time range, inclusive lower bound, exclusive upper bound.
  pub from:             Option<DateTime<Utc>>,
  pub to:               Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

// ─── Error classification ────────────────────────────────────────────────────

/// The store taxonomy a backend error falls into, so callers (e.g. an HTTP
/// layer) can react to not-found and duplicate outcomes without knowing the
/// backend's concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  NotFound,
  Duplicate,
  Other,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a situation store backend.
///
/// `store` runs the shared preparation step ([`crate::lifecycle`]) before
/// persisting; lifecycle mutations are atomic read-modify-write per id —
/// concurrent mutations of one id must never interleave partially.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SituationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Map a backend error into the shared taxonomy.
  fn classify(err: &Self::Error) -> StoreErrorKind;

  /// Persist a new situation. Rejects an empty id and an id already present
  /// (the prior record is left unchanged). Internal-prefixed properties are
  /// promoted before the record is written.
  fn store(
    &self,
    situation: Situation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a situation by id. Returns `None` if not found.
  fn get_situation(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<Option<Situation>, Self::Error>> + Send + '_;

  /// Return situations matching `query`, ordered by creation time then id.
  fn get_situations<'a>(
    &'a self,
    query: &'a SituationQuery,
  ) -> impl Future<Output = Result<Vec<Situation>, Self::Error>> + Send + 'a;

  /// Set the assignment owner. Fails with the backend's not-found error if
  /// the id is absent.
  fn assign_situation(
    &self,
    id: &str,
    user: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the assignment owner. Also clears a non-resolved resolution
  /// state; `resolved` is sticky.
  fn unassign_situation(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set the resolution state. Any state may be set from any state.
  fn update_resolution_state(
    &self,
    id: &str,
    state: ResolutionState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record that an operator replayed the originating transaction
  /// successfully.
  fn record_successful_resubmit(
    &self,
    id: &str,
    user: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a failed replay of the originating transaction.
  fn record_resubmit_failure(
    &self,
    id: &str,
    error_message: &str,
    user: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a single situation by id.
  fn delete_situation(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every situation matching `query`, returning the number of
  /// records actually deleted (not the match count, should a concurrent
  /// deletion race in between).
  fn delete_matching<'a>(
    &'a self,
    query: &'a SituationQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
