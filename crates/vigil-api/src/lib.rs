//! JSON REST API for Vigil.
//!
//! Exposes an axum [`Router`] backed by any
//! [`vigil_core::store::SituationStore`] plus an event-ingestion route into
//! the network engine. Auth, TLS, and transport concerns are the caller's
//! responsibility.

pub mod error;
pub mod events;
pub mod situations;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use vigil_core::store::SituationStore;
use vigil_epn::{EngineConfig, NetworkEngine};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Subject ingested events are published on.
  #[serde(default = "default_ingest_subject")]
  pub ingest_subject:  String,
  /// SLA threshold for the built-in response-time node, in milliseconds.
  #[serde(default = "default_response_sla_ms")]
  pub response_sla_ms: i64,
  #[serde(default)]
  pub engine:          EngineConfig,
}

fn default_ingest_subject() -> String { "activities".to_owned() }

fn default_response_sla_ms() -> i64 { 1_000 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub engine: Arc<NetworkEngine>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      engine: self.engine.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: SituationStore + 'static,
{
  Router::new()
    // Situations
    .route(
      "/situations",
      get(situations::list::<S>).delete(situations::delete_matching::<S>),
    )
    .route(
      "/situations/{id}",
      get(situations::get_one::<S>).delete(situations::delete_one::<S>),
    )
    .route("/situations/{id}/assign", post(situations::assign::<S>))
    .route("/situations/{id}/unassign", post(situations::unassign::<S>))
    .route("/situations/{id}/resolution", post(situations::resolution::<S>))
    .route("/situations/{id}/resubmit", post(situations::resubmit::<S>))
    // Ingestion
    .route("/events", post(events::ingest::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
