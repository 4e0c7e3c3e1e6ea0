//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use vigil_core::store::{SituationStore, StoreErrorKind};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error through the store's own taxonomy.
  pub fn from_store<S: SituationStore>(err: S::Error) -> Self {
    match S::classify(&err) {
      StoreErrorKind::NotFound => ApiError::NotFound(err.to_string()),
      StoreErrorKind::Duplicate => ApiError::Conflict(err.to_string()),
      StoreErrorKind::Other => ApiError::Store(Box::new(err)),
    }
  }
}

impl From<vigil_epn::Error> for ApiError {
  fn from(err: vigil_epn::Error) -> Self {
    match err {
      vigil_epn::Error::QueueFull { .. } | vigil_epn::Error::ShutDown => {
        ApiError::Unavailable(err.to_string())
      }
      vigil_epn::Error::Core(e) => ApiError::BadRequest(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
