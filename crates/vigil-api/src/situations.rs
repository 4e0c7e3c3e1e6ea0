//! Handlers for `/situations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/situations` | Optional filters, see [`ListParams`] |
//! | `GET`    | `/situations/:id` | Single situation |
//! | `POST`   | `/situations/:id/assign` | Body: `{"user":"..."}` |
//! | `POST`   | `/situations/:id/unassign` | |
//! | `POST`   | `/situations/:id/resolution` | Body: `{"state":"resolved"}` |
//! | `POST`   | `/situations/:id/resubmit` | Body: [`ResubmitBody`] |
//! | `DELETE` | `/situations/:id` | |
//! | `DELETE` | `/situations` | Same filters as GET; returns `{"deleted":n}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use vigil_core::{
  situation::{ResolutionState, Severity, Situation},
  store::{SituationQuery, SituationStore},
};

use crate::{AppState, error::ApiError};

// ─── List / delete-by-query parameters ───────────────────────────────────────

/// Query parameters shared by `GET /situations` and `DELETE /situations`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub situation_type:   Option<String>,
  pub severity:         Option<Severity>,
  /// Resolution-state filter; an unknown value is a 400 before any store
  /// access.
  pub resolution_state: Option<String>,
  /// A single `key=value` equality filter over situation properties.
  pub property:         Option<String>,
  pub from:             Option<DateTime<Utc>>,
  pub to:               Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

impl ListParams {
  fn into_query(self) -> Result<SituationQuery, ApiError> {
    let resolution_state = self
      .resolution_state
      .map(|s| {
        s.parse::<ResolutionState>()
          .map_err(|_| ApiError::BadRequest(format!("unknown resolution state: {s:?}")))
      })
      .transpose()?;

    let properties = self
      .property
      .map(|p| {
        p.split_once('=')
          .map(|(k, v)| (k.to_owned(), v.to_owned()))
          .ok_or_else(|| {
            ApiError::BadRequest(format!("property filter must be key=value, got {p:?}"))
          })
      })
      .transpose()?
      .into_iter()
      .collect();

    Ok(SituationQuery {
      situation_type: self.situation_type,
      severity: self.severity,
      resolution_state,
      properties,
      from: self.from,
      to: self.to,
      limit: self.limit,
      offset: self.offset,
    })
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /situations`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Situation>>, ApiError>
where
  S: SituationStore,
{
  let query = params.into_query()?;
  let situations = state
    .store
    .get_situations(&query)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(Json(situations))
}

/// `GET /situations/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Situation>, ApiError>
where
  S: SituationStore,
{
  let situation = state
    .store
    .get_situation(&id)
    .await
    .map_err(ApiError::from_store::<S>)?
    .ok_or_else(|| ApiError::NotFound(format!("situation {id} not found")))?;
  Ok(Json(situation))
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub user: String,
}

/// `POST /situations/:id/assign`
pub async fn assign<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<AssignBody>,
) -> Result<StatusCode, ApiError>
where
  S: SituationStore,
{
  state
    .store
    .assign_situation(&id, &body.user)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /situations/:id/unassign`
pub async fn unassign<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: SituationStore,
{
  state
    .store
    .unassign_situation(&id)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolutionBody {
  pub state: String,
}

/// `POST /situations/:id/resolution` — any state may be set from any state.
pub async fn resolution<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<ResolutionBody>,
) -> Result<StatusCode, ApiError>
where
  S: SituationStore,
{
  let resolution = body.state.parse::<ResolutionState>().map_err(|_| {
    ApiError::BadRequest(format!("unknown resolution state: {:?}", body.state))
  })?;

  state
    .store
    .update_resolution_state(&id, resolution)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Resubmission ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResubmitOutcome {
  Success,
  Failure,
}

/// JSON body accepted by `POST /situations/:id/resubmit`.
#[derive(Debug, Deserialize)]
pub struct ResubmitBody {
  pub user:    String,
  pub outcome: ResubmitOutcome,
  /// Required when `outcome` is `failure`.
  pub message: Option<String>,
}

/// `POST /situations/:id/resubmit`
pub async fn resubmit<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<ResubmitBody>,
) -> Result<StatusCode, ApiError>
where
  S: SituationStore,
{
  match body.outcome {
    ResubmitOutcome::Success => state
      .store
      .record_successful_resubmit(&id, &body.user)
      .await
      .map_err(ApiError::from_store::<S>)?,
    ResubmitOutcome::Failure => {
      let message = body.message.ok_or_else(|| {
        ApiError::BadRequest("failure outcome requires a message".to_owned())
      })?;
      state
        .store
        .record_resubmit_failure(&id, &message, &body.user)
        .await
        .map_err(ApiError::from_store::<S>)?;
    }
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Deletion ────────────────────────────────────────────────────────────────

/// `DELETE /situations/:id`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: SituationStore,
{
  state
    .store
    .delete_situation(&id)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /situations` — returns the number of records actually removed.
pub async fn delete_matching<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SituationStore,
{
  let query = params.into_query()?;
  let deleted = state
    .store
    .delete_matching(&query)
    .await
    .map_err(ApiError::from_store::<S>)?;
  Ok(Json(json!({ "deleted": deleted })))
}
