//! Handler for the `/events` ingestion endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;
use vigil_core::{event::ActivityEvent, store::SituationStore};
use vigil_epn::IngestReport;

use crate::{AppState, error::ApiError};

/// JSON body accepted by `POST /events`.
#[derive(Debug, Deserialize)]
pub struct IngestBody {
  pub subject: String,
  pub events:  Vec<ActivityEvent>,
}

/// `POST /events` — validate, group by partition key, and publish into the
/// network. Downstream processing is asynchronous; the response reports only
/// what was accepted or rejected at the boundary.
pub async fn ingest<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<IngestBody>,
) -> Result<Json<IngestReport>, ApiError>
where
  S: SituationStore,
{
  let report = state.engine.ingest(&body.subject, body.events).await?;
  Ok(Json(report))
}
