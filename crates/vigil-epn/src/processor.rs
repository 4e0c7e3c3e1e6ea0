//! Reference correlation node: request/response duration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_core::{
  event::EventList,
  lifecycle::INTERNAL_PROPERTY_PREFIX,
  node::{EventProcessor, KeyState, NodeOutput, ProcessorError},
  situation::{Severity, Situation},
};

/// Pairs a request event with its response on the same partition key and
/// emits a `ResponseTime` situation carrying the observed duration.
///
/// The pending request is held in the key's state, so a request and its
/// response may arrive in separate lists, arbitrarily far apart. A response
/// with no pending request emits nothing (still waiting for correlated
/// events is not an error).
pub struct ResponseTimeProcessor {
  request_type:  String,
  response_type: String,
  /// Durations above this many milliseconds escalate the situation to
  /// [`Severity::High`].
  sla_ms:        i64,
}

/// Per-key state: the request still awaiting its response.
#[derive(Debug, Serialize, Deserialize)]
struct PendingRequest {
  event_id: Uuid,
  at:       DateTime<Utc>,
  service:  Option<String>,
}

impl ResponseTimeProcessor {
  pub fn new(
    request_type: impl Into<String>,
    response_type: impl Into<String>,
    sla_ms: i64,
  ) -> Self {
    Self {
      request_type: request_type.into(),
      response_type: response_type.into(),
      sla_ms,
    }
  }
}

#[async_trait]
impl EventProcessor for ResponseTimeProcessor {
  async fn process(
    &self,
    key: &str,
    events: &EventList,
    state: &mut KeyState,
  ) -> Result<NodeOutput, ProcessorError> {
    let mut pending: Option<PendingRequest> = state
      .get()
      .map_err(|e| ProcessorError::Fatal(format!("corrupt key state: {e}")))?;
    let mut output = NodeOutput::none();

    for event in events.iter() {
      if event.event_type == self.request_type {
        pending = Some(PendingRequest {
          event_id: event.id,
          at:       event.timestamp,
          service:  event.properties.get("service").cloned(),
        });
      } else if event.event_type == self.response_type
        && let Some(request) = pending.take()
      {
        let duration_ms =
          (event.timestamp - request.at).num_milliseconds();
        let severity = if duration_ms > self.sla_ms {
          Severity::High
        } else {
          Severity::Low
        };

        let mut situation = Situation::new(
          format!("response-time-{}", event.id),
          "ResponseTime",
          severity,
          format!("response for {key} took {duration_ms}ms"),
        )
        .with_property(
          format!("{INTERNAL_PROPERTY_PREFIX}duration"),
          duration_ms.to_string(),
        )
        .with_property("request_id", request.event_id.to_string())
        .with_property("response_id", event.id.to_string());

        if let Some(service) = request.service {
          situation = situation.with_subject(service);
        }

        output.situation = Some(situation);
      }
    }

    match pending {
      Some(request) => state
        .set(&request)
        .map_err(|e| ProcessorError::Fatal(format!("cannot persist key state: {e}")))?,
      None => state.clear(),
    }

    Ok(output)
  }
}
