//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use vigil_core::{
  lifecycle,
  situation::{ResolutionState, Severity, Situation},
  store::{SituationQuery, SituationStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn situation(id: &str) -> Situation {
  Situation::new(id, "SLAViolation", Severity::High, "response too slow")
}

// ─── Store and retrieve ──────────────────────────────────────────────────────

#[tokio::test]
async fn store_and_get_round_trip() {
  let s = store().await;

  let mut input = situation("s-1").with_property("service", "orders");
  input.subject = Some("orders".to_owned());
  s.store(input.clone()).await.unwrap();

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(fetched.id, "s-1");
  assert_eq!(fetched.situation_type, "SLAViolation");
  assert_eq!(fetched.severity, Severity::High);
  assert_eq!(fetched.subject.as_deref(), Some("orders"));
  assert_eq!(fetched.description, input.description);
  assert_eq!(
    fetched.properties.get("service").map(String::as_str),
    Some("orders")
  );
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get_situation("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn store_promotes_internal_properties() {
  let s = store().await;
  s.store(situation("s-1").with_property("internal:duration", "512"))
    .await
    .unwrap();

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  // promoted copy under the suffix, original retained
  assert_eq!(fetched.properties.get("duration").map(String::as_str), Some("512"));
  assert_eq!(
    fetched.properties.get("internal:duration").map(String::as_str),
    Some("512")
  );
}

#[tokio::test]
async fn stored_situation_defaults_to_unresolved() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(fetched.resolution_state(), ResolutionState::Unresolved);
  assert!(fetched.bookkeeping.contains_key(lifecycle::RESOLUTION_STATE));
}

#[tokio::test]
async fn duplicate_store_rejected_and_prior_record_unchanged() {
  let s = store().await;
  s.store(situation("s-1").with_property("attempt", "first"))
    .await
    .unwrap();

  let err = s
    .store(situation("s-1").with_property("attempt", "second"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateSituation(_)));

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(
    fetched.properties.get("attempt").map(String::as_str),
    Some("first")
  );
}

#[tokio::test]
async fn store_rejects_empty_id() {
  let s = store().await;
  let mut input = situation("");
  input.id = String::new();

  let err = s.store(input).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vigil_core::Error::EmptySituationId)
  ));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

async fn seeded_store() -> SqliteStore {
  let s = store().await;

  let base = Utc::now();

  let mut a = situation("s-a").with_property("service", "orders");
  a.timestamp = base;
  s.store(a).await.unwrap();

  let mut b = Situation::new("s-b", "ResponseTime", Severity::Low, "ok-ish")
    .with_property("service", "billing");
  b.timestamp = base + Duration::seconds(1);
  s.store(b).await.unwrap();

  let mut c = Situation::new("s-c", "ResponseTime", Severity::Critical, "very slow")
    .with_property("service", "orders");
  c.timestamp = base + Duration::seconds(2);
  s.store(c).await.unwrap();

  s
}

#[tokio::test]
async fn empty_query_matches_all_in_time_order() {
  let s = seeded_store().await;
  let all = s.get_situations(&SituationQuery::default()).await.unwrap();
  let ids: Vec<&str> = all.iter().map(|x| x.id.as_str()).collect();
  assert_eq!(ids, ["s-a", "s-b", "s-c"]);
}

#[tokio::test]
async fn query_by_type() {
  let s = seeded_store().await;
  let hits = s
    .get_situations(&SituationQuery {
      situation_type: Some("ResponseTime".to_owned()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 2);
  assert!(hits.iter().all(|x| x.situation_type == "ResponseTime"));
}

#[tokio::test]
async fn query_by_severity() {
  let s = seeded_store().await;
  let hits = s
    .get_situations(&SituationQuery {
      severity: Some(Severity::Critical),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, "s-c");
}

#[tokio::test]
async fn query_by_resolution_state() {
  let s = seeded_store().await;
  s.update_resolution_state("s-b", ResolutionState::Resolved)
    .await
    .unwrap();

  let resolved = s
    .get_situations(&SituationQuery {
      resolution_state: Some(ResolutionState::Resolved),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(resolved.len(), 1);
  assert_eq!(resolved[0].id, "s-b");

  let unresolved = s
    .get_situations(&SituationQuery {
      resolution_state: Some(ResolutionState::Unresolved),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(unresolved.len(), 2);
}

#[tokio::test]
async fn query_by_property_equality() {
  let s = seeded_store().await;
  let hits = s
    .get_situations(&SituationQuery {
      properties: vec![("service".to_owned(), "orders".to_owned())],
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<&str> = hits.iter().map(|x| x.id.as_str()).collect();
  assert_eq!(ids, ["s-a", "s-c"]);
}

#[tokio::test]
async fn query_by_time_range() {
  let s = store().await;
  let base = Utc::now();

  for (id, offset) in [("s-1", 0), ("s-2", 10), ("s-3", 20)] {
    let mut input = situation(id);
    input.timestamp = base + Duration::seconds(offset);
    s.store(input).await.unwrap();
  }

  let hits = s
    .get_situations(&SituationQuery {
      from: Some(base + Duration::seconds(5)),
      to: Some(base + Duration::seconds(15)),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, "s-2");
}

#[tokio::test]
async fn query_pagination() {
  let s = seeded_store().await;
  let page = s
    .get_situations(&SituationQuery {
      limit: Some(2),
      offset: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<&str> = page.iter().map(|x| x.id.as_str()).collect();
  assert_eq!(ids, ["s-b", "s-c"]);
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_and_unassign() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();

  s.assign_situation("s-1", "alice").await.unwrap();
  let assigned = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(assigned.assigned_to(), Some("alice"));

  s.unassign_situation("s-1").await.unwrap();
  let unassigned = s.get_situation("s-1").await.unwrap().unwrap();
  assert!(unassigned.assigned_to().is_none());
}

#[tokio::test]
async fn unassign_clears_in_progress_resolution() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();
  s.assign_situation("s-1", "alice").await.unwrap();
  s.update_resolution_state("s-1", ResolutionState::InProgress)
    .await
    .unwrap();

  s.unassign_situation("s-1").await.unwrap();

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(fetched.resolution_state(), ResolutionState::Unresolved);
}

#[tokio::test]
async fn unassign_keeps_resolved_sticky() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();
  s.assign_situation("s-1", "alice").await.unwrap();
  s.update_resolution_state("s-1", ResolutionState::Resolved)
    .await
    .unwrap();

  s.unassign_situation("s-1").await.unwrap();

  let fetched = s.get_situation("s-1").await.unwrap().unwrap();
  assert!(fetched.assigned_to().is_none());
  assert_eq!(fetched.resolution_state(), ResolutionState::Resolved);
}

#[tokio::test]
async fn assign_missing_id_errors() {
  let s = store().await;
  let err = s.assign_situation("nope", "alice").await.unwrap_err();
  assert!(matches!(err, crate::Error::NotFound(_)));
}

// ─── Resolution state ────────────────────────────────────────────────────────

#[tokio::test]
async fn any_resolution_transition_is_allowed() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();

  for state in [
    ResolutionState::InProgress,
    ResolutionState::Resolved,
    // operators may revert a resolution
    ResolutionState::Unresolved,
    ResolutionState::Resolved,
  ] {
    s.update_resolution_state("s-1", state).await.unwrap();
    let fetched = s.get_situation("s-1").await.unwrap().unwrap();
    assert_eq!(fetched.resolution_state(), state);
  }
}

#[tokio::test]
async fn update_resolution_state_missing_id_errors() {
  let s = store().await;
  let err = s
    .update_resolution_state("nope", ResolutionState::Resolved)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::NotFound(_)));
}

// ─── Resubmission ────────────────────────────────────────────────────────────

#[tokio::test]
async fn resubmit_failure_then_success_clears_error() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();

  s.record_resubmit_failure("s-1", "timeout", "bob")
    .await
    .unwrap();
  let failed = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(
    failed.bookkeeping.get(lifecycle::RESUBMIT_RESULT).map(String::as_str),
    Some(lifecycle::RESUBMIT_RESULT_ERROR)
  );
  assert_eq!(
    failed
      .bookkeeping
      .get(lifecycle::RESUBMIT_ERROR_MESSAGE)
      .map(String::as_str),
    Some("timeout")
  );

  s.record_successful_resubmit("s-1", "bob").await.unwrap();
  let succeeded = s.get_situation("s-1").await.unwrap().unwrap();
  assert_eq!(
    succeeded.bookkeeping.get(lifecycle::RESUBMIT_RESULT).map(String::as_str),
    Some(lifecycle::RESUBMIT_RESULT_SUCCESS)
  );
  assert_eq!(
    succeeded.bookkeeping.get(lifecycle::RESUBMIT_BY).map(String::as_str),
    Some("bob")
  );
  assert!(succeeded.bookkeeping.contains_key(lifecycle::RESUBMIT_AT));
  assert!(!succeeded.bookkeeping.contains_key(lifecycle::RESUBMIT_ERROR_MESSAGE));
}

#[tokio::test]
async fn resubmit_missing_id_errors() {
  let s = store().await;
  let err = s.record_successful_resubmit("nope", "bob").await.unwrap_err();
  assert!(matches!(err, crate::Error::NotFound(_)));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_single_situation() {
  let s = store().await;
  s.store(situation("s-1")).await.unwrap();

  s.delete_situation("s-1").await.unwrap();
  assert!(s.get_situation("s-1").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_missing_id_errors() {
  let s = store().await;
  let err = s.delete_situation("nope").await.unwrap_err();
  assert!(matches!(err, crate::Error::NotFound(_)));
}

#[tokio::test]
async fn delete_matching_returns_actual_count() {
  let s = seeded_store().await;

  let deleted = s
    .delete_matching(&SituationQuery {
      situation_type: Some("ResponseTime".to_owned()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(deleted, 2);

  let remaining = s.get_situations(&SituationQuery::default()).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].id, "s-a");
}

#[tokio::test]
async fn delete_matching_nothing_returns_zero() {
  let s = seeded_store().await;
  let deleted = s
    .delete_matching(&SituationQuery {
      situation_type: Some("NoSuchType".to_owned()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(deleted, 0);
}

#[tokio::test]
async fn delete_matching_is_not_paginated_by_default() {
  let s = store().await;
  for i in 0..150 {
    s.store(situation(&format!("s-{i:03}"))).await.unwrap();
  }

  let deleted = s.delete_matching(&SituationQuery::default()).await.unwrap();
  assert_eq!(deleted, 150);
}
