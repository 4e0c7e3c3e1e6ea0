//! Shared bookkeeping logic invoked by every store backend.
//!
//! Backends differ only in how they persist; the rules for property
//! promotion, assignment, sticky-resolved clearing, and resubmission records
//! live here as pure functions over the situation's maps. A backend loads
//! the record, applies one of these mutations, and writes it back inside its
//! own atomic read-modify-write unit.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  situation::{ResolutionState, Situation},
};

// ─── Property keys ───────────────────────────────────────────────────────────

/// Situation-property keys under this prefix are copied to their public
/// suffix name at store time. The prefixed original is retained as a record
/// of the value at creation.
pub const INTERNAL_PROPERTY_PREFIX: &str = "internal:";

pub const ASSIGNED_TO: &str = "assigned_to";
pub const RESOLUTION_STATE: &str = "resolution_state";
pub const RESUBMIT_BY: &str = "resubmit_by";
pub const RESUBMIT_AT: &str = "resubmit_at";
pub const RESUBMIT_RESULT: &str = "resubmit_result";
pub const RESUBMIT_ERROR_MESSAGE: &str = "resubmit_error_message";

pub const RESUBMIT_RESULT_SUCCESS: &str = "success";
pub const RESUBMIT_RESULT_ERROR: &str = "error";

// ─── Store-time preparation ──────────────────────────────────────────────────

/// Normalise a situation immediately before first persistence: validate the
/// id, promote internal-prefixed properties, and default the resolution
/// state so every stored record carries exactly one.
///
/// Promotion copies rather than moves, and runs exactly once per record
/// because a second `store` of the same id is rejected as a duplicate before
/// reaching this point again.
pub fn prepare_for_store(situation: &mut Situation) -> Result<()> {
  if situation.id.is_empty() {
    return Err(Error::EmptySituationId);
  }

  promote_internal_properties(situation);

  situation
    .bookkeeping
    .entry(RESOLUTION_STATE.to_owned())
    .or_insert_with(|| ResolutionState::Unresolved.to_string());

  Ok(())
}

/// Copy each `internal:`-prefixed property to its suffix name, keeping the
/// original. An existing public value under the suffix is overwritten; the
/// internal value is the authoritative one at store time.
pub fn promote_internal_properties(situation: &mut Situation) {
  let promoted: Vec<(String, String)> = situation
    .properties
    .iter()
    .filter_map(|(key, value)| {
      key
        .strip_prefix(INTERNAL_PROPERTY_PREFIX)
        .map(|suffix| (suffix.to_owned(), value.clone()))
    })
    .collect();

  for (key, value) in promoted {
    situation.properties.insert(key, value);
  }
}

// ─── Lifecycle mutations ─────────────────────────────────────────────────────

/// Record the operator responsible for remediation.
pub fn assign(situation: &mut Situation, user: &str) {
  situation
    .bookkeeping
    .insert(ASSIGNED_TO.to_owned(), user.to_owned());
}

/// Remove the assignment. A non-resolved resolution state is cleared with
/// it — the prior in-progress determination is stale once nobody owns the
/// situation — but `Resolved` is sticky and survives unassignment.
pub fn unassign(situation: &mut Situation) {
  situation.bookkeeping.remove(ASSIGNED_TO);

  if situation.resolution_state() != ResolutionState::Resolved {
    situation.bookkeeping.remove(RESOLUTION_STATE);
  }
}

/// Set the resolution state. No state-machine legality is imposed beyond the
/// enum domain.
pub fn update_resolution_state(situation: &mut Situation, state: ResolutionState) {
  situation
    .bookkeeping
    .insert(RESOLUTION_STATE.to_owned(), state.to_string());
}

/// Record that an operator replayed the originating business transaction and
/// it succeeded. Clears any error message from an earlier failed attempt —
/// the outcome fields describe the latest attempt only.
pub fn record_resubmit_success(
  situation: &mut Situation,
  user: &str,
  at: DateTime<Utc>,
) {
  let bk = &mut situation.bookkeeping;
  bk.insert(RESUBMIT_BY.to_owned(), user.to_owned());
  bk.insert(RESUBMIT_AT.to_owned(), at.to_rfc3339());
  bk.insert(RESUBMIT_RESULT.to_owned(), RESUBMIT_RESULT_SUCCESS.to_owned());
  bk.remove(RESUBMIT_ERROR_MESSAGE);
}

/// Record a failed resubmission attempt with its error message.
pub fn record_resubmit_failure(
  situation: &mut Situation,
  error_message: &str,
  user: &str,
  at: DateTime<Utc>,
) {
  let bk = &mut situation.bookkeeping;
  bk.insert(RESUBMIT_BY.to_owned(), user.to_owned());
  bk.insert(RESUBMIT_AT.to_owned(), at.to_rfc3339());
  bk.insert(RESUBMIT_RESULT.to_owned(), RESUBMIT_RESULT_ERROR.to_owned());
  bk.insert(RESUBMIT_ERROR_MESSAGE.to_owned(), error_message.to_owned());
}
