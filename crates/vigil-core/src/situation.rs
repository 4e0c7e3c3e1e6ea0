//! Situations — persisted, actionable records of detected governance
//! conditions.
//!
//! A situation is created once, by a terminal node's output, and thereafter
//! mutated only through the store's lifecycle operations (assign, resolve,
//! record resubmission, delete). Triage metadata lives in a separate
//! bookkeeping map so the original detection properties stay untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Severity ────────────────────────────────────────────────────────────────

/// How serious the detected condition is.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default,
  Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  #[default]
  Low,
  Medium,
  High,
  Critical,
}

// ─── ResolutionState ─────────────────────────────────────────────────────────

/// Lifecycle status of a situation's remediation.
///
/// Any state may be set from any state — operators may revert a resolution.
/// The only special rule is that unassignment never clears `Resolved`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
  Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionState {
  #[default]
  Unresolved,
  InProgress,
  Resolved,
}

// ─── Situation ───────────────────────────────────────────────────────────────

/// A derived governance-relevant record.
///
/// `properties` describe the detected condition and may include keys under
/// the internal prefix (promoted to their public suffix at store time, see
/// [`crate::lifecycle`]). `bookkeeping` holds triage state written only by
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Situation {
  pub id:             String,
  pub situation_type: String,
  pub severity:       Severity,
  /// The monitored endpoint or service the condition concerns, if any.
  pub subject:        Option<String>,
  pub description:    String,
  pub timestamp:      DateTime<Utc>,
  #[serde(default)]
  pub properties:     BTreeMap<String, String>,
  #[serde(default)]
  pub bookkeeping:    BTreeMap<String, String>,
}

impl Situation {
  /// Build a situation with a fresh description-bearing record and the
  /// current time. Callers supply the id so replayed detections stay
  /// idempotent at the store boundary.
  pub fn new(
    id: impl Into<String>,
    situation_type: impl Into<String>,
    severity: Severity,
    description: impl Into<String>,
  ) -> Self {
    Self {
      id:             id.into(),
      situation_type: situation_type.into(),
      severity,
      subject:        None,
      description:    description.into(),
      timestamp:      Utc::now(),
      properties:     BTreeMap::new(),
      bookkeeping:    BTreeMap::new(),
    }
  }

  pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
    self.subject = Some(subject.into());
    self
  }

  pub fn with_property(
    mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  /// The current resolution state, defaulting to `Unresolved` when the
  /// bookkeeping entry is absent or unparseable.
  pub fn resolution_state(&self) -> ResolutionState {
    self
      .bookkeeping
      .get(crate::lifecycle::RESOLUTION_STATE)
      .and_then(|s| s.parse().ok())
      .unwrap_or_default()
  }

  /// The assigned operator, if any.
  pub fn assigned_to(&self) -> Option<&str> {
    self
      .bookkeeping
      .get(crate::lifecycle::ASSIGNED_TO)
      .map(String::as_str)
  }
}
