//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. The two property maps are
//! stored as compact JSON objects. Enums use their lowercase string forms.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use vigil_core::situation::{ResolutionState, Severity, Situation};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Severity ────────────────────────────────────────────────────────────────

pub fn encode_severity(s: Severity) -> String { s.to_string() }

pub fn decode_severity(s: &str) -> Result<Severity> {
  s.parse()
    .map_err(|_| Error::UnknownSeverity(s.to_owned()))
}

// ─── ResolutionState ─────────────────────────────────────────────────────────

pub fn encode_resolution_state(s: ResolutionState) -> String { s.to_string() }

// ─── Property maps ───────────────────────────────────────────────────────────

pub fn encode_properties(map: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(map)?)
}

pub fn decode_properties(s: &str) -> Result<BTreeMap<String, String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `situations` row.
pub struct RawSituation {
  pub situation_id:   String,
  pub situation_type: String,
  pub severity:       String,
  pub subject:        Option<String>,
  pub description:    String,
  pub created_at:     String,
  pub properties:     String,
  pub bookkeeping:    String,
}

impl RawSituation {
  /// Column list matching [`RawSituation::from_row`].
  pub const COLUMNS: &'static str = "situation_id, situation_type, severity, \
     subject, description, created_at, properties, bookkeeping";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      situation_id:   row.get(0)?,
      situation_type: row.get(1)?,
      severity:       row.get(2)?,
      subject:        row.get(3)?,
      description:    row.get(4)?,
      created_at:     row.get(5)?,
      properties:     row.get(6)?,
      bookkeeping:    row.get(7)?,
    })
  }

  pub fn into_situation(self) -> Result<Situation> {
    Ok(Situation {
      id:             self.situation_id,
      situation_type: self.situation_type,
      severity:       decode_severity(&self.severity)?,
      subject:        self.subject,
      description:    self.description,
      timestamp:      decode_dt(&self.created_at)?,
      properties:     decode_properties(&self.properties)?,
      bookkeeping:    decode_properties(&self.bookkeeping)?,
    })
  }
}
