//! Working calendars used by SLA-duration calculations.
//!
//! The core does not persist calendars; [`CalendarProvider`] is an injected
//! lookup returning a named calendar or the built-in default. Report
//! rendering itself lives outside this workspace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Name resolved to the built-in default working week.
pub const DEFAULT_CALENDAR: &str = "default";

// ─── Model ───────────────────────────────────────────────────────────────────

/// Working hours for one weekday. Hours are 0–23 in the calendar's
/// timezone; a weekday absent from the calendar is a non-working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDay {
  pub start_hour: u8,
  pub end_hour:   u8,
}

/// A date excluded from the working year, e.g. a public holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedDay {
  pub month:  u8,
  pub day:    u8,
  pub reason: String,
}

/// A working-hours definition: per-weekday start/end hours plus excluded
/// dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingCalendar {
  pub name:          String,
  /// IANA timezone name; `None` means the host's local time.
  pub timezone:      Option<String>,
  pub monday:        Option<WorkingDay>,
  pub tuesday:       Option<WorkingDay>,
  pub wednesday:     Option<WorkingDay>,
  pub thursday:      Option<WorkingDay>,
  pub friday:        Option<WorkingDay>,
  pub saturday:      Option<WorkingDay>,
  pub sunday:        Option<WorkingDay>,
  #[serde(default)]
  pub excluded_days: Vec<ExcludedDay>,
}

impl WorkingCalendar {
  /// The built-in default: Monday to Friday, 09:00–17:00, December 25
  /// excluded.
  pub fn default_week() -> Self {
    let nine_to_five = WorkingDay { start_hour: 9, end_hour: 17 };
    Self {
      name:          DEFAULT_CALENDAR.to_owned(),
      timezone:      None,
      monday:        Some(nine_to_five),
      tuesday:       Some(nine_to_five),
      wednesday:     Some(nine_to_five),
      thursday:      Some(nine_to_five),
      friday:        Some(nine_to_five),
      saturday:      None,
      sunday:        None,
      excluded_days: vec![ExcludedDay {
        month:  12,
        day:    25,
        reason: "Christmas Day".to_owned(),
      }],
    }
  }
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Resolve a named calendar, applying an optional timezone override.
/// An unknown name falls back to the default working week.
pub trait CalendarProvider: Send + Sync {
  fn calendar(&self, name: &str, timezone: Option<&str>) -> WorkingCalendar;
}

/// An in-memory provider over a fixed set of calendars.
#[derive(Debug, Default)]
pub struct StaticCalendarProvider {
  calendars: HashMap<String, WorkingCalendar>,
}

impl StaticCalendarProvider {
  pub fn new(calendars: impl IntoIterator<Item = WorkingCalendar>) -> Self {
    Self {
      calendars: calendars
        .into_iter()
        .map(|c| (c.name.clone(), c))
        .collect(),
    }
  }
}

impl CalendarProvider for StaticCalendarProvider {
  fn calendar(&self, name: &str, timezone: Option<&str>) -> WorkingCalendar {
    let mut calendar = self
      .calendars
      .get(name)
      .cloned()
      .unwrap_or_else(WorkingCalendar::default_week);

    if let Some(tz) = timezone {
      calendar.timezone = Some(tz.to_owned());
    }

    calendar
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_name_falls_back_to_default_week() {
    let provider = StaticCalendarProvider::default();
    let calendar = provider.calendar("ops-emea", None);

    assert_eq!(calendar.name, DEFAULT_CALENDAR);
    assert_eq!(
      calendar.monday,
      Some(WorkingDay { start_hour: 9, end_hour: 17 })
    );
    assert!(calendar.saturday.is_none());
    assert_eq!(calendar.excluded_days[0].reason, "Christmas Day");
  }

  #[test]
  fn timezone_override_applies() {
    let provider = StaticCalendarProvider::default();
    let calendar = provider.calendar(DEFAULT_CALENDAR, Some("Europe/Berlin"));
    assert_eq!(calendar.timezone.as_deref(), Some("Europe/Berlin"));
  }

  #[test]
  fn named_calendar_resolves() {
    let mut weekend = WorkingCalendar::default_week();
    weekend.name = "weekend-support".to_owned();
    weekend.saturday = Some(WorkingDay { start_hour: 10, end_hour: 14 });

    let provider = StaticCalendarProvider::new([weekend]);
    let calendar = provider.calendar("weekend-support", None);
    assert_eq!(
      calendar.saturday,
      Some(WorkingDay { start_hour: 10, end_hour: 14 })
    );
  }
}
