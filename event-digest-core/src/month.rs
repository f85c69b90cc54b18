//! Target-month selection, pinned to US Eastern time.
//!
//! "Now" is always an injected UTC instant; the only timezone conversion in
//! the crate happens here, against the fixed `America/New_York` zone, so a
//! run near midnight UTC still lands in the month the operator sees.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

use crate::error::PublishError;
use crate::event::Event;

pub const DISPLAY_TZ: Tz = New_York;

/// The calendar date "today" as seen from Eastern time.
pub fn eastern_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&DISPLAY_TZ).date_naive()
}

/// Human-readable Eastern timestamp, used in generated PR bodies.
pub fn eastern_now_display(now: DateTime<Utc>) -> String {
    now.with_timezone(&DISPLAY_TZ)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A resolved target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpec {
    pub year: i32,
    pub month: u32,
}

impl MonthSpec {
    /// Parses an optional `"YYYY-MM"` or `"MM"` filter string, defaulting to
    /// the month of `today` (already an Eastern date).
    pub fn parse(spec: Option<&str>, today: NaiveDate) -> Result<Self, PublishError> {
        let resolved = match spec {
            None => Self {
                year: today.year(),
                month: today.month(),
            },
            Some(s) if s.contains('-') => {
                let (year, month) = s.split_once('-').ok_or_else(|| invalid(s))?;
                Self {
                    year: year.parse().map_err(|_| invalid(s))?,
                    month: month.parse().map_err(|_| invalid(s))?,
                }
            }
            Some(s) => Self {
                year: today.year(),
                month: s.parse().map_err(|_| invalid(s))?,
            },
        };
        if !(1..=12).contains(&resolved.month) {
            return Err(invalid(&resolved.label()));
        }
        Ok(resolved)
    }

    /// `"YYYY-MM"`, used for branch names, commit messages and PR titles.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn name(&self) -> &'static str {
        MONTH_NAMES[self.month as usize - 1]
    }

    /// Whether an event's start instant falls in this month, judged on the
    /// event's own local calendar (the offset embedded in its timestamp).
    pub fn contains(&self, start: &chrono::DateTime<chrono::FixedOffset>) -> bool {
        start.year() == self.year && start.month() == self.month
    }
}

fn invalid(spec: &str) -> PublishError {
    PublishError::Config(format!(
        "invalid month filter '{spec}' (expected YYYY-MM or MM)"
    ))
}

/// Keeps only events whose start time falls in the target month. Events
/// without a machine-readable start time are dropped.
pub fn filter_by_month(events: Vec<Event>, month: MonthSpec) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| {
            event
                .start_time
                .as_ref()
                .map(|start| month.contains(start))
                .unwrap_or(false)
        })
        .collect()
}
