//! The normalized event record.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One scraped event, as extracted from a listing page.
///
/// `date` and `time` are the display strings from the page title; only
/// `start_time` (from the page's structured data) is machine-readable, and
/// events without it are dropped by the month filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub url: String,
    pub date: String,
    pub time: String,
    pub group_url: String,
    pub group_name: String,
    pub description: Option<String>,
    pub start_time: Option<DateTime<FixedOffset>>,
}

/// Sorts events by start time, keeping the incoming order for events
/// without one (stable sort, comparator treats them as equal).
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by(|a, b| match (&a.start_time, &b.start_time) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => Ordering::Equal,
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn event(title: &str, start: Option<&str>) -> Event {
        Event {
            title: title.into(),
            url: format!("https://www.meetup.com/g/events/{title}"),
            date: "Tue, Aug 12".into(),
            time: "6:00 PM EDT".into(),
            group_url: "https://www.meetup.com/g/".into(),
            group_name: "Group".into(),
            description: None,
            start_time: start.map(|s| DateTime::parse_from_rfc3339(s).unwrap()),
        }
    }

    #[test]
    fn sorts_by_start_time() {
        let mut events = vec![
            event("late", Some("2025-08-20T18:00:00-04:00")),
            event("early", Some("2025-08-05T18:00:00-04:00")),
            event("mid", Some("2025-08-12T18:00:00-04:00")),
        ];
        sort_chronologically(&mut events);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "mid", "late"]);
    }

    #[test]
    fn undated_events_keep_their_position() {
        let mut events = vec![
            event("undated", None),
            event("dated", Some("2025-08-05T18:00:00-04:00")),
        ];
        sort_chronologically(&mut events);
        assert_eq!(events[0].title, "undated");
    }
}
