//! Meetup group-page scraper.
//!
//! Meetup embeds its event data as JSON-LD `<script>` blocks, so extraction
//! is regex-over-HTML plus JSON parsing rather than a full DOM walk, with an
//! href scan as the fallback for pages without structured data. Per-event
//! failures are swallowed and logged; a failed group page surfaces as one
//! [`SourceError`] that [`collect_events`] folds into the failures half of
//! its result.

use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::contract::EventSource;
use crate::error::SourceError;
use crate::event::Event;

const MEETUP_BASE: &str = "https://www.meetup.com";

fn json_ld_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<script[^>]*type="application/ld\+json"[^>]*>(.*?)</script>"#).unwrap()
    })
}

fn event_href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]*/events/\d+[^"]*)""#).unwrap())
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap())
}

fn group_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)id="group-name-link"[^>]*>(.*?)</"#).unwrap())
}

fn h1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// All JSON-LD values on a page, with top-level arrays flattened.
fn extract_json_ld(html: &str) -> Vec<serde_json::Value> {
    let mut values = Vec::new();
    for capture in json_ld_re().captures_iter(html) {
        match serde_json::from_str::<serde_json::Value>(capture[1].trim()) {
            Ok(serde_json::Value::Array(items)) => values.extend(items),
            Ok(value) => values.push(value),
            Err(_) => {} // malformed block, keep scanning
        }
    }
    values
}

/// Event page URLs on a group page: JSON-LD `Event` entries first, href
/// scan as the fallback. Order-preserving and deduplicated.
pub fn extract_event_links(html: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for value in extract_json_ld(html) {
        if value.get("@type").and_then(|t| t.as_str()) == Some("Event") {
            if let Some(url) = value.get("url").and_then(|u| u.as_str()) {
                if seen.insert(url.to_string()) {
                    links.push(url.to_string());
                }
            }
        }
    }

    if links.is_empty() {
        for capture in event_href_re().captures_iter(html) {
            let href = &capture[1];
            if href.contains("/events/past") || href.contains("/events/calendar") {
                continue;
            }
            let full = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{MEETUP_BASE}{href}")
            };
            if seen.insert(full.clone()) {
                links.push(full);
            }
        }
    }

    links
}

/// Display name of the group, falling back to the page heading and then
/// the last URL path segment.
pub fn extract_group_name(html: &str, group_url: &str) -> String {
    if let Some(capture) = group_name_re().captures(html) {
        let name = tag_re().replace_all(&capture[1], "").trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }
    if let Some(capture) = h1_re().captures(html) {
        let name = tag_re().replace_all(&capture[1], "").trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }
    group_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(group_url)
        .to_string()
}

fn parse_start_time(raw: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .or_else(|_| chrono::DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%z"))
        .ok()
}

/// Builds an [`Event`] from an event page. Returns `None` when the page has
/// no usable title.
pub fn parse_event_page(
    html: &str,
    url: &str,
    group_url: &str,
    group_name: &str,
) -> Option<Event> {
    let raw_title = title_re().captures(html)?;
    let title = raw_title[1].replace(" | Meetup", "").trim().to_string();
    if title.is_empty() {
        return None;
    }

    // Meetup titles read "<name>, <day>, <date>, <time>"; the last part is
    // the display time and the third-from-last the display date.
    let parts: Vec<&str> = title.split(',').collect();
    let time = parts.last().map(|s| s.trim()).unwrap_or("").to_string();
    let date = if parts.len() >= 3 {
        parts[parts.len() - 3].trim().to_string()
    } else {
        String::new()
    };

    let mut start_time = None;
    let mut description = None;
    for value in extract_json_ld(html) {
        if start_time.is_none() {
            if let Some(raw) = value.get("startDate").and_then(|v| v.as_str()) {
                start_time = parse_start_time(raw);
            }
        }
        if description.is_none() {
            if let Some(text) = value.get("description").and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    description = Some(text.trim().to_string());
                }
            }
        }
        if start_time.is_some() && description.is_some() {
            break;
        }
    }

    Some(Event {
        title,
        url: url.to_string(),
        date,
        time,
        group_url: group_url.to_string(),
        group_name: group_name.to_string(),
        description,
        start_time,
    })
}

/// Scrapes Meetup group pages over HTTPS.
pub struct MeetupScraper {
    http: reqwest::Client,
}

impl MeetupScraper {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

impl Default for MeetupScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for MeetupScraper {
    async fn group_events(&self, group_url: &str) -> Result<Vec<Event>, SourceError> {
        let page = self.fetch_page(group_url).await?;
        let group_name = extract_group_name(&page, group_url);
        let links = extract_event_links(&page);
        info!(group = group_url, count = links.len(), "found event pages");

        let mut events = Vec::new();
        for link in links {
            match self.fetch_page(&link).await {
                Ok(event_page) => {
                    match parse_event_page(&event_page, &link, group_url, &group_name) {
                        Some(event) => {
                            debug!(url = %link, title = %event.title, "scraped event");
                            events.push(event);
                        }
                        None => debug!(url = %link, "event page had no usable data"),
                    }
                }
                Err(e) => warn!(url = %link, error = %e, "skipping event page"),
            }
        }
        Ok(events)
    }
}

/// A group page that could not be scraped at all.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub group_url: String,
    pub error: String,
}

/// Scrapes every group concurrently (sources are independent, read-only)
/// and folds the results into a `(events, failures)` pair. A failing source
/// never aborts the run; partial success is explicit in the return type.
pub async fn collect_events<S>(source: &S, groups: &[String]) -> (Vec<Event>, Vec<SourceFailure>)
where
    S: EventSource + ?Sized,
{
    let fetches = groups.iter().map(|group| async move {
        (group.clone(), source.group_events(group).await)
    });

    let mut events = Vec::new();
    let mut failures = Vec::new();
    for (group, result) in join_all(fetches).await {
        match result {
            Ok(mut batch) => {
                info!(group = %group, count = batch.len(), "source scraped");
                events.append(&mut batch);
            }
            Err(e) => {
                error!(group = %group, error = %e, "source failed, continuing with the rest");
                failures.push(SourceFailure {
                    group_url: group,
                    error: e.to_string(),
                });
            }
        }
    }
    (events, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_PAGE: &str = r#"
<html><head><title>Space Coast Devs | Meetup</title></head>
<body>
<a id="group-name-link" href="/space-coast-devs/">Space Coast Devs</a>
<script type="application/ld+json">
[
  {"@type": "Event", "url": "https://www.meetup.com/space-coast-devs/events/123456/"},
  {"@type": "Event", "url": "https://www.meetup.com/space-coast-devs/events/654321/"},
  {"@type": "Event", "url": "https://www.meetup.com/space-coast-devs/events/123456/"}
]
</script>
</body></html>"#;

    const BARE_GROUP_PAGE: &str = r#"
<html><body>
<h1>Melbourne Makerspace</h1>
<a href="/melbourne-makerspace/events/111222/">One</a>
<a href="https://www.meetup.com/melbourne-makerspace/events/333444/">Two</a>
<a href="/melbourne-makerspace/events/past/">Past</a>
<a href="/melbourne-makerspace/events/calendar/">Calendar</a>
</body></html>"#;

    const EVENT_PAGE: &str = r#"
<html><head><title>Monthly Hack Night, Tue, Aug 12, 2025, 6:00 PM EDT | Meetup</title></head>
<body>
<script type="application/ld+json">
{"@type": "Event", "startDate": "2025-08-12T18:00-04:00", "description": "Bring a project and hack with us."}
</script>
</body></html>"#;

    #[test]
    fn extracts_deduplicated_json_ld_event_links() {
        let links = extract_event_links(GROUP_PAGE);
        assert_eq!(
            links,
            vec![
                "https://www.meetup.com/space-coast-devs/events/123456/",
                "https://www.meetup.com/space-coast-devs/events/654321/",
            ]
        );
    }

    #[test]
    fn falls_back_to_href_scan_and_absolutizes() {
        let links = extract_event_links(BARE_GROUP_PAGE);
        assert_eq!(
            links,
            vec![
                "https://www.meetup.com/melbourne-makerspace/events/111222/",
                "https://www.meetup.com/melbourne-makerspace/events/333444/",
            ]
        );
    }

    #[test]
    fn group_name_prefers_the_name_link() {
        assert_eq!(
            extract_group_name(GROUP_PAGE, "https://www.meetup.com/space-coast-devs/"),
            "Space Coast Devs"
        );
    }

    #[test]
    fn group_name_falls_back_to_heading_then_url() {
        assert_eq!(
            extract_group_name(BARE_GROUP_PAGE, "https://www.meetup.com/melbourne-makerspace/"),
            "Melbourne Makerspace"
        );
        assert_eq!(
            extract_group_name("<html></html>", "https://www.meetup.com/startupspacecoast/"),
            "startupspacecoast"
        );
    }

    #[test]
    fn parses_event_page_fields() {
        let event = parse_event_page(
            EVENT_PAGE,
            "https://www.meetup.com/space-coast-devs/events/123456/",
            "https://www.meetup.com/space-coast-devs/",
            "Space Coast Devs",
        )
        .unwrap();
        assert_eq!(event.title, "Monthly Hack Night, Tue, Aug 12, 2025, 6:00 PM EDT");
        assert_eq!(event.time, "6:00 PM EDT");
        assert_eq!(event.date, "Aug 12");
        assert_eq!(
            event.description.as_deref(),
            Some("Bring a project and hack with us.")
        );
        let start = event.start_time.unwrap();
        assert_eq!(start.to_rfc3339(), "2025-08-12T18:00:00-04:00");
    }

    #[test]
    fn event_page_without_title_is_skipped() {
        assert!(parse_event_page("<html></html>", "u", "g", "n").is_none());
    }

    #[test]
    fn start_time_accepts_seconds_and_minute_precision() {
        assert!(parse_start_time("2025-08-12T18:00:00-04:00").is_some());
        assert!(parse_start_time("2025-08-12T18:00-04:00").is_some());
        assert!(parse_start_time("next tuesday").is_none());
    }

    mod collect {
        use super::*;
        use crate::contract::MockEventSource;

        #[tokio::test]
        async fn folds_partial_failures_without_aborting() {
            let mut source = MockEventSource::new();
            source
                .expect_group_events()
                .withf(|group| group == "https://www.meetup.com/good/")
                .returning(|_| {
                    Ok(vec![crate::event::tests::event(
                        "kept",
                        Some("2025-08-12T18:00:00-04:00"),
                    )])
                });
            source
                .expect_group_events()
                .withf(|group| group == "https://www.meetup.com/bad/")
                .returning(|_| Err("connection reset".into()));

            let groups = vec![
                "https://www.meetup.com/good/".to_string(),
                "https://www.meetup.com/bad/".to_string(),
            ];
            let (events, failures) = collect_events(&source, &groups).await;
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].title, "kept");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].group_url, "https://www.meetup.com/bad/");
            assert!(failures[0].error.contains("connection reset"));
        }
    }
}
