//! High-level pipeline: scrape → filter → render → publish.
//!
//! Orchestrates one digest run against a configured group list: collects
//! events from every source (partial success allowed), filters and sorts
//! them for the target month, renders the document and hands it to a
//! [`Publisher`] backend. Branch name, commit message and PR texts all
//! derive from the *resolved target month*, so re-running in a later month
//! still updates the digest's own branch.
//!
//! Callable from the CLI crate and from integration tests; expects concrete
//! (async) [`EventSource`] and [`Publisher`] implementations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::contract::{DeployOptions, EventSource, Publisher, PullRequest, DEFAULT_BRANCH_PREFIX};
use crate::error::PublishError;
use crate::event::{sort_chronologically, Event};
use crate::month::{eastern_now_display, eastern_today, filter_by_month, MonthSpec};
use crate::render::render_digest;
use crate::scrape::{collect_events, SourceFailure};

/// One digest run's inputs.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Group pages to scrape.
    pub groups: Vec<String>,
    /// Target month filter, `"YYYY-MM"` or `"MM"`; defaults to the current
    /// Eastern month.
    pub month: Option<String>,
    /// Repository path for the document; defaults to a generated post path.
    pub target_file: Option<String>,
    pub branch_prefix: String,
    pub commit_message: Option<String>,
    pub pr_title: Option<String>,
    pub pr_body: Option<String>,
    /// Render and report without touching the repository.
    pub dry_run: bool,
}

impl DigestConfig {
    pub fn new(groups: Vec<String>) -> Self {
        Self {
            groups,
            month: None,
            target_file: None,
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            commit_message: None,
            pr_title: None,
            pr_body: None,
            dry_run: false,
        }
    }
}

/// What a digest run did.
#[derive(Debug)]
pub struct DigestReport {
    pub month: String,
    pub events: usize,
    pub failed_sources: Vec<SourceFailure>,
    /// The rendered document, present on dry runs only.
    pub document: Option<String>,
    /// Absent when there were no events to publish or on dry runs.
    pub pull_request: Option<PullRequest>,
}

/// Default repository path for a month's digest post.
pub fn post_filename(month: MonthSpec, today: chrono::NaiveDate) -> String {
    format!(
        "src/content/post/{date}-tech-events-{name}-{year}.md",
        date = today.format("%Y-%m-%d"),
        name = month.name().to_lowercase(),
        year = month.year,
    )
}

/// Generated PR body: totals plus an events-by-group breakdown.
pub fn digest_pr_body(events: &[Event], month: MonthSpec, generated_at: &str) -> String {
    let mut by_group: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        *by_group.entry(event.group_name.as_str()).or_default() += 1;
    }
    let group_summary = by_group
        .iter()
        .map(|(group, count)| {
            format!(
                "- **{group}**: {count} event{}",
                if *count == 1 { "" } else { "s" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Automated event update for {label}\n\n\
         This PR contains an automated update of the monthly tech-events digest.\n\n\
         ### Summary\n\
         - **Total events**: {total}\n\
         - **Period**: {label}\n\
         - **Generated**: {generated_at}\n\n\
         ### Events by group\n\
         {group_summary}\n\n\
         *This PR was created automatically by event-digest. Please review the \
         content before merging.*",
        label = month.label(),
        total = events.len(),
    )
}

/// Runs one digest publish end to end. `now` is the injected clock; all
/// month defaulting and display timestamps derive from it in Eastern time.
pub async fn publish_digest<S, P>(
    config: &DigestConfig,
    source: &S,
    publisher: &P,
    now: DateTime<Utc>,
) -> Result<DigestReport, PublishError>
where
    S: EventSource + ?Sized,
    P: Publisher + ?Sized,
{
    let today = eastern_today(now);
    let month = MonthSpec::parse(config.month.as_deref(), today)?;
    info!(month = %month.label(), groups = config.groups.len(), "starting digest run");

    let (events, failures) = collect_events(source, &config.groups).await;
    let mut events = filter_by_month(events, month);
    sort_chronologically(&mut events);
    info!(
        month = %month.label(),
        kept = events.len(),
        failed_sources = failures.len(),
        "events collected and filtered"
    );

    if events.is_empty() {
        info!(month = %month.label(), "no events found for the target month, nothing to deploy");
        return Ok(DigestReport {
            month: month.label(),
            events: 0,
            failed_sources: failures,
            document: None,
            pull_request: None,
        });
    }

    let document = render_digest(&events, month, today);
    let target_path = config
        .target_file
        .clone()
        .unwrap_or_else(|| post_filename(month, today));
    debug!(path = %target_path, bytes = document.len(), "document rendered");

    if config.dry_run {
        info!(path = %target_path, "dry run, skipping deployment");
        return Ok(DigestReport {
            month: month.label(),
            events: events.len(),
            failed_sources: failures,
            document: Some(document),
            pull_request: None,
        });
    }

    let options = DeployOptions {
        branch_name: Some(format!("{}-{}", config.branch_prefix, month.label())),
        commit_message: Some(
            config
                .commit_message
                .clone()
                .unwrap_or_else(|| format!("Update events for {}", month.label())),
        ),
        pr_title: Some(
            config
                .pr_title
                .clone()
                .unwrap_or_else(|| format!("Update tech events for {}", month.label())),
        ),
        pr_body: Some(config.pr_body.clone().unwrap_or_else(|| {
            digest_pr_body(&events, month, &eastern_now_display(now))
        })),
    };

    let pull_request = publisher
        .deploy_document(&document, &target_path, options)
        .await?;
    info!(
        url = %pull_request.url,
        number = pull_request.number,
        events = events.len(),
        "digest deployed"
    );

    Ok(DigestReport {
        month: month.label(),
        events: events.len(),
        failed_sources: failures,
        document: None,
        pull_request: Some(pull_request),
    })
}
