//! # contract: interfaces between the pipeline and its backends
//!
//! This module defines the two seams of the system: [`EventSource`] (where
//! raw event records come from) and [`Publisher`] (how a rendered document
//! becomes a merged-ready pull request), plus the value types they exchange.
//!
//! ## Interface & Extensibility
//! - Implement [`Publisher`] to add a publish backend; the two shipped
//!   implementations are the local working-copy backend and the API-only
//!   backend, selected in [`crate::select`].
//! - Implement [`EventSource`] to scrape a different listing site.
//! - All methods are async; publish failures use [`PublishError`], source
//!   failures use the boxed [`SourceError`].
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so consumers can generate
//!   deterministic mocks for unit/integration tests.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use mockall::{automock, predicate::*};

use crate::error::{PublishError, SourceError};
use crate::event::Event;

/// Branch-name prefix used when a caller supplies no explicit branch.
pub const DEFAULT_BRANCH_PREFIX: &str = "update-events";

/// Terminal artifact of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PullRequest {
    pub url: String,
    pub number: u64,
    pub title: String,
}

/// Per-call overrides for a deployment. Every field has a documented
/// default; the struct is immutable during the call.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Defaults to `update-events-YYYY-MM` for the backend's injected
    /// "today" (Eastern date).
    pub branch_name: Option<String>,
    /// Defaults to `Update events digest - YYYY-MM-DD`.
    pub commit_message: Option<String>,
    /// Defaults to the repository config's PR title.
    pub pr_title: Option<String>,
    /// Defaults to the repository config's PR body.
    pub pr_body: Option<String>,
}

impl DeployOptions {
    pub fn branch_name_or_default(&self, today: NaiveDate) -> String {
        self.branch_name.clone().unwrap_or_else(|| {
            format!(
                "{}-{:04}-{:02}",
                DEFAULT_BRANCH_PREFIX,
                today.year(),
                today.month()
            )
        })
    }

    pub fn commit_message_or_default(&self, today: NaiveDate) -> String {
        self.commit_message
            .clone()
            .unwrap_or_else(|| format!("Update events digest - {}", today.format("%Y-%m-%d")))
    }
}

/// What to do after the materialize/commit steps of a publish.
///
/// Both backends go through this same decision table, which is what makes
/// re-running a publish idempotent: an existing open PR always wins, and a
/// no-op write with no PR to report is a distinguished error.
#[derive(Debug, Clone, PartialEq)]
pub enum PostWriteAction {
    /// An open PR already exists for the branch; return it and never create
    /// a second one, regardless of whether a new commit was made.
    ReturnExisting(PullRequest),
    /// A change landed and no PR exists yet.
    CreatePullRequest,
    /// No change and no PR: nothing meaningful to report.
    NothingToPublish,
}

impl PostWriteAction {
    pub fn decide(committed: bool, existing: Option<PullRequest>) -> Self {
        match (committed, existing) {
            (_, Some(pr)) => PostWriteAction::ReturnExisting(pr),
            (true, None) => PostWriteAction::CreatePullRequest,
            (false, None) => PostWriteAction::NothingToPublish,
        }
    }
}

/// A publish backend: local working copy or remote API, behind one contract.
///
/// Callers hold only this trait; the concrete backend is chosen at
/// construction time by [`crate::select::select_backend`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Confirm the remote repository is reachable and the token authorized.
    /// Failures abort the publish and are never retried automatically.
    async fn validate_repository(&self) -> Result<(), PublishError>;

    /// Run the full publish sequence: validate, ensure branch, materialize
    /// content, commit, push/finalize, dedupe, and create or reuse a pull
    /// request. Fails with [`PublishError::NothingToPublish`] when the
    /// content is unchanged and no open PR exists.
    async fn deploy_document(
        &self,
        content: &str,
        target_path: &str,
        options: DeployOptions,
    ) -> Result<PullRequest, PublishError>;

    /// Look up an existing *open* pull request whose head is `branch_name`.
    /// Never raises: a missing result and a query error are both `None`,
    /// since the dominant caller behavior (create a new PR) is safe either
    /// way.
    async fn find_open_pull_request(&self, branch_name: &str) -> Option<PullRequest>;
}

/// A scraped listing site producing raw event records for one group page.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch all events listed on a single group page. Per-event failures
    /// are swallowed and logged by the implementation; a returned error
    /// means the group page itself was unusable.
    async fn group_events(&self, group_url: &str) -> Result<Vec<Event>, SourceError>;
}
