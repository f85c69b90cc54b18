//! API-only publish backend.
//!
//! Performs every operation through the GitHub REST API — no local
//! filesystem writes, no external executables — so it works on hosts
//! without git or a working copy. Every content write already lands on the
//! remote branch, which makes the push/finalize step a no-op by
//! construction.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::RepoConfig;
use crate::contract::{DeployOptions, PostWriteAction, Publisher, PullRequest};
use crate::error::PublishError;
use crate::github::GitHubApi;

/// Resolved branch state: name plus head commit.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    pub name: String,
    pub sha: String,
}

/// Outcome of materializing content at a path on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Existing content was byte-identical; no commit was made.
    Unchanged,
    /// The file was created or updated via a new commit.
    Committed { commit_sha: String },
}

pub struct ApiPublisher {
    config: RepoConfig,
    api: GitHubApi,
    today: NaiveDate,
}

impl ApiPublisher {
    /// `today` is the Eastern calendar date used for defaulted branch names
    /// and commit messages; injecting it keeps the backend clock-free.
    pub fn new(config: RepoConfig, today: NaiveDate) -> Self {
        let api = GitHubApi::new(&config);
        Self { config, api, today }
    }

    /// Resolves `branch`, creating it from the base branch's current head
    /// when absent. A pre-existing branch is reused as-is, never reset.
    pub async fn ensure_branch(&self, branch: &str) -> Result<BranchInfo, PublishError> {
        match self.api.branch_ref(branch).await {
            Ok(existing) => {
                info!(branch, sha = %existing.object.sha, "branch already exists, reusing");
                Ok(BranchInfo {
                    name: branch.to_string(),
                    sha: existing.object.sha,
                })
            }
            Err(e) if e.is_not_found() => {
                let base = self
                    .api
                    .branch_ref(&self.config.base_branch)
                    .await
                    .map_err(|e| {
                        if e.is_not_found() {
                            PublishError::RepositoryAccess(format!(
                                "base branch '{}' not found in repository",
                                self.config.base_branch
                            ))
                        } else {
                            e
                        }
                    })?;
                let created = self.api.create_ref(branch, &base.object.sha).await?;
                info!(
                    branch,
                    base = %self.config.base_branch,
                    sha = %created.object.sha,
                    "created branch from base head"
                );
                Ok(BranchInfo {
                    name: branch.to_string(),
                    sha: created.object.sha,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Writes `content` to `path` on `branch` through the contents API,
    /// short-circuiting when the existing content is byte-identical. Updates
    /// carry the previous blob SHA so concurrent edits fail instead of being
    /// silently overwritten.
    pub async fn write_document(
        &self,
        path: &str,
        content: &str,
        branch: &str,
        message: &str,
    ) -> Result<WriteOutcome, PublishError> {
        let existing = self.api.file_content(path, branch).await?;
        if let Some(existing) = &existing {
            if existing.content == content {
                info!(path, branch, "file already exists with identical content");
                return Ok(WriteOutcome::Unchanged);
            }
            debug!(path, branch, "file exists with different content, updating");
        } else {
            debug!(path, branch, "file does not exist, creating");
        }

        let previous_sha = existing.as_ref().map(|f| f.sha.as_str());
        let response = self
            .api
            .put_file(path, message, content, branch, previous_sha)
            .await?;
        info!(path, branch, commit = %response.commit.sha, "file committed via contents API");
        Ok(WriteOutcome::Committed {
            commit_sha: response.commit.sha,
        })
    }

    /// Commits several files in one commit via the git-data API: blobs, a
    /// tree on top of the branch head's tree, a commit, then a ref update.
    /// The single-file publish path does not need this; it exists for
    /// batched multi-file changes.
    pub async fn commit_files(
        &self,
        files: &[(&str, &str)],
        message: &str,
        branch: &str,
    ) -> Result<String, PublishError> {
        let head = self.api.branch_ref(branch).await?;
        let parent = self.api.commit_object(&head.object.sha).await?;

        let mut blobs = Vec::with_capacity(files.len());
        for (path, content) in files {
            let blob = self.api.create_blob(content).await?;
            blobs.push((*path, blob.sha));
        }
        let entries = crate::github::tree_entries(
            &blobs
                .iter()
                .map(|(path, sha)| (*path, sha.as_str()))
                .collect::<Vec<_>>(),
        );

        let tree = self.api.create_tree(&parent.tree.sha, entries).await?;
        let commit = self
            .api
            .create_commit(message, &tree.sha, &head.object.sha)
            .await?;
        self.api.update_ref(branch, &commit.sha).await?;
        info!(branch, commit = %commit.sha, files = files.len(), "multi-file commit created");
        Ok(commit.sha)
    }
}

#[async_trait]
impl Publisher for ApiPublisher {
    async fn validate_repository(&self) -> Result<(), PublishError> {
        info!(
            repository = %format!("{}/{}", self.config.owner(), self.config.repo()),
            url = %self.config.remote_url,
            "validating repository configuration"
        );
        let repo = self.api.repository().await.map_err(|e| match e {
            PublishError::Api { status, .. } if matches!(status, 401 | 403 | 404) => {
                PublishError::RepositoryAccess(format!(
                    "{} — check that the repository URL is correct, the repository exists, \
                     and the token has access to it",
                    self.config.remote_url
                ))
            }
            other => other,
        })?;
        info!(
            full_name = %repo.full_name,
            private = repo.private,
            default_branch = %repo.default_branch,
            "repository accessible"
        );
        if let Some(permissions) = &repo.permissions {
            if !permissions.push {
                warn!("token may not have push permission on this repository");
            }
        }
        Ok(())
    }

    async fn deploy_document(
        &self,
        content: &str,
        target_path: &str,
        options: DeployOptions,
    ) -> Result<PullRequest, PublishError> {
        let branch = options.branch_name_or_default(self.today);
        let message = options.commit_message_or_default(self.today);

        self.validate_repository().await?;
        self.ensure_branch(&branch).await?;
        let outcome = self
            .write_document(target_path, content, &branch, &message)
            .await?;
        let committed = matches!(outcome, WriteOutcome::Committed { .. });

        // Push is a no-op here: the contents API already wrote to the
        // remote branch.
        let existing = self.find_open_pull_request(&branch).await;
        match PostWriteAction::decide(committed, existing) {
            PostWriteAction::ReturnExisting(pr) => {
                info!(url = %pr.url, number = pr.number, "open pull request already exists, reusing");
                Ok(pr)
            }
            PostWriteAction::NothingToPublish => Err(PublishError::NothingToPublish),
            PostWriteAction::CreatePullRequest => {
                let title = options.pr_title.as_deref().unwrap_or(&self.config.pr_title);
                let body = options.pr_body.as_deref().unwrap_or(&self.config.pr_body);
                let created = self
                    .api
                    .create_pull_request(title, body, &branch, &self.config.base_branch)
                    .await?;
                info!(url = %created.html_url, number = created.number, "pull request created");
                Ok(PullRequest {
                    url: created.html_url,
                    number: created.number,
                    title: created.title,
                })
            }
        }
    }

    async fn find_open_pull_request(&self, branch_name: &str) -> Option<PullRequest> {
        debug!(
            head = %format!("{}:{branch_name}", self.api.owner()),
            "checking for existing open pull request"
        );
        match self.api.open_pull_request(branch_name).await {
            Ok(Some(pr)) => {
                info!(number = pr.number, title = %pr.title, "found existing open pull request");
                Some(PullRequest {
                    url: pr.html_url,
                    number: pr.number,
                    title: pr.title,
                })
            }
            Ok(None) => {
                debug!(branch = branch_name, "no open pull request for branch");
                None
            }
            Err(e) => {
                // Treated as "none": the caller's next move (create a PR)
                // is safe either way.
                debug!(branch = branch_name, error = %e, "pull request lookup failed");
                None
            }
        }
    }
}
