//! Local working-copy publish backend.
//!
//! Drives the `git` CLI against a locally materialized clone of the target
//! repository, then uses the GitHub REST API for the pull-request steps.
//! Every failed git invocation is wrapped with the attempted command line
//! and its captured output, verbatim, for diagnosis.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::RepoConfig;
use crate::contract::{DeployOptions, PostWriteAction, Publisher, PullRequest};
use crate::error::PublishError;
use crate::github::GitHubApi;

pub struct GitCliPublisher {
    config: RepoConfig,
    repo_path: PathBuf,
    api: GitHubApi,
    today: NaiveDate,
}

impl GitCliPublisher {
    /// Fails when the config carries no working-copy path; the local
    /// backend cannot operate without one.
    pub fn new(config: RepoConfig, today: NaiveDate) -> Result<Self, PublishError> {
        let repo_path = config.local_path.clone().ok_or_else(|| {
            PublishError::Config(
                "local backend requires a working-copy path (repository.local_path)".into(),
            )
        })?;
        let api = GitHubApi::new(&config);
        Ok(Self {
            config,
            repo_path,
            api,
            today,
        })
    }

    /// Runs a git command inside the working copy, returning trimmed stdout.
    fn run_git(&self, args: &[&str]) -> Result<String, PublishError> {
        let rendered = format!("git {}", args.join(" "));
        debug!(command = %rendered, "running git command");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| PublishError::Command {
                command: rendered.clone(),
                output: e.to_string(),
            })?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !stdout.is_empty() {
                if !combined.is_empty() {
                    combined.push('\n');
                }
                combined.push_str(&stdout);
            }
            return Err(PublishError::Command {
                command: rendered,
                output: combined,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Clones the repository when the working copy is missing, otherwise
    /// fetches and fast-forwards the base branch.
    pub fn setup_repository(&self) -> Result<(), PublishError> {
        if self.repo_path.exists() {
            info!(path = %self.repo_path.display(), "working copy exists, updating");
            self.run_git(&["fetch", "origin"])?;
            self.run_git(&["checkout", &self.config.base_branch])?;
            self.run_git(&["pull", "origin", &self.config.base_branch])?;
        } else {
            info!(
                path = %self.repo_path.display(),
                url = %self.config.remote_url,
                "cloning repository"
            );
            if let Some(parent) = self.repo_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let rendered = format!(
                "git clone {} {}",
                self.config.remote_url,
                self.repo_path.display()
            );
            let output = Command::new("git")
                .arg("clone")
                .arg(&self.config.remote_url)
                .arg(&self.repo_path)
                .output()
                .map_err(|e| PublishError::Command {
                    command: rendered.clone(),
                    output: e.to_string(),
                })?;
            if !output.status.success() {
                return Err(PublishError::Command {
                    command: rendered,
                    output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            self.run_git(&["checkout", &self.config.base_branch])?;
        }
        Ok(())
    }

    /// Resolves or creates `branch`: local branch list first, then a remote
    /// branch of the same name, then a fresh branch off the base branch.
    /// If the checks themselves error, falls back to plain creation.
    pub fn create_branch(&self, branch: &str) -> Result<(), PublishError> {
        info!(branch, "setting up branch");
        self.run_git(&["checkout", &self.config.base_branch])?;
        self.run_git(&["pull", "origin", &self.config.base_branch])?;

        match self.run_git(&["branch", "--list", branch]) {
            Ok(listed) if !listed.is_empty() => {
                info!(branch, "branch exists locally, switching to it");
                self.run_git(&["checkout", branch])?;
                if let Err(e) = self.run_git(&["pull", "origin", branch]) {
                    debug!(branch, error = %e, "no remote branch yet, will create on push");
                }
            }
            Ok(_) => {
                if self.run_git(&["fetch", "origin", branch]).is_ok() {
                    info!(branch, "branch exists on remote, checking it out");
                    self.run_git(&["checkout", "-b", branch, &format!("origin/{branch}")])?;
                } else {
                    info!(branch, "creating new branch");
                    self.run_git(&["checkout", "-b", branch])?;
                }
            }
            Err(e) => {
                debug!(branch, error = %e, "branch listing failed, creating new branch");
                self.run_git(&["checkout", "-b", branch])?;
            }
        }
        Ok(())
    }

    /// Writes the document into the working copy, creating parent
    /// directories as needed. The content comparison here is purely for
    /// logging; the staged diff in [`Self::commit_changes`] is the source
    /// of truth for "no changes".
    pub fn write_document(&self, target_path: &str, content: &str) -> Result<(), PublishError> {
        let full_path = self.repo_path.join(target_path);
        if let Some(dir) = full_path.parent() {
            if !dir.exists() {
                debug!(dir = %dir.display(), "creating directory");
                fs::create_dir_all(dir)?;
            }
        }
        match fs::read_to_string(&full_path) {
            Ok(existing) if existing == content => {
                info!(path = %full_path.display(), "file already exists with identical content");
            }
            Ok(_) => {
                info!(path = %full_path.display(), "file exists with different content, will update");
            }
            Err(_) => {
                info!(path = %full_path.display(), "file does not exist, will create");
            }
        }
        fs::write(&full_path, content)?;
        debug!(path = %full_path.display(), bytes = content.len(), "document written");
        Ok(())
    }

    /// Stages exactly the given paths and commits them. Returns `false`
    /// when the staged diff is empty, independent of any unrelated
    /// working-tree modifications.
    pub fn commit_changes(&self, message: &str, paths: &[&str]) -> Result<bool, PublishError> {
        for path in paths {
            debug!(path, "staging file");
            self.run_git(&["add", path])?;
        }
        let staged = self.run_git(&["diff", "--cached", "--name-only"])?;
        if staged.is_empty() {
            let status = self.run_git(&["status", "--porcelain"]).unwrap_or_default();
            debug!(status = %status, "working tree status");
            info!("no changes to commit");
            return Ok(false);
        }
        debug!(files = %staged, "files in staging area");
        info!(message, "committing changes");
        self.run_git(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Pushes the branch to origin with upstream tracking.
    pub fn push_branch(&self, branch: &str) -> Result<(), PublishError> {
        info!(branch, "pushing branch");
        self.run_git(&["push", "-u", "origin", branch])?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitCliPublisher {
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
        self.setup_repository()?;
        self.create_branch(&branch)?;
        self.write_document(target_path, content)?;
        let committed = self.commit_changes(&message, &[target_path])?;
        if committed {
            self.push_branch(&branch)?;
        }

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
                debug!(branch = branch_name, error = %e, "pull request lookup failed");
                None
            }
        }
    }
}
