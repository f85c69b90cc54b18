//! Repository connection configuration.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PublishError;

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_PR_TITLE: &str = "Update events digest";
pub const DEFAULT_PR_BODY: &str = "Automated update of the monthly events digest";

fn owner_repo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"github\.com[/:]([^/]+)/([^/\s]+?)(?:\.git)?$").unwrap())
}

/// Connection parameters for the target repository.
///
/// Owner and repository name are extracted from `remote_url` at construction
/// time; an unrecognizable URL fails immediately rather than at first use.
/// The config is read-only after construction and owned by the backend for
/// its lifetime.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub remote_url: String,
    /// Working-copy directory; required by the local backend, unused by the
    /// API backend.
    pub local_path: Option<PathBuf>,
    pub token: String,
    pub base_branch: String,
    pub pr_title: String,
    pub pr_body: String,
    owner: String,
    repo: String,
}

impl RepoConfig {
    pub fn new(
        remote_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let remote_url = remote_url.into();
        let (owner, repo) = extract_owner_repo(&remote_url)?;
        Ok(Self {
            remote_url,
            local_path: None,
            token: token.into(),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            pr_body: DEFAULT_PR_BODY.to_string(),
            owner,
            repo,
        })
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }

    pub fn with_pr_title(mut self, title: impl Into<String>) -> Self {
        self.pr_title = title.into();
        self
    }

    pub fn with_pr_body(mut self, body: impl Into<String>) -> Self {
        self.pr_body = body.into();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

/// Extracts `(owner, repo)` from an HTTPS or SSH GitHub remote URL.
pub fn extract_owner_repo(remote_url: &str) -> Result<(String, String), PublishError> {
    let captures = owner_repo_re().captures(remote_url).ok_or_else(|| {
        PublishError::Config(format!(
            "invalid GitHub repository URL format: {remote_url}"
        ))
    })?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_owner_repo_from_https_url() {
        let (owner, repo) =
            extract_owner_repo("https://github.com/spacecoastdevs/astro-site.git").unwrap();
        assert_eq!(owner, "spacecoastdevs");
        assert_eq!(repo, "astro-site");
    }

    #[test]
    fn extracts_owner_repo_from_ssh_url() {
        let (owner, repo) = extract_owner_repo("git@github.com:acme/site.git").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "site");
    }

    #[test]
    fn extracts_owner_repo_without_git_suffix() {
        let (owner, repo) = extract_owner_repo("https://github.com/acme/site").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "site");
    }

    #[test]
    fn rejects_unrecognizable_url() {
        let err = RepoConfig::new("https://example.com/acme/site.git", "token").unwrap_err();
        assert!(matches!(err, PublishError::Config(_)));
    }

    #[test]
    fn applies_documented_defaults() {
        let config = RepoConfig::new("https://github.com/acme/site.git", "token").unwrap();
        assert_eq!(config.base_branch, "main");
        assert_eq!(config.pr_title, DEFAULT_PR_TITLE);
        assert_eq!(config.pr_body, DEFAULT_PR_BODY);
        assert!(config.local_path.is_none());
    }

    #[test]
    fn builder_overrides_stick() {
        let config = RepoConfig::new("https://github.com/acme/site.git", "token")
            .unwrap()
            .with_local_path("/tmp/site")
            .with_base_branch("trunk")
            .with_pr_title("title")
            .with_pr_body("body");
        assert_eq!(config.local_path.as_deref().unwrap().to_str(), Some("/tmp/site"));
        assert_eq!(config.base_branch, "trunk");
        assert_eq!(config.pr_title, "title");
        assert_eq!(config.pr_body, "body");
    }
}
