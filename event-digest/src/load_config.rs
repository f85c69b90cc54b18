//! Loads the static YAML config and injects environment secrets.
//!
//! This is the only place where untrusted YAML is parsed and mapped into
//! the core's typed config structs, and the only place that reads the
//! environment: `GITHUB_TOKEN` is required, `LOCAL_REPO_PATH` is an
//! optional fallback for the working-copy path. All errors use anyhow for
//! context-rich diagnostics at the CLI boundary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use event_digest_core::config::RepoConfig;
use event_digest_core::digest::DigestConfig;

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub repository: RepositorySection,
    pub digest: DigestSection,
}

#[derive(Debug, Deserialize)]
pub struct RepositorySection {
    /// HTTPS or SSH GitHub remote URL.
    pub url: String,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub pr_title: Option<String>,
    #[serde(default)]
    pub pr_body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DigestSection {
    /// Meetup group pages to scrape.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub branch_prefix: Option<String>,
    #[serde(default)]
    pub target_file: Option<String>,
}

/// Loads a static YAML config file (no secrets live in it).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            config
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    Ok(config)
}

impl CliConfig {
    pub fn groups(&self) -> &[String] {
        &self.digest.groups
    }

    /// Builds the repository config, pulling `GITHUB_TOKEN` (required) and
    /// `LOCAL_REPO_PATH` (optional working-copy fallback) from the
    /// environment.
    pub fn repo_config(&self) -> Result<RepoConfig> {
        let token = env::var("GITHUB_TOKEN").map_err(|_| {
            anyhow::anyhow!("GITHUB_TOKEN must be set in the environment (or a .env file)")
        })?;
        let mut config = RepoConfig::new(self.repository.url.clone(), token)?;
        let local_path = self
            .repository
            .local_path
            .clone()
            .or_else(|| env::var("LOCAL_REPO_PATH").ok().map(PathBuf::from));
        if let Some(path) = local_path {
            config = config.with_local_path(path);
        }
        if let Some(branch) = &self.repository.base_branch {
            config = config.with_base_branch(branch.clone());
        }
        if let Some(title) = &self.repository.pr_title {
            config = config.with_pr_title(title.clone());
        }
        if let Some(body) = &self.repository.pr_body {
            config = config.with_pr_body(body.clone());
        }
        Ok(config)
    }

    /// Builds the digest-run config, CLI flags taking precedence over the
    /// file's values.
    pub fn digest_config(
        &self,
        month: Option<String>,
        target_file: Option<String>,
        dry_run: bool,
    ) -> DigestConfig {
        let mut digest = DigestConfig::new(self.digest.groups.clone());
        digest.month = month;
        digest.target_file = target_file.or_else(|| self.digest.target_file.clone());
        if let Some(prefix) = &self.digest.branch_prefix {
            digest.branch_prefix = prefix.clone();
        }
        digest.dry_run = dry_run;
        digest
    }
}
