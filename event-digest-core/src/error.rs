//! Error types for the publish workflow.
//!
//! Scrape-side failures are deliberately loose (boxed, swallowed per source);
//! publish-side failures are a closed taxonomy so callers can tell a broken
//! configuration from an inaccessible repository from the benign
//! "nothing to publish" outcome. No step is retried automatically.

use thiserror::Error;

/// Error type for event sources (simple boxed error, swallowed per source).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal error of a publish attempt.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Malformed remote URL, missing connection parameter, unknown backend
    /// mode or an unparseable month filter. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository exists check or token authorization failed.
    #[error("repository not accessible: {0}")]
    RepositoryAccess(String),

    /// The target content already matches the repository and no open pull
    /// request exists, so there is nothing meaningful to report.
    #[error("nothing to publish: content is unchanged and no open pull request exists")]
    NothingToPublish,

    /// An external git invocation failed; carries the attempted command and
    /// its captured output verbatim.
    #[error("command failed: {command}\n{output}")]
    Command { command: String, output: String },

    /// The GitHub API answered with a non-success status.
    #[error("GitHub API request failed: {status} {message}")]
    Api { status: u16, message: String },

    /// Transport-encoded file content could not be decoded back to text.
    #[error("content decoding failed: {0}")]
    Decode(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// True for a 404 from the API, which callers use to distinguish
    /// "absent" (branch, file, PR) from a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PublishError::Api { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_matches_api_404() {
        let missing = PublishError::Api {
            status: 404,
            message: "Not Found".into(),
        };
        let denied = PublishError::Api {
            status: 403,
            message: "Forbidden".into(),
        };
        assert!(missing.is_not_found());
        assert!(!denied.is_not_found());
        assert!(!PublishError::NothingToPublish.is_not_found());
    }

    #[test]
    fn command_error_carries_command_and_output() {
        let err = PublishError::Command {
            command: "git push -u origin update-events-2025-08".into(),
            output: "fatal: could not read from remote".into(),
        };
        let text = err.to_string();
        assert!(text.contains("git push -u origin update-events-2025-08"));
        assert!(text.contains("could not read from remote"));
    }
}
