//! Backend selection: explicit mode hint or environment probing.
//!
//! The probe is a pure function of [`HostEnvironment`] so tests can pin the
//! inputs; only [`HostEnvironment::probe`] touches the real host, and it is
//! side-effect-free beyond logging.

use std::fmt;
use std::process::{Command, Stdio};
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::RepoConfig;
use crate::contract::Publisher;
use crate::error::PublishError;
use crate::local::GitCliPublisher;
use crate::remote::ApiPublisher;

/// The two supported publish backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Local clone plus the `git` CLI.
    Local,
    /// GitHub REST API only, no local tooling.
    ApiOnly,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Local => write!(f, "local"),
            BackendMode::ApiOnly => write!(f, "api-only"),
        }
    }
}

impl FromStr for BackendMode {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendMode::Local),
            "api-only" | "api" => Ok(BackendMode::ApiOnly),
            other => Err(PublishError::Config(format!(
                "unknown backend mode '{other}' (expected 'local' or 'api-only')"
            ))),
        }
    }
}

/// Environment signals the mode decision is based on.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    /// Compiled for a wasm runtime: no processes, no filesystem.
    pub wasm_runtime: bool,
    /// A working-copy path is configured, so local mode is even possible.
    pub has_working_copy_path: bool,
    /// A `git` executable answers on this host.
    pub git_available: bool,
}

impl HostEnvironment {
    pub fn probe(config: &RepoConfig) -> Self {
        let probed = Self {
            wasm_runtime: cfg!(target_family = "wasm"),
            has_working_copy_path: config.local_path.is_some(),
            git_available: git_available(),
        };
        debug!(?probed, "probed host environment");
        probed
    }
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Picks a backend mode from environment signals, in priority order.
pub fn select_mode(env: &HostEnvironment) -> BackendMode {
    if env.wasm_runtime {
        return BackendMode::ApiOnly;
    }
    if !env.has_working_copy_path {
        return BackendMode::ApiOnly;
    }
    if env.git_available {
        return BackendMode::Local;
    }
    BackendMode::ApiOnly
}

/// Instantiates the publish backend for `mode`, probing the environment
/// when no explicit mode is given. `today` is the Eastern calendar date
/// injected into the backend for its defaults.
pub fn select_backend(
    config: RepoConfig,
    mode: Option<BackendMode>,
    today: NaiveDate,
) -> Result<Box<dyn Publisher>, PublishError> {
    let mode = mode.unwrap_or_else(|| select_mode(&HostEnvironment::probe(&config)));
    info!(mode = %mode, "selected publish backend");
    match mode {
        BackendMode::Local => Ok(Box::new(GitCliPublisher::new(config, today)?)),
        BackendMode::ApiOnly => Ok(Box::new(ApiPublisher::new(config, today))),
    }
}
