use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a minimal config file for the CLI to read.
fn create_minimal_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"repository:\n  url: \"https://github.com/acme/site.git\"\ndigest:\n  groups:\n    - \"https://www.meetup.com/space-coast-devs/\"\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_all_subcommands() {
    let mut cmd = Command::cargo_bin("event-digest").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("deploy")
                .and(predicate::str::contains("preview"))
                .and(predicate::str::contains("validate")),
        );
}

#[test]
fn deploy_with_missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("event-digest").expect("Binary exists");
    cmd.arg("deploy")
        .arg("--config")
        .arg("definitely-not-here.yaml")
        .env("GITHUB_TOKEN", "test-token");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn deploy_with_unknown_backend_fails_before_any_network_access() {
    let config = create_minimal_config();
    let mut cmd = Command::cargo_bin("event-digest").expect("Binary exists");
    cmd.arg("deploy")
        .arg("--config")
        .arg(config.path())
        .arg("--backend")
        .arg("subversion")
        .env("GITHUB_TOKEN", "test-token");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend mode 'subversion'"));
}

#[test]
fn validate_without_token_reports_the_missing_variable() {
    let config = create_minimal_config();
    let mut cmd = Command::cargo_bin("event-digest").expect("Binary exists");
    cmd.arg("validate")
        .arg("--config")
        .arg(config.path())
        .env_remove("GITHUB_TOKEN");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn deploy_rejects_a_malformed_repository_url() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"repository:\n  url: \"https://example.com/not/github\"\ndigest:\n  groups: []\n",
    )
    .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("event-digest").expect("Binary exists");
    cmd.arg("deploy")
        .arg("--config")
        .arg(config.path())
        .env("GITHUB_TOKEN", "test-token");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid GitHub repository URL"));
}
