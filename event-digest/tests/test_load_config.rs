use std::env;
use std::fs::write;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::NamedTempFile;

use event_digest::load_config::load_config;

const CONFIG_YAML: &str = r#"
repository:
  url: "https://github.com/spacecoastdevs/astro-site.git"
  base_branch: main
digest:
  groups:
    - "https://www.meetup.com/space-coast-devs/"
    - "https://www.meetup.com/melbourne-makerspace/"
  branch_prefix: update-events
"#;

#[test]
#[serial]
fn loads_repository_and_digest_sections() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), CONFIG_YAML).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(
        config.repository.url,
        "https://github.com/spacecoastdevs/astro-site.git"
    );
    assert_eq!(config.digest.groups.len(), 2);
    assert_eq!(config.digest.branch_prefix.as_deref(), Some("update-events"));
    assert!(config.repository.local_path.is_none());
}

#[test]
#[serial]
fn repo_config_requires_github_token() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), CONFIG_YAML).unwrap();
    let config = load_config(config_file.path()).expect("Config should load");

    env::remove_var("GITHUB_TOKEN");
    env::remove_var("LOCAL_REPO_PATH");
    let err = config.repo_config().unwrap_err();
    assert!(err.to_string().contains("GITHUB_TOKEN"));
}

#[test]
#[serial]
fn repo_config_injects_token_and_local_path_from_env() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), CONFIG_YAML).unwrap();
    let config = load_config(config_file.path()).expect("Config should load");

    env::set_var("GITHUB_TOKEN", "test-token");
    env::set_var("LOCAL_REPO_PATH", "/tmp/astro-site");
    let repo = config.repo_config().expect("repo config should build");
    env::remove_var("GITHUB_TOKEN");
    env::remove_var("LOCAL_REPO_PATH");

    assert_eq!(repo.owner(), "spacecoastdevs");
    assert_eq!(repo.repo(), "astro-site");
    assert_eq!(repo.local_path, Some(PathBuf::from("/tmp/astro-site")));
    assert_eq!(repo.base_branch, "main");
}

#[test]
#[serial]
fn digest_config_prefers_cli_flags_over_file_values() {
    let yaml = r#"
repository:
  url: "https://github.com/acme/site.git"
digest:
  groups:
    - "https://www.meetup.com/space-coast-devs/"
  target_file: "src/pages/events.md"
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    let config = load_config(config_file.path()).expect("Config should load");

    let digest = config.digest_config(Some("2025-08".into()), None, true);
    assert_eq!(digest.month.as_deref(), Some("2025-08"));
    assert_eq!(digest.target_file.as_deref(), Some("src/pages/events.md"));
    assert!(digest.dry_run);

    let overridden = config.digest_config(None, Some("src/pages/other.md".into()), false);
    assert_eq!(overridden.target_file.as_deref(), Some("src/pages/other.md"));
}

#[test]
#[serial]
fn missing_config_file_is_a_clear_error() {
    let err = load_config("definitely-not-here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn malformed_yaml_is_a_clear_error() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "repository: [not: a, mapping").unwrap();
    let err = load_config(config_file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));
}
