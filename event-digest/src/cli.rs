//! CLI glue for event-digest: command parsing, argument validation and the
//! async entrypoint. All business logic lives in `event-digest-core`; this
//! module only wires config, backend selection and the digest pipeline
//! together and shapes user-visible output.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use event_digest_core::digest::publish_digest;
use event_digest_core::error::PublishError;
use event_digest_core::event::sort_chronologically;
use event_digest_core::month::{eastern_today, filter_by_month, MonthSpec};
use event_digest_core::render::render_digest;
use event_digest_core::scrape::{collect_events, MeetupScraper};
use event_digest_core::select::{select_backend, BackendMode};

use crate::load_config::load_config;

/// CLI for event-digest: scrape meetup events and publish a monthly digest.
#[derive(Parser)]
#[clap(
    name = "event-digest",
    version,
    about = "Scrape meetup group events and publish a monthly digest as a pull request"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape, render and open (or reuse) a pull request with the digest
    Deploy {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Target month as YYYY-MM or MM (defaults to the current Eastern month)
        #[clap(long, short)]
        month: Option<String>,
        /// Target file path in the repository (defaults to a generated post path)
        #[clap(long, short)]
        file: Option<String>,
        /// Force a publish backend ('local' or 'api-only') instead of probing
        #[clap(long)]
        backend: Option<String>,
        /// Render and report without touching the repository
        #[clap(long, short = 'd')]
        dry_run: bool,
    },
    /// Scrape and render the digest to stdout without any repository access
    Preview {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Target month as YYYY-MM or MM (defaults to the current Eastern month)
        #[clap(long, short)]
        month: Option<String>,
    },
    /// Check that the repository is reachable and the token authorized
    Validate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Force a publish backend ('local' or 'api-only') instead of probing
        #[clap(long)]
        backend: Option<String>,
    },
}

fn parse_mode(arg: Option<&str>) -> Result<Option<BackendMode>> {
    Ok(arg.map(BackendMode::from_str).transpose()?)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy {
            config,
            month,
            file,
            backend,
            dry_run,
        } => {
            let loaded = load_config(&config)?;
            let mode = parse_mode(backend.as_deref())?;
            let repo = loaded.repo_config()?;
            let now = Utc::now();
            let publisher = select_backend(repo, mode, eastern_today(now))?;
            let scraper = MeetupScraper::new();
            let digest = loaded.digest_config(month, file, dry_run);

            tracing::info!(command = "deploy", month = ?digest.month, "starting deployment");
            match publish_digest(&digest, &scraper, publisher.as_ref(), now).await {
                Ok(report) => {
                    if let Some(document) = &report.document {
                        println!("{document}");
                        println!("(dry run, nothing deployed)");
                    } else if let Some(pr) = &report.pull_request {
                        println!("Pull request: {} (#{}) {}", pr.url, pr.number, pr.title);
                        println!("Events published: {}", report.events);
                    } else {
                        println!("No events found for {}", report.month);
                    }
                    if !report.failed_sources.is_empty() {
                        println!("Sources that failed: {}", report.failed_sources.len());
                    }
                    Ok(())
                }
                Err(PublishError::NothingToPublish) => {
                    tracing::info!("digest already up to date, no open pull request to report");
                    println!("Nothing to publish: the digest already matches the repository.");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "deploy", error = %e, "deployment failed");
                    Err(e.into())
                }
            }
        }
        Commands::Preview { config, month } => {
            let loaded = load_config(&config)?;
            let now = Utc::now();
            let today = eastern_today(now);
            let month = MonthSpec::parse(month.as_deref(), today)?;
            let scraper = MeetupScraper::new();

            let (events, failures) = collect_events(&scraper, loaded.groups()).await;
            let mut events = filter_by_month(events, month);
            sort_chronologically(&mut events);
            tracing::info!(
                command = "preview",
                month = %month.label(),
                events = events.len(),
                failed_sources = failures.len(),
                "rendered preview"
            );
            println!("{}", render_digest(&events, month, today));
            Ok(())
        }
        Commands::Validate { config, backend } => {
            let loaded = load_config(&config)?;
            let mode = parse_mode(backend.as_deref())?;
            let repo = loaded.repo_config()?;
            let now = Utc::now();
            let publisher = select_backend(repo, mode, eastern_today(now))?;
            publisher.validate_repository().await?;
            println!("Repository accessible and token authorized.");
            Ok(())
        }
    }
}
