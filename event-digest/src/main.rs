use anyhow::Result;
use clap::Parser;
use event_digest::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets (GITHUB_TOKEN, LOCAL_REPO_PATH) may come from a .env file.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("event-digest finished"),
        Err(e) => tracing::error!(error = %e, "event-digest failed"),
    }
    result
}
