use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ripple_backend::api;
use ripple_backend::config::RippleConfig;
use ripple_backend::database::Database;
use ripple_backend::events::EventBus;
use ripple_backend::media::MediaService;
use ripple_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Ripple social backend daemon")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = RippleConfig::from_env()?;
    config.paths.ensure_directories()?;

    let database = Database::connect(&config.paths)?;
    let newly_created = database.ensure_migrations()?;
    tracing::info!(
        db_path = %config.paths.db_path.display(),
        newly_created,
        "database ready"
    );

    let http_client = reqwest::Client::builder()
        .user_agent("Ripple/0.1.0")
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("failed to build shared HTTP client")?;
    let media = MediaService::new(config.media.clone(), http_client.clone());
    let events = EventBus::start(config.events.clone(), http_client);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, database, media, events).await,
    }
}
