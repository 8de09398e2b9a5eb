//! manglo-api server entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use manglo_api::services::completion::{CompletionBackend, OpenRouterClient};
use manglo_api::{build_router, AppState};
use manglo_common::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "manglo-api", about = "Mango disease management backend")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        "manglo-api {} ({} {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    );

    let args = Args::parse();
    let config = Arc::new(AppConfig::load(args.config.as_deref())?);

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.uploads_dir())?;

    let db = manglo_common::db::init_database(&config.db_path()).await?;
    info!("✓ Database ready: {}", config.db_path().display());

    if config.chat.api_key.is_none() {
        info!("No OpenRouter API key configured; chat will serve knowledge-base fallbacks only");
    }

    let backend: Arc<dyn CompletionBackend> = Arc::new(OpenRouterClient::new(config.chat.clone())?);
    let state = AppState::new(db, config.clone(), backend);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("✓ manglo-api listening on http://{}", config.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
