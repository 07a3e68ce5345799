use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use sentinel::config::Config;
use sentinel::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "sentinel", about = "SentinelAI backend: security news, waitlist, sample report")]
struct Args {
    /// Path to the TOML config file (optional; defaults apply if missing)
    #[arg(long, value_name = "FILE", default_value = "sentinel.toml")]
    config: PathBuf,

    /// Port to listen on (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?
        .with_env_overrides()
        .context("Invalid environment override")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    for dir in [&config.data_dir, &config.static_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
    }

    let state = AppState::from_config(&config).context("Failed to build HTTP client")?;
    let app = server::router(state, &config.cors_allowed_origins);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(feeds = config.feeds.len(), "Aggregating news feeds");

    server::serve(listener, app).await.context("Server error")?;
    Ok(())
}
