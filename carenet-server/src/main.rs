use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use carenet_server::{build_app, build_state, ServerConfig};
use config_engine::{load_config, DEFAULT_ENV_PREFIX};

/// CareNet auth core HTTP server
#[derive(Parser, Debug)]
#[command(name = "carenet-server")]
#[command(about = "Authentication, MFA and rate limiting for the CareNet marketplace")]
struct Args {
    /// Configuration file path (TOML, YAML or JSON by extension)
    #[arg(short, long, env = "CARENET_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config: ServerConfig = load_config(args.config.as_deref(), DEFAULT_ENV_PREFIX)
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    logger_redacted::init_tracing(&config.logging).context("Failed to initialise tracing")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting CareNet auth server");

    let http = config.http.clone();
    let state = build_state(config).await?;
    let app = build_app(state, &http);

    let listener = tokio::net::TcpListener::bind((http.host.as_str(), http.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", http.host, http.port))?;

    info!(address = %format!("{}:{}", http.host, http.port), "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
