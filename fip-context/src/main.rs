//! fip-context - Main entry point
//!
//! HTTP service returning the song currently playing on FIP, enriched with
//! the musical genres of its performers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fip_common::config::{
    load_toml_config, ConfigOverrides, ServiceConfig, DBPEDIA_SPARQL_ENV, ENVIRONMENT_ENV,
    FIP_API_ENV, WIKI_API_ENV,
};
use fip_context::db::SqliteSongStore;
use fip_context::services::{DbpediaClient, EnrichmentOrchestrator, FanOut, FipClient, WikiClient};
use fip_context::{build_router, AppState};

/// Command-line arguments for fip-context
///
/// Environment variables are read during config resolution so that the
/// CLI > ENV > TOML > default order holds for every field.
#[derive(Parser, Debug)]
#[command(name = "fip-context")]
#[command(about = "Genre enrichment service for the song playing on FIP")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// FIP API base URL
    #[arg(long)]
    fip_api: Option<String>,

    /// Wikipedia api.php URL
    #[arg(long)]
    wiki_api: Option<String>,

    /// DBpedia SPARQL endpoint
    #[arg(long)]
    dbpedia_sparql: Option<String>,

    /// Deployment environment (development, production, ...)
    #[arg(long)]
    env: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Maximum concurrent upstream requests per fan-out stage
    #[arg(long)]
    fan_out_limit: Option<usize>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            fip_api: self.fip_api.clone(),
            wiki_api: self.wiki_api.clone(),
            dbpedia_sparql: self.dbpedia_sparql.clone(),
            environment: self.env.clone(),
            port: self.port,
            database_path: self.database.clone(),
            fan_out_limit: self.fan_out_limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServiceConfig::resolve(&args.overrides(), &toml_config)
        .context("Failed to resolve configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.environment_defaulted {
        warn!(
            "{} is not set, \"{}\" will be used",
            ENVIRONMENT_ENV, config.environment
        );
    }

    info!(
        "Starting fip-context v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );
    info!("Database: {}", config.database_path.display());
    match config.fan_out_limit {
        Some(limit) => info!("Fan-out limit: {} concurrent requests per stage", limit),
        None => info!("Fan-out limit: unbounded"),
    }

    let pool = fip_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let fip_client = FipClient::new(&config.fip_api_url)
        .with_context(|| format!("Failed to create {} client", FIP_API_ENV))?;
    let wiki_client = WikiClient::new(&config.wiki_api_url)
        .with_context(|| format!("Failed to create {} client", WIKI_API_ENV))?;
    let dbpedia_client = DbpediaClient::new(&config.dbpedia_sparql_url)
        .with_context(|| format!("Failed to create {} client", DBPEDIA_SPARQL_ENV))?;

    let enricher = EnrichmentOrchestrator::new(
        Arc::new(wiki_client),
        Arc::new(dbpedia_client),
        FanOut::from_limit(config.fan_out_limit),
    );

    let state = AppState::new(
        Arc::new(fip_client),
        Arc::new(enricher),
        Arc::new(SqliteSongStore::new(pool)),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
