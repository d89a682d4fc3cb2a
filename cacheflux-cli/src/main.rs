//! CacheFlux CLI
//!
//! Thin collaborator commands around the core: `init` bootstraps the
//! configuration file, `dashboard` serves a static metrics UI while running
//! the collector against the live backend.

use anyhow::{Context, Result, bail};
use axum::Json;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cacheflux_core::{CacheConfig, CacheManager, MetricsCollector, MetricsSink};

#[derive(Parser)]
#[command(name = "cacheflux")]
#[command(about = "Cache-backend abstraction with adaptive TTL and hot backend migration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Path of the configuration file to create
        #[arg(short, long, default_value = "cache-config.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Serve the metrics dashboard and run the metrics collector
    Dashboard {
        /// Path of the configuration file to load and watch
        #[arg(short, long, default_value = "cache-config.json")]
        config: PathBuf,

        /// Dashboard port
        #[arg(short, long, default_value_t = 8275)]
        port: u16,

        /// Path of the JSON metrics log
        #[arg(short, long, default_value = "cache-metrics.json")]
        metrics_log: PathBuf,
    },
}

#[derive(Clone)]
struct AppState {
    manager: Arc<CacheManager>,
    sink: MetricsSink,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Init { config, force } => init(config, force),
        Commands::Dashboard {
            config,
            port,
            metrics_log,
        } => dashboard(config, port, metrics_log).await,
    }
}

fn init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{:?} already exists; pass --force to overwrite",
            path
        );
    }
    CacheConfig::default()
        .store(&path)
        .with_context(|| format!("failed to write default configuration to {path:?}"))?;
    info!("Wrote default configuration to {:?}", path);
    Ok(())
}

async fn dashboard(config: PathBuf, port: u16, metrics_log: PathBuf) -> Result<()> {
    let manager = Arc::new(CacheManager::new(&config));
    manager
        .acquire()
        .await
        .context("failed to initialize cache backend")?;

    let sink = MetricsSink::new(&metrics_log);
    MetricsCollector::new(manager.clone(), sink.clone()).start();

    let state = AppState { manager, sink };
    let app = axum::Router::new()
        .route("/", get(index))
        .route("/api/metrics", get(metrics))
        .route("/api/config", get(current_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(Value::Array(state.sink.read_entries()))
}

async fn current_config(State(state): State<AppState>) -> Json<Option<CacheConfig>> {
    Json(state.manager.current_config().await)
}
