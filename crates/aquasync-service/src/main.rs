//! Aquasync Service - state cache, diagnostics, and HTTP API.
//!
//! Run with: `cargo run -p aquasync-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use aquasync_core::HttpGateway;
use aquasync_service::{AppState, BackgroundTasks, Config, TaskSet, api};
use aquasync_store::Store;

/// Aquasync Service - pump/heater state reconciliation and diagnostics.
#[derive(Parser, Debug)]
#[command(name = "aquasync-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config and PORT).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Disable the feed collector (API only mode).
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aquasync_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env_overrides();

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    config.validate()?;

    let store = Store::open(&config.storage.path)?;

    let gateway = Arc::new(HttpGateway::new(config.telemetry.gateway_config())?);
    let addr: SocketAddr = config.server.bind.parse()?;

    let state = AppState::new(store, config, gateway.clone(), gateway);

    let tasks = BackgroundTasks::spawn(
        Arc::clone(&state),
        TaskSet {
            collector: !args.no_collector,
            ..TaskSet::default()
        },
    );
    if args.no_collector {
        info!("Feed collector disabled");
    }

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    info!(
        "aquasync-service {} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = tasks.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    tasks.shutdown().await;
    Ok(())
}
