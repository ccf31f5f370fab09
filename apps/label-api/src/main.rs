//! Mailing label server
//!
//! REST front end over the label pipeline. Provides endpoints for:
//!
//! - Spreadsheet upload, listing and token census
//! - Label sheet generation (PDF)
//! - Filtered export (XLSX)
//! - Persisted label configuration
//!
//! Uploads are kept on disk for a retention window and swept periodically.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;
mod store;
#[cfg(test)]
mod tests;

use api::{
    handle_export_filtered, handle_generate, handle_get_config, handle_health, handle_list_files,
    handle_reset_config, handle_token_census, handle_update_config, handle_upload,
};
use state::AppState;
use store::{SystemClock, UploadStore};

/// Uploads larger than this are rejected before parsing
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const DEFAULT_PORT: u16 = 8000;

/// Command-line arguments for the label server
#[derive(Parser, Debug)]
#[command(name = "label-api")]
#[command(about = "HTTP server for generating mailing label sheets")]
struct Args {
    /// Port to listen on (defaults to $PORT, then 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory uploaded spreadsheets are kept in
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Label configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Minutes an upload stays available
    #[arg(long, default_value = "60")]
    retention_minutes: i64,

    /// Seconds between sweeps of expired uploads
    #[arg(long, default_value = "300")]
    sweep_interval_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }
}

/// Build the router with all endpoints and middleware
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Uploads
        .route("/upload", post(handle_upload))
        .route("/files", get(handle_list_files))
        .route("/files/:filename/tokens/:column", get(handle_token_census))
        // Output documents
        .route("/generate", post(handle_generate))
        .route("/export-filtered", post(handle_export_filtered))
        // Configuration
        .route("/config", get(handle_get_config).post(handle_update_config))
        .route("/config/reset", post(handle_reset_config))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn spawn_sweeper(store: Arc<UploadStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                info!("Removed {} expired uploads", removed);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = args.port();
    info!("Starting label server on {}:{}", args.host, port);

    let store = UploadStore::open(
        &args.upload_dir,
        chrono::Duration::minutes(args.retention_minutes),
        Arc::new(SystemClock),
    )?;
    let state = AppState::new(store, args.config.clone());
    spawn_sweeper(
        state.store.clone(),
        Duration::from_secs(args.sweep_interval_secs.max(1)),
    );

    let app = app(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!(
        "Uploads in {} (retention {} minutes)",
        state.store.dir().display(),
        args.retention_minutes
    );
    info!("Configuration file: {}", args.config.display());

    axum::serve(listener, app).await?;

    Ok(())
}
