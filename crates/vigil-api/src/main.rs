//! vigil-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite situation store, wires the event processing network to
//! it, and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use vigil_api::{AppState, ServerConfig};
use vigil_core::notify::AcceptAllValidator;
use vigil_epn::{
  NetworkEngine,
  processor::ResponseTimeProcessor,
  sink::{StoreForwarder, TracingFailureSink},
};
use vigil_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Vigil governance monitor server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("VIGIL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the situation store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;
  let store = Arc::new(store);

  // Build the network engine, feeding terminal situations into the store.
  let engine = NetworkEngine::new(
    server_cfg.engine.clone(),
    Arc::new(StoreForwarder::new(store.clone())),
    Arc::new(TracingFailureSink),
    Arc::new(AcceptAllValidator),
  );
  engine
    .register_node(
      &server_cfg.ingest_subject,
      "response-time",
      Arc::new(ResponseTimeProcessor::new(
        "RequestSent",
        "ResponseReceived",
        server_cfg.response_sla_ms,
      )),
    )
    .await;

  let state = AppState { store, engine };
  let app = vigil_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
