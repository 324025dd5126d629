mod app;
mod config;
mod entry;
mod error;
mod index;
mod ingest;
mod loader;
mod metrics;
mod query;
mod retention;
mod routes;
mod segment;
mod store;
mod tokenizer;
mod writer;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use tokio::sync::Mutex;
use tracing::info;

use app::AppState;
use config::Config;
use ingest::IngestSurface;
use metrics::Metrics;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("logwatch=info")),
    )
    .init();

  let config = Config::from_env()?;

  info!(data_path = %config.data_path.display(), "loading segments from disk");
  let store = loader::load(
    &config.data_path,
    config.hot_segments,
    config.retention,
    config.max_seg_size,
    config.max_per_token,
  )?;
  let store = Arc::new(Mutex::new(store));

  let metrics = Arc::new(Metrics::default());

  let (tx, rx) = tokio::sync::mpsc::channel(config.channel_size);
  let ingest = IngestSurface::new(tx);

  let writer_handle = tokio::spawn(writer::run(rx, Arc::clone(&store), Arc::clone(&metrics)));

  tokio::spawn(retention::run(
    Arc::clone(&store),
    retention::DEFAULT_INTERVAL,
    config.retention,
  ));

  metrics.set_ready();

  let host = config.host.clone();
  let port = config.port;

  let state = AppState {
    store: Arc::clone(&store),
    ingest: ingest.clone(),
    metrics: Arc::clone(&metrics),
    config: config.clone(),
  };

  info!(%host, port, "starting server");

  // actix-web installs its own SIGINT/SIGTERM handler and shuts its
  // workers down gracefully by default; `server.await` resolves once
  // that's done, at which point every worker's `AppState` (and its
  // `ingest` Sender clone) has already been dropped.
  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(state.clone()))
      .wrap(actix_web::middleware::Logger::default())
      .configure(routes::init)
  })
  .bind((host, port))?
  .run()
  .await?;

  info!("server stopped, closing ingest queue and draining writer");
  drop(ingest);
  writer_handle.await?;

  Ok(())
}
