use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::ingest::IngestSurface;
use crate::metrics::Metrics;
use crate::store::SegmentStore;

/// Everything an actix-web handler needs, shared across the process
/// via `web::Data`.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<Mutex<SegmentStore>>,
  pub ingest: IngestSurface,
  pub metrics: Arc<Metrics>,
  pub config: Config,
}

/// Builds an actix-web `App` wired with a given `AppState`, for use
/// both by `main` and by route-level tests. Mirrors the teacher's
/// `create_app!` macro, generalized to the richer state this service
/// needs.
#[macro_export]
macro_rules! create_app {
  ($state:expr) => {{
    actix_web::App::new()
      .app_data(actix_web::web::Data::new($state))
      .wrap(actix_web::middleware::Logger::default())
      .configure($crate::routes::init)
  }};
}
