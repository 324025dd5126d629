use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::warn;

use crate::app::AppState;
use crate::config::parse_since;
use crate::entry::LogEntry;
use crate::ingest::Admission;
use crate::query;

pub mod viewmodel;

pub fn init(cfg: &mut web::ServiceConfig) {
  cfg
    .service(ingest_log)
    .service(search_logs)
    .service(metrics)
    .service(health)
    .service(ready);
}

#[post("/ingest")]
async fn ingest_log(
  state: web::Data<AppState>,
  body: web::Json<viewmodel::IngestRequest>,
) -> impl Responder {
  if !state.metrics.is_ready() {
    return HttpResponse::ServiceUnavailable().finish();
  }

  let body = body.into_inner();
  let entry = LogEntry::new(body.level, body.message);

  match state.ingest.enqueue(entry) {
    Admission::Admitted => HttpResponse::Accepted().finish(),
    Admission::Rejected => HttpResponse::ServiceUnavailable().finish(),
  }
}

#[get("/search")]
async fn search_logs(
  state: web::Data<AppState>,
  query: web::Query<viewmodel::SearchQuery>,
) -> impl Responder {
  if !state.metrics.is_ready() {
    return HttpResponse::ServiceUnavailable().finish();
  }

  let tokens = match query::parse_query(&query.q) {
    Ok(tokens) => tokens,
    Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
  };

  let since = parse_since(query.since.as_deref());

  let store = state.store.lock().await;
  let results = query::search(store.segments(), &tokens, since, state.config.max_results);
  drop(store);

  state.metrics.record_searched();

  let results: Vec<viewmodel::SearchResult> = results.into_iter().map(Into::into).collect();
  HttpResponse::Ok().json(results)
}

#[get("/metrics")]
async fn metrics(state: web::Data<AppState>) -> impl Responder {
  let store = state.store.lock().await;
  let logs: usize = store.segments().iter().map(|s| s.entries().len()).sum();
  let tokens: usize = store.segments().iter().map(|s| s.total_postings()).sum();
  drop(store);

  let body = format!(
    "uptime_sec {}\nlogs {}\ntokens {}\ningested {}\nsearched {}\n",
    state.metrics.uptime_secs(),
    logs,
    tokens,
    state.metrics.total_ingested(),
    state.metrics.total_searched(),
  );

  HttpResponse::Ok().content_type("text/plain").body(body)
}

#[get("/health")]
async fn health() -> impl Responder {
  HttpResponse::Ok().body("ok")
}

#[get("/ready")]
async fn ready(state: web::Data<AppState>) -> impl Responder {
  if state.metrics.is_ready() {
    HttpResponse::Ok().finish()
  } else {
    warn!("readiness probe hit before the store finished loading");
    HttpResponse::ServiceUnavailable().finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::create_app;
  use crate::segment::Segment;
  use crate::store::SegmentStore;
  use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
  };
  use tempfile::tempdir;
  use tokio::sync::mpsc;

  fn state_with_ready(dir: &std::path::Path, ready: bool) -> (AppState, mpsc::Receiver<LogEntry>) {
    let seg = Segment::open(1, dir, 1000).unwrap();
    let store = SegmentStore::new(dir.to_path_buf(), vec![seg], 0, 1000);
    let metrics = crate::metrics::Metrics::default();
    if ready {
      metrics.set_ready();
    }
    let (tx, rx) = mpsc::channel(10);

    (
      AppState {
        store: std::sync::Arc::new(tokio::sync::Mutex::new(store)),
        ingest: crate::ingest::IngestSurface::new(tx),
        metrics: std::sync::Arc::new(metrics),
        config: crate::config::Config::default(),
      },
      rx,
    )
  }

  #[actix_rt::test]
  async fn ingest_returns_503_when_not_ready() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), false);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::post()
      .uri("/ingest")
      .set_json(&viewmodel::IngestRequest {
        level: "info".into(),
        message: "hi".into(),
      })
      .send_request(&mut app)
      .await;

    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, response.status());
  }

  #[actix_rt::test]
  async fn ingest_returns_202_on_admission() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), true);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::post()
      .uri("/ingest")
      .set_json(&viewmodel::IngestRequest {
        level: "info".into(),
        message: "hello world".into(),
      })
      .send_request(&mut app)
      .await;

    assert_eq!(StatusCode::ACCEPTED, response.status());
  }

  #[actix_rt::test]
  async fn ingest_returns_400_on_malformed_body() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), true);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::post()
      .uri("/ingest")
      .set_payload("not json")
      .insert_header(("content-type", "application/json"))
      .send_request(&mut app)
      .await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
  }

  #[actix_rt::test]
  async fn ingest_wrong_method_is_405() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), true);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::get().uri("/ingest").send_request(&mut app).await;

    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, response.status());
  }

  #[actix_rt::test]
  async fn search_returns_400_on_empty_query() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), true);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::get().uri("/search?q=").send_request(&mut app).await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
  }

  #[actix_rt::test]
  async fn search_finds_ingested_entry_case_insensitively() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), true);

    state
      .store
      .lock()
      .await
      .append(&LogEntry::new("info", "hello world"))
      .unwrap();

    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::get().uri("/search?q=World").send_request(&mut app).await;
    assert_eq!(StatusCode::OK, response.status());

    let body: Vec<viewmodel::SearchResult> = test::read_body_json(response).await;
    assert_eq!(1, body.len());
    assert_eq!("hello world", body[0].message);
  }

  #[actix_rt::test]
  async fn health_is_always_ok() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), false);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::get().uri("/health").send_request(&mut app).await;
    assert_eq!(StatusCode::OK, response.status());
  }

  #[actix_rt::test]
  async fn ready_reflects_metrics_flag() {
    let dir = tempdir().unwrap();
    let (state, _rx) = state_with_ready(dir.path(), false);
    let mut app = test::init_service(create_app!(state)).await;

    let response = TestRequest::get().uri("/ready").send_request(&mut app).await;
    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, response.status());
  }
}
