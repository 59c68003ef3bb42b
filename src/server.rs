//! HTTP routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hyperv_exporter::encoding::text;
use hyperv_exporter::sample::SampleSink;
use hyperv_exporter::scrape::Scraper;
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone)]
pub struct AppState {
    scraper: Arc<Scraper>,
    metrics_path: Arc<str>,
}

pub fn router(scraper: Arc<Scraper>, metrics_path: &str) -> Router {
    let state = AppState {
        scraper,
        metrics_path: metrics_path.into(),
    };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/", get(landing_handler))
        .with_state(state)
}

/// Runs a full scrape and renders it. The response is only sent once every
/// collector has finished.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let scraper = Arc::clone(&state.scraper);
    let rendered = tokio::task::spawn_blocking(move || {
        let sink = SampleSink::new();
        scraper.scrape(&sink);

        let mut buffer = String::new();
        text::encode(&mut buffer, &sink.into_samples()).map(|()| buffer)
    })
    .await;

    match rendered {
        Ok(Ok(buffer)) => ([(CONTENT_TYPE, text::CONTENT_TYPE)], buffer).into_response(),
        Ok(Err(error)) => {
            error!(%error, "failed to encode scrape");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(error) => {
            error!(%error, "scrape task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Hyper-V Exporter</title></head>\n\
         <body>\n\
         <h1>Hyper-V Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        path = state.metrics_path
    ))
}
