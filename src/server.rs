//! HTTP surface: request parsing, response marshaling, error mapping.
//!
//! One real route: `GET /?src=<url>` returns the screenshot as `image/png`
//! with a `Cache-Control` max-age mirroring the retention window. Render
//! failures become 5xx responses; the coordinator does all the thinking.

use crate::coordinator::RenderCoordinator;
use crate::Error;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: RenderCoordinator,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(screenshot))
        .route("/favicon.ico", get(favicon))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Deserialize)]
struct ScreenshotParams {
    src: Option<String>,
}

async fn screenshot(
    State(state): State<AppState>,
    Query(params): Query<ScreenshotParams>,
) -> Response {
    let Some(src) = params.src else {
        return (StatusCode::BAD_REQUEST, "missing src parameter").into_response();
    };

    match state.coordinator.get_screenshot(&src).await {
        Ok(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!(status = 200, url = %src, bytes = bytes.len(), "GET screenshot");
                let max_age = state.coordinator.cache().retention().as_secs();
                (
                    [
                        (header::CONTENT_TYPE, "image/png".to_string()),
                        (
                            header::CACHE_CONTROL,
                            format!("public, max-age={}", max_age),
                        ),
                    ],
                    bytes,
                )
                    .into_response()
            }
            Err(e) => {
                warn!(status = 500, url = %src, error = %e, "cached artifact unreadable");
                (StatusCode::INTERNAL_SERVER_ERROR, "error reading screenshot").into_response()
            }
        },
        Err(err) => {
            let status = status_for(&err);
            warn!(status = status.as_u16(), url = %src, error = %err, "GET screenshot failed");
            (status, format!("error creating screenshot: {}", err)).into_response()
        }
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        // A saturated pool clears up by itself; let clients retry
        Error::PoolExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Browsers ask for this on every visit; keep it out of the render path
async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[derive(Serialize)]
struct Health {
    pool_size: usize,
    idle_workers: usize,
    cache_dir: String,
    retention_secs: u64,
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let coordinator = &state.coordinator;
    Json(Health {
        pool_size: coordinator.pool().size(),
        idle_workers: coordinator.pool().idle(),
        cache_dir: coordinator.cache().dir().display().to_string(),
        retention_secs: coordinator.cache().retention().as_secs(),
    })
}
