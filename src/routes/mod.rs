pub mod detection;
pub mod health;
pub mod metrics;
pub mod realtime;
pub mod settings;
pub mod video;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::request_id;
use crate::response::AppError;
use crate::state::AppState;

/// Settings payloads are tiny.
const MAX_BODY_SIZE: usize = 16 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(detection::router())
        .merge(metrics::router())
        .nest("/settings", settings::router())
        .nest("/events", realtime::router())
        .fallback(api_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    let static_dir = state.config().static_dir.clone();
    let index = format!("{static_dir}/index.html");
    let pages = ServeDir::new(&static_dir).not_found_service(ServeFile::new(index));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .route("/video_feed", get(video::video_feed))
        .nest_service("/static", ServeDir::new(&static_dir))
        .fallback_service(pages)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

/// 未知的 API 路径返回 JSON 404，而不是落到页面回退
async fn api_not_found() -> AppError {
    AppError::not_found("API route not found")
}
