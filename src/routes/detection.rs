use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::response::{success, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start_detection", post(start_detection))
        .route("/stop_detection", post(stop_detection))
        .route("/status", get(status))
}

pub async fn start_detection(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.detection().start().await?;
    Ok(success("Detection started"))
}

pub async fn stop_detection(State(state): State<AppState>) -> impl IntoResponse {
    if !state.detection().stop().await {
        tracing::debug!("Stop requested while detection was idle");
    }
    success("Detection stopped")
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.detection().status().await)
}
