use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::detection::Metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(get_metrics))
}

/// 最近一帧的指标；检测停止后保留最后的值
pub async fn get_metrics(State(state): State<AppState>) -> Json<Metrics> {
    Json(state.shared().metrics())
}
