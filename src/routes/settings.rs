use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::detection::DetectionSettings;
use crate::extractors::JsonBody;
use crate::response::{success_with, AppError};
use crate::state::AppState;
use crate::validation::{validate_consec_frames, validate_ear_threshold, validate_yawn_threshold};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).post(update_settings))
}

/// 前端以 camelCase 提交，同时接受 snake_case；未出现的字段保持不变，其余字段（如 alertSound）忽略
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, alias = "earThreshold")]
    pub ear_threshold: Option<f64>,
    #[serde(default, alias = "yawnThreshold")]
    pub yawn_threshold: Option<f64>,
    #[serde(default, alias = "earConsecFrames")]
    pub ear_consec_frames: Option<u32>,
}

impl SettingsUpdate {
    fn apply(&self, current: DetectionSettings, analysis_size: u32) -> Result<DetectionSettings, AppError> {
        let invalid = |msg: &str| AppError::bad_request("VALIDATION_ERROR", msg);
        let mut next = current;

        if let Some(v) = self.ear_threshold {
            validate_ear_threshold(v).map_err(invalid)?;
            next.ear_threshold = v;
        }
        if let Some(v) = self.yawn_threshold {
            validate_yawn_threshold(v, analysis_size).map_err(invalid)?;
            next.yawn_threshold = v;
        }
        if let Some(v) = self.ear_consec_frames {
            validate_consec_frames(v).map_err(invalid)?;
            next.ear_consec_frames = v;
        }
        Ok(next)
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Json<DetectionSettings> {
    Json(state.shared().settings())
}

pub async fn update_settings(
    State(state): State<AppState>,
    JsonBody(update): JsonBody<SettingsUpdate>,
) -> Result<Response, AppError> {
    let current = state.shared().settings();
    let next = update.apply(current, state.config().detection.analysis_size)?;

    if next != current {
        state.shared().update_settings(next);
        tracing::info!(settings = ?next, "Detection settings updated");
    }
    success_with("settings", next)
}
