use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::detection::DetectionError;
use crate::vision::VisionError;

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

/// 控制类接口的返回体：`{"status": "success", "message": ...}`
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str, trace_id: Option<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            code: code.to_string(),
            message: message.to_string(),
            trace_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    fn operational(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn bad_request(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::CONFLICT, code, message)
    }

    pub fn service_unavailable(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody::new(&self.code, &exposed_message, None)),
        )
            .into_response()
    }
}

// 相机/模型不可用属于运行环境问题，消息可直接返回给前端；其余归为内部错误
impl From<DetectionError> for AppError {
    fn from(value: DetectionError) -> Self {
        match &value {
            DetectionError::AlreadyRunning => {
                AppError::conflict("DETECTION_RUNNING", "Detection already running")
            }
            DetectionError::Vision(VisionError::CameraUnavailable { .. })
            | DetectionError::Vision(VisionError::Unsupported(_)) => {
                AppError::service_unavailable("CAMERA_UNAVAILABLE", &value.to_string())
            }
            DetectionError::Vision(VisionError::Model { .. }) => {
                AppError::service_unavailable("MODEL_UNAVAILABLE", &value.to_string())
            }
            _ => AppError::internal(&value.to_string()),
        }
    }
}

pub fn success(message: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusMessage {
            status: STATUS_SUCCESS,
            message: message.to_string(),
        }),
    )
}

pub fn success_with<T: Serialize>(field: &str, data: T) -> Result<Response, AppError> {
    let data = serde_json::to_value(data).map_err(|e| AppError::internal(&e.to_string()))?;
    let mut body = serde_json::Map::new();
    body.insert("status".to_string(), STATUS_SUCCESS.into());
    body.insert(field.to_string(), data);
    Ok((StatusCode::OK, Json(serde_json::Value::Object(body))).into_response())
}
