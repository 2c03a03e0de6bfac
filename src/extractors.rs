use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::response::AppError;

/// `axum::Json<T>` that rejects with an [`AppError`] body instead of plain text.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| JsonBody(value))
            .map_err(rejection_to_app_error)
    }
}

fn rejection_to_app_error(rejection: JsonRejection) -> AppError {
    let kind = match &rejection {
        JsonRejection::JsonDataError(_) => "data",
        JsonRejection::JsonSyntaxError(_) => "syntax",
        JsonRejection::MissingJsonContentType(_) => "content-type",
        JsonRejection::BytesRejection(_) => "bytes",
        _ => "other",
    };
    tracing::warn!(kind, error = %rejection, "Rejected JSON body");
    AppError::bad_request(
        "INVALID_REQUEST_BODY",
        "Request body is not valid JSON for this endpoint",
    )
}
