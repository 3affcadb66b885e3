use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),

    #[error("no auth: {0}")]
    NoAuth(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match &self {
            ApiError::Unexpected(e) => {
                tracing::error!("{e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "unexpected error".to_string())
            }
            ApiError::NoAuth(reason) => {
                tracing::info!("rejected request: {reason}");
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
            }
            ApiError::BadRequest(msg) => {
                tracing::info!("bad request: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
        };

        (status_code, Json(json!({ "error": error_message }))).into_response()
    }
}
