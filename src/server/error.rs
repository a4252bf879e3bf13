//! Handler errors, rendered as `{"error": "..."}` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::DeskError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is missing something the handler needs.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Desk(#[from] DeskError),

    /// File persistence and other glue failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Desk(err) => match err {
                DeskError::EmptySource(_)
                | DeskError::EmptyContent(_)
                | DeskError::MissingInstruction(_)
                | DeskError::ConcurrentRequest(_) => StatusCode::BAD_REQUEST,
                DeskError::Transport(_) | DeskError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
                DeskError::Config(_) | DeskError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Desk(err) => err.user_message(),
            Self::Internal(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::warn!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::BadRequest("URL is required".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(DeskError::Transport("Failed to fetch x: 403".into())).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("disk full")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_is_transparent_for_desk_errors() {
        let err = ApiError::from(DeskError::MalformedResponse("no JSON".into()));
        assert_eq!(err.to_string(), "malformed response: no JSON");
    }
}
