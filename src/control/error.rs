//! Control-surface error responses (spec §7 "control endpoint returns
//! non-200 with a `{status, error}` body").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::Error;

pub enum ControlError {
    BadRequest(String),
    Forbidden(String),
    Unavailable(String),
    Internal(String),
}

impl From<Error> for ControlError {
    fn from(e: Error) -> Self {
        if e.is_retryable() {
            ControlError::Unavailable(e.to_string())
        } else {
            ControlError::Internal(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct Body {
    status: &'static str,
    error: String,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let (code, error) = match self {
            ControlError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ControlError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ControlError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ControlError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (code, Json(Body { status: "error", error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_error_maps_to_unavailable() {
        let e = Error::StoreUnavailable("connection refused".to_string());
        assert!(matches!(ControlError::from(e), ControlError::Unavailable(_)));
    }

    #[test]
    fn non_retryable_error_maps_to_internal() {
        let e = Error::ConstraintViolation("bad row".to_string());
        assert!(matches!(ControlError::from(e), ControlError::Internal(_)));
    }

    #[tokio::test]
    async fn forbidden_response_carries_403_and_error_body() {
        let response = ControlError::Forbidden("not allowed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
