use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::error::Error;

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidRequest(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::VersionConflict { .. } => StatusCode::CONFLICT,
            e if e.is_external() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self.0);
        } else {
            warn!("Request rejected ({}): {}", status, self.0);
        }
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("t-1".into()), StatusCode::NOT_FOUND),
            (
                Error::VersionConflict {
                    thread_id: "t-1".into(),
                    expected: Some(1),
                    actual: Some(2),
                },
                StatusCode::CONFLICT,
            ),
            (Error::Llm("down".into()), StatusCode::BAD_GATEWAY),
            (Error::Review("down".into()), StatusCode::BAD_GATEWAY),
            (Error::Contract("no draft".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::StepLimitExceeded(25), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
