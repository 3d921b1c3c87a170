//! API error handling
//!
//! Domain failures keep their stable code as the `error` field; the HTTP
//! status is derived from it.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_kernel::PortError;
use domain_remittance::RemittanceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] RemittanceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Stable error code and HTTP status
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Domain(err) => (domain_status(err), err.code()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

fn domain_status(err: &RemittanceError) -> StatusCode {
    match err {
        RemittanceError::Validation { .. }
        | RemittanceError::MissingData { .. }
        | RemittanceError::UnsupportedBank(_)
        | RemittanceError::EmptyRemittance(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RemittanceError::BatchConflict { .. }
        | RemittanceError::AlreadySubmitted(_)
        | RemittanceError::Cancelled => StatusCode::CONFLICT,
        RemittanceError::NotFound { .. } => StatusCode::NOT_FOUND,
        RemittanceError::Layout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        RemittanceError::Port(port) => match port {
            PortError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PortError::Conflict { .. } => StatusCode::CONFLICT,
            PortError::Connection { .. } | PortError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PortError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, code, "Request failed");
        }

        let message = match &self {
            ApiError::Domain(err) => err.to_failure().message,
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Domain(RemittanceError::from(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::RemittanceId;
    use domain_remittance::ConflictAttribute;

    #[test]
    fn test_domain_codes_map_to_statuses() {
        let cases = [
            (RemittanceError::validation("bank_code", "unknown"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                RemittanceError::BatchConflict {
                    attribute: ConflictAttribute::Bank,
                    expected: "237".to_string(),
                    found: "756".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (RemittanceError::AlreadySubmitted(RemittanceId::new()), StatusCode::CONFLICT),
            (RemittanceError::EmptyRemittance(RemittanceId::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (RemittanceError::UnsupportedBank("341".to_string()), StatusCode::UNPROCESSABLE_ENTITY),
            (RemittanceError::not_found("Billet", "BLT-1"), StatusCode::NOT_FOUND),
            (RemittanceError::Port(PortError::connection("down")), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, expected) in cases {
            let code = err.code();
            let (status, api_code) = ApiError::from(err).status_and_code();
            assert_eq!(status, expected, "{code}");
            assert_eq!(api_code, code);
        }
    }

    #[test]
    fn test_missing_permission_is_forbidden() {
        let err = ApiError::from(AuthError::MissingPermission("billet:write".to_string()));
        assert_eq!(err.status_and_code().0, StatusCode::FORBIDDEN);
    }
}
