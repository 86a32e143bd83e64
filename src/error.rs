//! Errors surfaced by the domains service and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domains::RepositoryError;

pub type Result<T> = std::result::Result<T, DomainsError>;

#[derive(Debug, Error)]
pub enum DomainsError {
    /// Caller input is missing or was rejected by the repository.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Domain not found")]
    NotFound,

    /// Storage failure or misconfigured infrastructure. Never shown to clients.
    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl DomainsError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<RepositoryError> for DomainsError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::InvalidProperties(msg) => Self::InvalidArgument(msg),
            RepositoryError::Storage(e) => {
                Self::Internal(e.context("Error getting domain info from domain repository"))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for DomainsError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::InvalidArgument(msg) => {
                tracing::warn!("Invalid argument: {}", msg);
                (StatusCode::BAD_REQUEST, "invalid_argument", msg.clone())
            }
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found", "Not found".to_string()),
            Self::Internal(e) => {
                tracing::error!("Serious error content hidden from client: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_properties_become_invalid_argument() {
        let err: DomainsError =
            RepositoryError::InvalidProperties("no such policy".to_string()).into();
        assert!(matches!(err, DomainsError::InvalidArgument(msg) if msg == "no such policy"));
    }

    #[test]
    fn storage_failures_become_internal() {
        let err: DomainsError = RepositoryError::Storage(anyhow::anyhow!("disk full")).into();
        assert!(matches!(err, DomainsError::Internal(_)));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            DomainsError::invalid_argument("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainsError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainsError::Internal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
