use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Conflict on {0}")]
    Conflict(String),

    #[error("Ledger submission failed: {0}")]
    LedgerSubmission(#[source] LedgerError),

    #[error("Token mint failed: {0}")]
    Mint(#[source] LedgerError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::LedgerSubmission(_)
            | AppError::Mint(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message for the response body. Diagnostic detail goes
    /// into `details`; credential material never appears in either.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::Unauthorized(_) => "Unauthorized".to_string(),
            AppError::NotFound(message) => message.clone(),
            AppError::Conflict(_) => "Batch token already registered".to_string(),
            AppError::LedgerSubmission(err) | AppError::Mint(err) => gateway_message(err),
            AppError::Storage(_) | AppError::Internal(_) => {
                "Batch registration failed.".to_string()
            }
        }
    }
}

/// Maps the gateway's error vocabulary onto operator-actionable messages.
fn gateway_message(err: &LedgerError) -> String {
    if let LedgerError::Gateway { status, .. } = err {
        match status.as_str() {
            "INSUFFICIENT_TX_FEE" => {
                return "Insufficient operator balance for transaction fees.".to_string()
            }
            "INVALID_SIGNATURE" => {
                return "Invalid signature. Check the operator key.".to_string()
            }
            "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT" => {
                return "Farmer account is not associated with the batch token.".to_string()
            }
            _ => {}
        }
    }
    "Batch registration failed.".to_string()
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(constraint) => AppError::Conflict(constraint),
            RepositoryError::NotFound(detail) => AppError::NotFound(detail),
            RepositoryError::Database(detail) => AppError::Storage(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.public_message(),
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::validation("quantity", "Invalid quantity");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.public_message(), "Invalid quantity");
    }

    #[test]
    fn test_unauthorized_status_code() {
        let error = AppError::Unauthorized("missing farmer identity".to_string());
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_conflict_status_code() {
        let error: AppError = RepositoryError::Conflict("batches_nft_id_key".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.public_message(), "Batch token already registered");
    }

    #[test]
    fn test_ledger_errors_are_internal() {
        let error = AppError::LedgerSubmission(LedgerError::CircuitOpen);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_gateway_vocabulary_maps_to_operator_messages() {
        let error = AppError::Mint(LedgerError::Gateway {
            status: "INSUFFICIENT_TX_FEE".to_string(),
            message: "operator balance too low".to_string(),
        });
        assert_eq!(
            error.public_message(),
            "Insufficient operator balance for transaction fees."
        );

        let unknown = AppError::Mint(LedgerError::Gateway {
            status: "SOMETHING_ELSE".to_string(),
            message: "?".to_string(),
        });
        assert_eq!(unknown.public_message(), "Batch registration failed.");
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let error = AppError::validation("quantity", "Invalid quantity");
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_found_error_response() {
        let error = AppError::NotFound("Batch not found or access denied".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
