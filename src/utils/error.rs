use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unknown ticket type '{0}'")]
    InvalidTicketType(String),

    #[error("Ticket type '{0}' is sold out")]
    SoldOut(String),

    #[error("Storage error")]
    Storage(#[from] sqlx::Error),

    #[error("Credential issuance failed: {0}")]
    CredentialIssuance(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTicketType(_) => StatusCode::CONFLICT,
            AppError::SoldOut(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::CredentialIssuance(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTicketType(_) => "INVALID_TICKET_TYPE",
            AppError::SoldOut(_) => "SOLD_OUT",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::CredentialIssuance(_) => "CREDENTIAL_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Storage(e) => {
                error!(error = ?e, "Storage error");
            }
            other => {
                error!(error = ?other, code = other.code(), "Application error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::CredentialIssuance(msg) => msg.clone(),
            AppError::InvalidTicketType(_) | AppError::SoldOut(_) => self.to_string(),
            AppError::Storage(_) => "A storage error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_conflicts_map_to_conflict_status() {
        assert_eq!(
            AppError::SoldOut("GA".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidTicketType("VIP".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::SoldOut("GA".into()).code(), "SOLD_OUT");
    }

    #[test]
    fn conflict_messages_name_the_ticket_type() {
        assert_eq!(
            AppError::SoldOut("GA".into()).to_string(),
            "Ticket type 'GA' is sold out"
        );
        assert_eq!(
            AppError::InvalidTicketType("Backstage".into()).to_string(),
            "Unknown ticket type 'Backstage'"
        );
    }

    #[test]
    fn client_errors_use_client_status_codes() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("missing".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
