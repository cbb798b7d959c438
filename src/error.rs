use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No phone number: {0}")]
    NoPhoneNumber(String),

    #[error("Phone number not verified: {0}")]
    NotVerified(String),

    #[error("WhatsApp transport failure: {0}")]
    TransportFailure(String),

    #[error("WhatsApp API error: HTTP {status}, Response: {body}")]
    ApiFailure { status: u16, body: String },

    #[error("Verification code mismatch")]
    VerificationMismatch,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoPhoneNumber(_)
            | AppError::VerificationMismatch
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotVerified(_) | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::TransportFailure(_) | AppError::ApiFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::NoPhoneNumber(msg) => {
                log::warn!("No phone number: {msg}");
                ("NO_PHONE_NUMBER", msg.clone())
            }
            AppError::NotVerified(phone) => {
                log::warn!("Phone number {phone} not verified");
                (
                    "NOT_VERIFIED",
                    "Phone number is not verified".to_string(),
                )
            }
            AppError::VerificationMismatch => (
                "VERIFICATION_MISMATCH",
                "Verification code is invalid or expired".to_string(),
            ),
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ("AUTH_ERROR", msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("Token rejected: {err}");
                ("AUTH_ERROR", "Invalid access token".to_string())
            }
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                ("FORBIDDEN", "Forbidden".to_string())
            }
            AppError::TransportFailure(msg) => {
                log::error!("WhatsApp transport failure: {msg}");
                (
                    "TRANSPORT_FAILURE",
                    "Could not reach the WhatsApp API".to_string(),
                )
            }
            AppError::ApiFailure { status, .. } => (
                "API_FAILURE",
                format!("WhatsApp API rejected the request with HTTP {status}"),
            ),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ("DATABASE_ERROR", "Database error".to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_status_codes() {
        assert_eq!(
            AppError::NoPhoneNumber("x".to_string()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotVerified("+923042783912".to_string())
                .error_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::ApiFailure {
                status: 400,
                body: "{}".to_string()
            }
            .error_response()
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::VerificationMismatch.error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ConfigError("missing".to_string())
                .error_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
