/// Error Handling Module
///
/// One taxonomy for the whole service:
/// 1. Domain errors (validation, authentication, authorization)
/// 2. Storage errors wrapped with the operation that hit them
/// 3. HTTP mapping with stable codes and opaque internal failures
/// 4. Structured logging that never carries credentials

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::store::{Entity, StoreError};

// ============================================================================
// 1. DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Validation errors for already-deserialized request fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(&'static str),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(&'static str, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(&'static str),
    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),
}

/// Authentication and authorization errors
///
/// `InvalidCredentials` covers both an unknown username and a wrong password,
/// `InvalidToken` covers unknown, consumed, expired and tampered tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("missing or invalid authorization")]
    Unauthenticated,
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
}

// ============================================================================
// 2. UNIFIED APPLICATION ERROR TYPE
// ============================================================================

/// Central error type that every service operation returns
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("user already exists")]
    DuplicateUser,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        source: StoreError,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Tag a store failure with the operation that produced it.
    ///
    /// Uniqueness conflicts and lookup misses keep their meaning; everything
    /// else becomes an opaque storage failure.
    pub fn storage(op: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::DuplicateUser,
            StoreError::NotFound(entity) => AppError::NotFound(entity),
            source => AppError::Storage { op, source },
        }
    }

    /// Stable, documented code exposed to callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(AuthError::InvalidCredentials) => "INVALID_CREDENTIALS",
            AppError::Auth(AuthError::InvalidToken) => "TOKEN_INVALID",
            AppError::Auth(AuthError::Unauthenticated) => "UNAUTHENTICATED",
            AppError::Auth(AuthError::PermissionDenied(_)) => "PERMISSION_DENIED",
            AppError::DuplicateUser => "DUPLICATE_USER",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Storage { .. } | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller. Store details never leave here.
    fn public_message(&self) -> String {
        match self {
            AppError::Storage { .. } | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with server logs
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, error_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let response = ErrorResponse::new(
            error_id.to_string(),
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );
        (status, response)
    }

    fn log_error(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(error_id = error_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::DuplicateUser => {
                tracing::warn!(error_id = error_id, "Duplicate registration attempt");
            }
            AppError::NotFound(entity) => {
                tracing::info!(error_id = error_id, entity = %entity, "Lookup miss");
            }
            AppError::Storage { op, source } => {
                tracing::error!(error_id = error_id, op = *op, error = %source, "Storage error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &error_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::DuplicateUser => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email");
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_store_errors_keep_their_meaning() {
        assert!(matches!(
            AppError::storage("credentials.register", StoreError::Duplicate),
            AppError::DuplicateUser
        ));
        assert!(matches!(
            AppError::storage("profile.get", StoreError::NotFound(Entity::User)),
            AppError::NotFound(Entity::User)
        ));
        assert!(matches!(
            AppError::storage("credentials.login", StoreError::SerializationConflict),
            AppError::Storage { op: "credentials.login", .. }
        ));
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let err = AppError::storage(
            "credentials.refresh",
            StoreError::Database(sqlx::Error::Protocol(
                "relation \"refresh_tokens\" does not exist".to_string(),
            )),
        );
        let (status, body) = ErrorHandler::error_response(&err, "err-1");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("refresh_tokens"));
    }

    #[test]
    fn test_auth_status_codes() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AuthError::PermissionDenied("admin role required"), StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            assert_eq!(ResponseError::status_code(&AppError::Auth(err)), expected);
        }
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }
}
