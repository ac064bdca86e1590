//! Error handling for API endpoints

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use userdir_core::DirectoryError;

/// API error response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg)),
            ApiError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

/// Convert `DirectoryError` to `ApiError`
impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UserNotFound(id) => {
                ApiError::NotFound(format!("User not found: {}", id))
            }
            DirectoryError::MissingField(field) => {
                ApiError::BadRequest(format!("Missing required field: {}", field))
            }
            DirectoryError::InvalidEmail(email) => {
                ApiError::BadRequest(format!("Invalid email: {}", email))
            }
            DirectoryError::InvalidCountry(code) => {
                ApiError::BadRequest(format!("Invalid country code: {}", code))
            }
            DirectoryError::InvalidId(msg) => ApiError::Conflict(msg),
            DirectoryError::InvalidCursor => {
                ApiError::BadRequest("Invalid pagination cursor".to_string())
            }
            DirectoryError::NoPendingMessage => {
                ApiError::Internal("No pending outbox message".to_string())
            }
            DirectoryError::Store(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            error: "Not Found".to_string(),
            details: Some("Resource does not exist".to_string()),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("Not Found"));
        assert!(json.contains("Resource does not exist"));
    }

    #[test]
    fn test_error_response_without_details() {
        let error = ErrorResponse {
            error: "Forbidden".to_string(),
            details: None,
        };

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("Forbidden"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_user_not_found_conversion() {
        let id = userdir_core::UserId::parse(&Uuid::new_v4().to_string()).unwrap();
        let err = DirectoryError::UserNotFound(id);
        let api_err: ApiError = err.into();

        match api_err {
            ApiError::NotFound(msg) => assert!(msg.contains(&id.to_string())),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_invalid_email_conversion() {
        let err = DirectoryError::InvalidEmail("bad".into());
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_store_error_is_internal() {
        let err = DirectoryError::Store("connection reset".into());
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::Internal(_)));
    }
}
