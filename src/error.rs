use crate::school::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// The externally visible operation a storage failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddSchool,
    FetchSchools,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::AddSchool => "Failed to add school",
            Operation::FetchSchools => "Failed to fetch schools",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddSchool => f.write_str("add_school"),
            Operation::FetchSchools => f.write_str("fetch_schools"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation failed: {}", join_messages(.fields))]
    Validation { fields: Vec<FieldError> },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Unsupported image type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Connection failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Query failed: {cause}")]
    QueryFailed { cause: String },

    #[error("Asset write failed: {cause}")]
    AssetWriteFailed { cause: String },

    #[error("{operation} failed: {cause}")]
    StorageFailed { operation: Operation, cause: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Collapse storage-level failures into an opaque error for `operation`.
    /// Client errors pass through untouched.
    pub fn during(self, operation: Operation) -> Self {
        match self {
            GatewayError::ConnectionFailed { .. }
            | GatewayError::QueryFailed { .. }
            | GatewayError::AssetWriteFailed { .. }
            | GatewayError::Internal(_) => GatewayError::StorageFailed {
                operation,
                cause: self.to_string(),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation { .. } | GatewayError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::ConnectionFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::QueryFailed { .. }
            | GatewayError::AssetWriteFailed { .. }
            | GatewayError::StorageFailed { .. }
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_response = match self {
            GatewayError::Validation { fields } => ErrorResponse {
                success: false,
                error: join_messages(&fields),
                fields: Some(fields),
            },
            GatewayError::InvalidRequest { message } | GatewayError::PayloadTooLarge { message } => {
                ErrorResponse {
                    success: false,
                    error: message,
                    fields: None,
                }
            }
            GatewayError::UnsupportedMediaType { content_type } => ErrorResponse {
                success: false,
                error: format!(
                    "Please upload a valid image file (got '{}'; accepted: JPEG, PNG, GIF, WebP)",
                    content_type
                ),
                fields: None,
            },
            GatewayError::MethodNotAllowed => ErrorResponse {
                success: false,
                error: "Method not allowed".to_string(),
                fields: None,
            },
            GatewayError::StorageFailed { operation, cause } => {
                error!(%operation, %cause, "Storage failure");
                ErrorResponse {
                    success: false,
                    error: operation.failure_message().to_string(),
                    fields: None,
                }
            }
            // Storage errors that were never tagged with an operation still stay opaque.
            other => {
                error!(cause = %other, "Unhandled storage failure");
                ErrorResponse {
                    success: false,
                    error: "Internal server error".to_string(),
                    fields: None,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

fn join_messages(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<tokio_postgres::Error> for GatewayError {
    fn from(err: tokio_postgres::Error) -> Self {
        GatewayError::QueryFailed {
            cause: err.to_string(),
        }
    }
}

impl From<deadpool_postgres::PoolError> for GatewayError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        GatewayError::ConnectionFailed {
            cause: format!("Pool error: {}", err),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::AssetWriteFailed {
            cause: format!("IO error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_hides_storage_details() {
        let err = GatewayError::QueryFailed {
            cause: "relation \"schools\" does not exist".to_string(),
        }
        .during(Operation::AddSchool);

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            GatewayError::StorageFailed { operation, cause } => {
                assert_eq!(operation, Operation::AddSchool);
                assert!(cause.contains("does not exist"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_during_keeps_client_errors() {
        let err = GatewayError::UnsupportedMediaType {
            content_type: "application/pdf".to_string(),
        }
        .during(Operation::AddSchool);

        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = GatewayError::Validation {
            fields: vec![
                FieldError::new("name", "School name is required"),
                FieldError::new("contact", "Please enter a valid 10-digit phone number"),
            ],
        };

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Validation failed: School name is required; Please enter a valid 10-digit phone number"
        );
    }
}
