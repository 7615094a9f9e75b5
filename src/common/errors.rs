use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::fmt;

/// Error taxonomy shared by every handler and the device save workflow
#[derive(Debug, Clone)]
pub enum BusinessError {
    /// Validation errors for user input (400 Bad Request)
    ValidationError { field: String, message: String },
    /// Resource not found (404 Not Found)
    NotFound { resource: String, id: String },
    /// Duplicate resource (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Missing or unknown session (401 Unauthorized)
    Unauthenticated { message: String },
    /// Blob write refused because the object already exists (409 Conflict)
    UploadConflict { path: String },
    /// Blob write failed in transit (502 Bad Gateway)
    UploadFailed { path: String, message: String },
    /// External service errors (502 Bad Gateway)
    ExternalServiceError { service: String, message: String },
    /// Any other backend failure, message surfaced verbatim (500)
    DatabaseError { message: String },
    /// Generic application error (500 Internal Server Error)
    InternalError { message: String },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ValidationError { field, message } => {
                write!(f, "Validation error in field '{field}': {message}")
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::Unauthenticated { message } => {
                write!(f, "Not authenticated: {message}")
            }
            BusinessError::UploadConflict { path } => {
                write!(f, "Media object '{path}' already exists")
            }
            BusinessError::UploadFailed { path, message } => {
                write!(f, "Upload of '{path}' failed: {message}")
            }
            BusinessError::ExternalServiceError { service, message } => {
                write!(f, "External service '{service}' error: {message}")
            }
            BusinessError::DatabaseError { message } => {
                write!(f, "Database error: {message}")
            }
            BusinessError::InternalError { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

impl BusinessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BusinessError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            BusinessError::NotFound { .. } => StatusCode::NOT_FOUND,
            BusinessError::Duplicate { .. } | BusinessError::UploadConflict { .. } => {
                StatusCode::CONFLICT
            }
            BusinessError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            BusinessError::UploadFailed { .. } | BusinessError::ExternalServiceError { .. } => {
                StatusCode::BAD_GATEWAY
            }
            BusinessError::DatabaseError { .. } | BusinessError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BusinessError::ValidationError { .. } => "VALIDATION_ERROR",
            BusinessError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            BusinessError::Duplicate { .. } => "DUPLICATE_RESOURCE",
            BusinessError::Unauthenticated { .. } => "UNAUTHENTICATED",
            BusinessError::UploadConflict { .. } => "UPLOAD_CONFLICT",
            BusinessError::UploadFailed { .. } => "UPLOAD_FAILED",
            BusinessError::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            BusinessError::DatabaseError { .. } => "DATABASE_ERROR",
            BusinessError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    /// Body shared by the plain response and the save-failure response
    pub fn to_json(&self) -> serde_json::Value {
        let message = match self {
            BusinessError::ValidationError { field, message } => {
                format!("Validation failed for field '{field}': {message}")
            }
            other => other.to_string(),
        };

        json!({
            "error": {
                "code": self.error_code(),
                "message": message,
                "type": format!("{self:?}").split('{').next().unwrap_or("Unknown").trim()
            }
        })
    }
}

/// Convert BusinessError to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

/// Maps database errors onto the business taxonomy
pub struct ErrorMapper;

impl ErrorMapper {
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return BusinessError::Duplicate {
                resource: Self::extract_resource_from_context(context),
                field: Self::extract_field_from_constraint(&detail),
            };
        }

        match err {
            DbErr::RecordNotFound(msg) => {
                let resource = Self::extract_resource_from_context(context);
                let id = Self::extract_id_from_message(&msg);
                BusinessError::NotFound { resource, id }
            }
            DbErr::Custom(msg) => {
                if msg.starts_with("Validation failed:") {
                    let field = Self::extract_field_from_validation(&msg);
                    let message = msg.replace("Validation failed:", "").trim().to_string();
                    BusinessError::ValidationError { field, message }
                } else if msg.contains("already exists") || msg.contains("duplicate") {
                    let resource = Self::extract_resource_from_context(context);
                    let field = Self::extract_field_from_constraint(&msg);
                    BusinessError::Duplicate { resource, field }
                } else {
                    BusinessError::InternalError { message: msg }
                }
            }
            DbErr::Conn(conn_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: conn_err.to_string(),
            },
            DbErr::Exec(exec_err) => {
                let err_msg = exec_err.to_string();
                if err_msg.contains("UNIQUE constraint") || err_msg.contains("duplicate key") {
                    let resource = Self::extract_resource_from_context(context);
                    let field = Self::extract_field_from_constraint(&err_msg);
                    BusinessError::Duplicate { resource, field }
                } else {
                    BusinessError::DatabaseError { message: err_msg }
                }
            }
            _ => BusinessError::DatabaseError {
                message: err.to_string(),
            },
        }
    }

    fn extract_resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    fn extract_id_from_message(msg: &str) -> String {
        // Patterns like "id 'value'" or "id \"value\""
        for quote in ['\'', '"'] {
            let marker = format!(" id {quote}");
            if let Some(start_pos) = msg.find(&marker) {
                let after_id = &msg[start_pos + marker.len()..];
                if let Some(end_pos) = after_id.find(quote) {
                    return after_id[..end_pos].to_string();
                }
            }
        }

        "unknown".to_string()
    }

    /// "Validation failed: title must not be empty" -> "title"
    fn extract_field_from_validation(msg: &str) -> String {
        msg.split(':')
            .nth(1)
            .and_then(|part| part.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Column named by a unique violation, for SQLite ("failed: table.col")
    /// and PostgreSQL ("Key (col)=...", "<table>_pkey") messages.
    fn extract_field_from_constraint(msg: &str) -> String {
        if let Some((_, rest)) = msg.split_once("failed: ") {
            if let Some(column) = rest
                .split(|c: char| c == ',' || c.is_whitespace())
                .next()
                .and_then(|qualified| qualified.rsplit('.').next())
            {
                if !column.is_empty() {
                    return column.to_string();
                }
            }
        }
        if let Some((_, rest)) = msg.split_once("Key (") {
            if let Some((column, _)) = rest.split_once(')') {
                return column.to_string();
            }
        }
        if msg.contains("_pkey") {
            "id".to_string()
        } else if msg.contains("code") {
            "code".to_string()
        } else {
            "field".to_string()
        }
    }
}

/// Convenience macros for creating business errors
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        $crate::common::errors::BusinessError::ValidationError {
            field: $field.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

#[macro_export]
macro_rules! duplicate_resource {
    ($resource:expr, $field:expr) => {
        $crate::common::errors::BusinessError::Duplicate {
            resource: $resource.to_string(),
            field: $field.to_string(),
        }
    };
}

/// Extension trait to add business error conversion to DbErr
pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
