//! Typed errors and HTTP mapping.

use crate::report::ReportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: table {table_id} column {column}")]
    InvalidPrimaryKey { table_id: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("unknown column type '{type_name}' for {table_id}.{column}")]
    UnknownColumnType {
        table_id: String,
        column: String,
        type_name: String,
    },
    #[error("unresolved column path '{path}' on table {table_id}")]
    UnresolvedPath { table_id: String, path: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("action not allowed: {0}")]
    ActionDisallowed(String),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl AppError {
    /// Constraint class of a database error, if it is one.
    pub fn constraint_kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Db(e) => e.as_database_error().map(|d| d.kind()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Stable name and message for a constraint violation.
fn conflict_name(kind: ErrorKind) -> Option<(&'static str, &'static str)> {
    match kind {
        ErrorKind::UniqueViolation => Some(("unique", "unique constraint violated")),
        ErrorKind::ForeignKeyViolation => Some(("foreign_key", "foreign key constraint violated")),
        ErrorKind::NotNullViolation => Some(("not_null", "not null constraint violated")),
        ErrorKind::CheckViolation => Some(("check", "check constraint violated")),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let conflict = self.constraint_kind().and_then(conflict_name);
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(_) if conflict.is_some() => (StatusCode::CONFLICT, "conflict"),
            AppError::Db(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::ActionDisallowed(_) => (StatusCode::FORBIDDEN, "action_disallowed"),
            AppError::Report(_) => (StatusCode::INTERNAL_SERVER_ERROR, "report_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let (message, details) = match (&self, conflict) {
            (AppError::Db(e), Some((constraint, message))) => {
                tracing::warn!(error = %e, "constraint violated");
                let detail = e.as_database_error().map(|d| d.message().to_string());
                (
                    message.to_string(),
                    Some(json!({ "constraint": constraint, "detail": detail })),
                )
            }
            _ => (self.to_string(), None),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
