//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Registration-time declaration problems. Fatal: a route or entity that
/// trips one of these never becomes part of the running application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table '{table}': no primary key field declared")]
    NoPrimaryKey { table: String },
    #[error("table '{table}': duplicate primary key field '{field}'")]
    DuplicatePrimaryKey { table: String, field: String },
    #[error("table '{table}': duplicate field '{field}'")]
    DuplicateField { table: String, field: String },
    #[error("route '{route}': named parameter '{param}' declared after the request parameter")]
    ParamAfterRequest { route: String, param: String },
    #[error("route '{route}': method {method} cannot be routed")]
    UnsupportedMethod { route: String, method: String },
}

/// Handler-raised application error: carries a machine code, an optional data
/// payload, and a human message. Rendered as a structured JSON body rather
/// than a 5xx.
#[derive(Error, Debug, Clone)]
#[error("{error}: {message}")]
pub struct ApiError {
    pub error: String,
    pub data: Option<serde_json::Value>,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            error: error.into(),
            data: None,
            message: message.into(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
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

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Handler-level errors are part of the API contract, not failures.
        if let AppError::Api(api) = self {
            let body = serde_json::json!({
                "error": api.error,
                "data": api.data,
                "message": api.message,
            });
            return (StatusCode::OK, Json(body)).into_response();
        }
        let (status, code) = match &self {
            AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Persistence(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "template_error"),
            AppError::Api(_) => unreachable!("handled above"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
