use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::types::ErrorBody;
use crate::db::DbError;
use crate::tmdb::ImportError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No matching {0} was found")]
    NotFound(&'static str),
    #[error("Method {method} is not allowed, only {}", .allowed.join(", "))]
    MethodNotAllowed {
        method: Method,
        allowed: &'static [&'static str],
    },
    #[error("Mandatory field '{0}' is missing")]
    MissingField(&'static str),
    #[error("Value '{value}' is not valid for field '{field}'{}", reason_suffix(.reason))]
    InvalidField {
        field: &'static str,
        value: String,
        reason: Option<&'static str>,
    },
    #[error("Upstream catalog error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

fn reason_suffix(reason: &Option<&'static str>) -> String {
    match reason {
        Some(reason) => format!(" ({})", reason),
        None => String::new(),
    }
}

impl ApiError {
    pub fn invalid(field: &'static str, value: &str) -> Self {
        ApiError::InvalidField {
            field,
            value: value.to_string(),
            reason: None,
        }
    }

    pub fn invalid_because(field: &'static str, value: &str, reason: &'static str) -> Self {
        ApiError::InvalidField {
            field,
            value: value.to_string(),
            reason: Some(reason),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::MissingField(_) | ApiError::InvalidField { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::NotFound(_) => ApiError::NotFound("movie"),
            ImportError::Catalog(e) => ApiError::Upstream(e.to_string()),
            ImportError::Database(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Upstream(ref detail) => {
                error!("Catalog request failed: {}", detail);
                "The movie catalog is unavailable".to_string()
            }
            ApiError::Internal(ref detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            ref other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
