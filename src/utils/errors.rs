use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::database::RepoError;
use crate::models::auth::ErrorResponse;

#[derive(Debug, Error, Serialize, ToSchema)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Authentication Error: {0}")]
    AuthenticationError(String),
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) | ServiceError::AuthenticationError(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::InternalError(_) | ServiceError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::InternalError(msg) => {
                log::error!("Internal Error: {}", msg);
                "Something went wrong".to_string()
            }
            ServiceError::DatabaseError(msg) => {
                log::error!("Database Error: {}", msg);
                "Database operation failed".to_string()
            }
            ServiceError::Unauthorized(msg)
            | ServiceError::AuthenticationError(msg)
            | ServiceError::Forbidden(msg) => {
                log::warn!("{}", self);
                msg.clone()
            }
            ServiceError::NotFound(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::ValidationError(msg) => {
                log::info!("{}", self);
                msg.clone()
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse::new(message))
    }
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => ServiceError::NotFound(format!("{what} not found")),
            RepoError::Conflict(msg) => ServiceError::Conflict(msg),
            RepoError::Database(e) => ServiceError::DatabaseError(e.to_string()),
            RepoError::Corrupt(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl From<bcrypt::BcryptError> for ServiceError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ServiceError::InternalError(format!("Password hashing error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServiceError::AuthenticationError(format!("JWT error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {field}"),
                })
            })
            .collect();
        messages.sort();
        ServiceError::ValidationError(messages.join("; "))
    }
}

/// JSON extractor error handler so malformed bodies get the standard error shape.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ServiceError::ValidationError(format!("Invalid request body: {err}")).into()
}

pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ServiceError::ValidationError(format!("Invalid query string: {err}")).into()
}
