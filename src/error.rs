// src/error.rs
use crate::models::ApiResponse;
use log::error;
use std::convert::Infallible;
use std::fmt::Display;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

/// Errors surfaced to HTTP clients. Internal failures carry only the public
/// message; the underlying cause is logged where it happens.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl Reject for ApiError {}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Logs `cause` and returns a rejection carrying only `public`.
pub fn internal(public: &str, cause: impl Display) -> Rejection {
    error!("{}: {}", public, cause);
    warp::reject::custom(ApiError::Internal(public.to_string()))
}

pub fn bad_request(message: impl Into<String>) -> Rejection {
    warp::reject::custom(ApiError::BadRequest(message.into()))
}

pub fn not_found(message: impl Into<String>) -> Rejection {
    warp::reject::custom(ApiError::NotFound(message.into()))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Malformed row: {0}")]
    Decode(String),
    #[error("Database connection failed: {0}")]
    Connection(String),
    /// A row with the same unique key already exists.
    #[error("Already exists: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(api) = err.find::<ApiError>() {
        (api.status(), api.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        log::debug!("Rejected request body: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid request body".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::error(message)),
        status,
    ))
}
