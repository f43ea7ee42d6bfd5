//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use leadform_core::ValidationError;
use serde_json::json;
use thiserror::Error;

/// Shown to respondents when their submission could not be stored.
pub const SUBMISSION_FAILED: &str = "submission failed, please try again";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Invalid(ValidationError),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// Persistence failed on the public submit path. The cause is logged, not
  /// returned.
  #[error("submission failed, please try again")]
  SubmissionFailed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<leadform_core::Error> for ApiError {
  fn from(e: leadform_core::Error) -> Self {
    use leadform_core::Error as E;
    match e {
      E::TenantNotFound(_) | E::SubmissionNotFound(_) | E::BlockNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      E::FormDisabled(_) => ApiError::Forbidden(e.to_string()),
      E::Validation(v) => ApiError::Invalid(v),
      E::MalformedTicket(_) => ApiError::BadRequest(e.to_string()),
      E::Serialization(_) => ApiError::Store(Box::new(e)),
    }
  }
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self { ApiError::Invalid(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Invalid(v) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": v.to_string(), "issues": v.issues }),
      ),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::SubmissionFailed => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": SUBMISSION_FAILED }),
      ),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": e.to_string() }),
      ),
    };
    (status, Json(body)).into_response()
  }
}
