//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cadreg_core::error::{ClassifyError, ErrorClass};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error onto an HTTP-facing variant via its
  /// [`ErrorClass`], keeping handlers generic over the store type.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + ClassifyError + Send + Sync + 'static,
  {
    match err.class() {
      ErrorClass::Validation | ErrorClass::Geometry => {
        Self::BadRequest(err.to_string())
      }
      ErrorClass::NotFound => Self::NotFound(err.to_string()),
      ErrorClass::Conflict => Self::Conflict(err.to_string()),
      ErrorClass::Storage => Self::Store(Box::new(err)),
    }
  }
}

impl From<cadreg_geojson::Error> for ApiError {
  fn from(err: cadreg_geojson::Error) -> Self {
    Self::BadRequest(err.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %message, "request failed");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
