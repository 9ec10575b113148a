//! Error types for `cadreg-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("parcel not found: {0}")]
  ParcelNotFound(String),

  #[error("identifier {0} is already taken")]
  IdentifierConflict(String),

  #[error("validation failed: {0}")]
  Validation(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of a store error, used at the API boundary to pick
/// an HTTP status. Every [`crate::store::ParcelStore`] error type implements
/// this so handlers stay generic over the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Malformed or out-of-range input; the operation was not attempted.
  Validation,
  /// The lookup/delete/transition target does not exist.
  NotFound,
  /// Identifier assignment raced another writer; the caller should retry.
  Conflict,
  /// Geometry payload shape mismatch during encode or decode.
  Geometry,
  /// Everything else — storage failures, fatal to the current request.
  Storage,
}

/// Implemented by store error types to expose their [`ErrorClass`].
pub trait ClassifyError {
  fn class(&self) -> ErrorClass;
}

impl ClassifyError for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::ParcelNotFound(_) => ErrorClass::NotFound,
      Self::IdentifierConflict(_) => ErrorClass::Conflict,
      Self::Validation(_) => ErrorClass::Validation,
    }
  }
}
