//! Error type for `cadreg-geojson`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Payload shape mismatch: wrong nesting depth, non-numeric coordinate,
  /// missing member. No partial geometry is ever produced.
  #[error("malformed geometry payload: {0}")]
  Format(String),

  #[error("unsupported geometry type: {0:?}")]
  UnsupportedType(String),

  #[error("spatial reference mismatch: expected {expected}, got {got}")]
  SridMismatch { expected: u32, got: u32 },

  #[error("geometry blob truncated at byte {0}")]
  Truncated(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
