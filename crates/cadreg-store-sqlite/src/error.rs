//! Error type for `cadreg-store-sqlite`.

use cadreg_core::error::{ClassifyError, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cadreg_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("geometry error: {0}")]
  Geometry(#[from] cadreg_geojson::Error),

  /// A stored column held a value the domain types cannot represent.
  #[error("stored value could not be decoded: {0}")]
  Decode(String),

  /// A bulk import overran its deadline; the whole batch was rolled back.
  #[error("import deadline elapsed after {0} features")]
  DeadlineElapsed(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ClassifyError for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Core(inner) => inner.class(),
      Self::Geometry(_) => ErrorClass::Geometry,
      Self::Database(_) | Self::Decode(_) | Self::DeadlineElapsed(_) => {
        ErrorClass::Storage
      }
    }
  }
}
