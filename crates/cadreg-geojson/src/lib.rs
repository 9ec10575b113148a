//! Geometry exchange codec for the parcel registry.
//!
//! Converts between the stored binary geometry (SRID-tagged EWKB), the
//! domain geometry types in `cadreg-core`, and the GeoJSON wire shape.
//! Pure transformations both ways — no partial recovery, no store access.

pub mod error;
pub mod feature;
pub mod wkb;

pub use error::{Error, Result};
