//! Parcel and reference-entity types.
//!
//! The three layers share one record shape; what differs is the lifecycle
//! table a record lives in and which reference fields are populated.
//! Cadastre and Archive rows carry ownership and purpose references;
//! user-drawn Land rows carry sentinel codes and an optional category.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive as _;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, geometry::MultiPolygon};

// ─── Layers ──────────────────────────────────────────────────────────────────

/// The lifecycle table a parcel record lives in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Layer {
  /// The current cadastre.
  Cadastre,
  /// Retired records, populated only by archival transitions.
  Archive,
  /// Ad hoc user-drawn polygons.
  Land,
}

// ─── Reference entities ──────────────────────────────────────────────────────

/// A reference-table entry: unique code plus human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDesc {
  pub code: String,
  pub desc: String,
}

/// A purpose entry; optionally tied to a land category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeEntry {
  pub code:          String,
  pub desc:          String,
  pub category_code: Option<String>,
}

/// Reference-table listings served by the parameters endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefParameters {
  pub ownership: Vec<CodeDesc>,
  pub purpose:   Vec<PurposeEntry>,
}

// ─── Parcel ──────────────────────────────────────────────────────────────────

/// A land unit: a multipolygon with descriptive attributes.
///
/// `identifier` is the cadastral number ("cadnum") for Cadastre/Archive
/// records and a locally assigned sequential integer-as-string for Land.
/// Reference fields are resolved to code+description pairs on read; a
/// field the layer does not model is `None`, never an error.
#[derive(Debug, Clone)]
pub struct Parcel {
  pub id:         i64,
  pub layer:      Layer,
  pub identifier: String,
  /// Non-negative, with at least four fractional digits preserved.
  pub area:       Decimal,
  pub address:    Option<String>,
  pub ownership:  Option<CodeDesc>,
  pub purpose:    Option<CodeDesc>,
  pub category:   Option<CodeDesc>,
  pub geometry:   MultiPolygon,
}

// ─── User-drawn input ────────────────────────────────────────────────────────

/// Sentinel ownership code recorded on user-drawn rows.
pub const LAND_OWNERSHIP_SENTINEL: &str = "0";
/// Sentinel purpose code recorded on user-drawn rows.
pub const LAND_PURPOSE_SENTINEL: &str = "00.00";

/// Validated input to [`crate::store::ParcelStore::create_user_drawn`].
/// The identifier is always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLandParcel {
  pub area:        Decimal,
  pub geometry:    MultiPolygon,
  /// Recorded as the parcel address, e.g. the drawing user's email.
  pub owner_label: String,
}

impl NewLandParcel {
  /// Validates the raw request values. The area must be a finite
  /// non-negative number and the geometry must contain at least one
  /// polygon — a parcel record cannot exist without a geometry.
  pub fn new(
    area: f64,
    geometry: MultiPolygon,
    owner_label: impl Into<String>,
  ) -> Result<Self> {
    if !area.is_finite() {
      return Err(Error::Validation(format!(
        "area is not a finite number: {area}"
      )));
    }
    if area < 0.0 {
      return Err(Error::Validation(format!(
        "area must be non-negative, got {area}"
      )));
    }
    let area = Decimal::from_f64(area)
      .ok_or_else(|| Error::Validation(format!("area {area} is not representable")))?;
    if geometry.is_empty() {
      return Err(Error::Validation("geometry has no polygons".to_owned()));
    }
    Ok(Self {
      area,
      geometry,
      owner_label: owner_label.into(),
    })
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::{Polygon, Ring};

  fn square() -> MultiPolygon {
    MultiPolygon(vec![Polygon {
      exterior:  Ring(vec![
        [30.0, 46.0],
        [30.1, 46.0],
        [30.1, 46.1],
        [30.0, 46.0],
      ]),
      interiors: vec![],
    }])
  }

  #[test]
  fn layer_round_trips_through_strings() {
    for layer in [Layer::Cadastre, Layer::Archive, Layer::Land] {
      let parsed: Layer = layer.to_string().parse().unwrap();
      assert_eq!(parsed, layer);
    }
    assert_eq!(Layer::Cadastre.to_string(), "cadastre");
  }

  #[test]
  fn new_land_parcel_accepts_zero_area() {
    let parcel = NewLandParcel::new(0.0, square(), "user@example.com").unwrap();
    assert_eq!(parcel.area, Decimal::ZERO);
  }

  #[test]
  fn new_land_parcel_rejects_negative_area() {
    let err = NewLandParcel::new(-1.5, square(), "user@example.com").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn new_land_parcel_rejects_nan_area() {
    let err = NewLandParcel::new(f64::NAN, square(), "u").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn new_land_parcel_rejects_empty_geometry() {
    let err = NewLandParcel::new(1.0, MultiPolygon(vec![]), "u").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
