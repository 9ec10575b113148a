//! GeoJSON feature assembly and geometry parsing.
//!
//! Outbound: a [`Parcel`] becomes a GeoJSON `Feature` whose properties
//! carry the resolved reference labels. Inbound: a GeoJSON geometry value
//! becomes a [`MultiPolygon`], rejecting anything structurally off.

use cadreg_core::{
  geometry::{MultiPolygon, Polygon, Ring},
  parcel::Parcel,
};
use rust_decimal::prelude::ToPrimitive as _;
use serde_json::{Value, json};

use crate::{Error, Result};

// ─── Outbound ────────────────────────────────────────────────────────────────

/// Render a parcel as a GeoJSON `Feature`.
///
/// `id`, `area`, and `address` are always present (`address` may be
/// null). Reference labels appear only when the parcel resolved them:
/// ownership as `"<code> <desc> власність"`, purpose and category as
/// `"<code> <desc>"`. Cadastre and Archive parcels additionally expose
/// their cadastral number under `cadnum`.
pub fn parcel_feature(parcel: &Parcel) -> Value {
  let mut properties = serde_json::Map::new();
  properties.insert("id".into(), json!(parcel.id));
  properties
    .insert("area".into(), json!(parcel.area.to_f64().unwrap_or(0.0)));
  properties.insert("address".into(), json!(parcel.address));

  if uses_cadnum(parcel) {
    properties.insert("cadnum".into(), json!(parcel.identifier));
  }
  if let Some(ownership) = &parcel.ownership {
    properties.insert(
      "ownership".into(),
      json!(format!("{} {} власність", ownership.code, ownership.desc)),
    );
  }
  if let Some(purpose) = &parcel.purpose {
    properties.insert(
      "purpose".into(),
      json!(format!("{} {}", purpose.code, purpose.desc)),
    );
  }
  if let Some(category) = &parcel.category {
    properties.insert(
      "category".into(),
      json!(format!("{} {}", category.code, category.desc)),
    );
  }

  json!({
    "type":       "Feature",
    "geometry":   geometry_value(&parcel.geometry),
    "properties": Value::Object(properties),
  })
}

fn uses_cadnum(parcel: &Parcel) -> bool {
  matches!(
    parcel.layer,
    cadreg_core::parcel::Layer::Cadastre | cadreg_core::parcel::Layer::Archive
  )
}

/// The bare GeoJSON geometry object for a multipolygon.
pub fn geometry_value(geometry: &MultiPolygon) -> Value {
  let coordinates: Vec<Value> = geometry
    .0
    .iter()
    .map(|polygon| {
      let rings: Vec<Value> = polygon
        .rings()
        .map(|ring| {
          let positions: Vec<Value> =
            ring.0.iter().map(|&[x, y]| json!([x, y])).collect();
          Value::Array(positions)
        })
        .collect();
      Value::Array(rings)
    })
    .collect();

  json!({
    "type":        "MultiPolygon",
    "coordinates": coordinates,
  })
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

/// Parse a GeoJSON geometry object into a [`MultiPolygon`].
///
/// The `type` member is matched case-insensitively; the coordinate array
/// must nest polygons > rings > positions exactly, every position being
/// two finite numbers. Each polygon needs at least one ring. Any
/// deviation fails the whole parse.
pub fn geometry_from_value(value: &Value) -> Result<MultiPolygon> {
  let object = value
    .as_object()
    .ok_or_else(|| Error::Format("geometry is not an object".to_owned()))?;

  let type_name = object
    .get("type")
    .and_then(Value::as_str)
    .ok_or_else(|| Error::Format("geometry has no type member".to_owned()))?;
  if !type_name.eq_ignore_ascii_case("multipolygon") {
    return Err(Error::UnsupportedType(type_name.to_owned()));
  }

  let coordinates = object
    .get("coordinates")
    .and_then(Value::as_array)
    .ok_or_else(|| Error::Format("coordinates is not an array".to_owned()))?;

  let polygons = coordinates
    .iter()
    .map(polygon_from_value)
    .collect::<Result<Vec<_>>>()?;
  Ok(MultiPolygon(polygons))
}

fn polygon_from_value(value: &Value) -> Result<Polygon> {
  let rings = value
    .as_array()
    .ok_or_else(|| Error::Format("polygon is not an array of rings".to_owned()))?;

  let mut rings = rings.iter().map(ring_from_value);
  let exterior = rings
    .next()
    .ok_or_else(|| Error::Format("polygon has no rings".to_owned()))??;
  let interiors = rings.collect::<Result<Vec<_>>>()?;
  Ok(Polygon { exterior, interiors })
}

fn ring_from_value(value: &Value) -> Result<Ring> {
  let positions = value
    .as_array()
    .ok_or_else(|| Error::Format("ring is not an array of positions".to_owned()))?;

  let points = positions
    .iter()
    .map(position_from_value)
    .collect::<Result<Vec<_>>>()?;
  Ok(Ring(points))
}

fn position_from_value(value: &Value) -> Result<[f64; 2]> {
  let pair = value
    .as_array()
    .filter(|pair| pair.len() == 2)
    .ok_or_else(|| {
      Error::Format("position is not a two-element array".to_owned())
    })?;

  let x = finite_number(&pair[0])?;
  let y = finite_number(&pair[1])?;
  Ok([x, y])
}

fn finite_number(value: &Value) -> Result<f64> {
  value
    .as_f64()
    .filter(|n| n.is_finite())
    .ok_or_else(|| Error::Format(format!("non-numeric coordinate: {value}")))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
