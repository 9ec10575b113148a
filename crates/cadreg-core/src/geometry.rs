//! Plain geometry value types shared across the workspace.
//!
//! Coordinates are longitude/latitude degrees; the spatial reference is
//! fixed at import time ([`SRID`] 4326). Rings are carried exactly as
//! supplied: nothing at this layer closes, deduplicates, or re-winds them.

/// The spatial reference identifier of every stored geometry.
pub const SRID: u32 = 4326;

/// A single linear ring: an ordered sequence of `[x, y]` positions.
/// A closed ring repeats its first position as its last, exactly as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(pub Vec<[f64; 2]>);

/// One polygon: exactly one exterior ring and zero or more interior holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
  pub exterior:  Ring,
  pub interiors: Vec<Ring>,
}

impl Polygon {
  /// All rings in storage order: exterior first, then interiors.
  pub fn rings(&self) -> impl Iterator<Item = &Ring> {
    std::iter::once(&self.exterior).chain(self.interiors.iter())
  }

  pub fn ring_count(&self) -> usize {
    1 + self.interiors.len()
  }
}

/// One or more polygons. The only geometry a parcel may carry.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// A survey-marker point, same spatial reference as parcels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}
