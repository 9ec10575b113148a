//! EWKB encoding of parcel geometry.
//!
//! The stored form is WKB with the EWKB SRID flag on the outer geometry,
//! the layout PostGIS emits for geometry columns. Encoding always writes
//! little-endian; decoding honours the per-geometry byte-order marker.
//! Only the two types the registry persists are supported: MultiPolygon
//! (parcels) and Point (survey markers).
//!
//! Ring contents pass through untouched — closure and winding are the
//! producer's responsibility, exactly as stored.

use cadreg_core::geometry::{MultiPolygon, Point, Polygon, Ring, SRID};

use crate::{Error, Result};

const SRID_FLAG: u32 = 0x2000_0000;
const TYPE_POINT: u32 = 1;
const TYPE_POLYGON: u32 = 3;
const TYPE_MULTIPOLYGON: u32 = 6;

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Encode a multipolygon as SRID-tagged EWKB, ready for storage.
/// A non-finite coordinate is a format error; nothing is written for it.
pub fn encode_multipolygon(geometry: &MultiPolygon) -> Result<Vec<u8>> {
  let mut out = Vec::with_capacity(64);
  out.push(1); // little-endian
  put_u32(&mut out, TYPE_MULTIPOLYGON | SRID_FLAG);
  put_u32(&mut out, SRID);
  put_u32(&mut out, u32::try_from(geometry.0.len()).map_err(len_overflow)?);

  for polygon in &geometry.0 {
    out.push(1);
    put_u32(&mut out, TYPE_POLYGON);
    put_u32(
      &mut out,
      u32::try_from(polygon.ring_count()).map_err(len_overflow)?,
    );
    for ring in polygon.rings() {
      put_u32(&mut out, u32::try_from(ring.0.len()).map_err(len_overflow)?);
      for &[x, y] in &ring.0 {
        put_coord(&mut out, x)?;
        put_coord(&mut out, y)?;
      }
    }
  }

  Ok(out)
}

/// Encode a survey-marker point as SRID-tagged EWKB.
pub fn encode_point(point: &Point) -> Result<Vec<u8>> {
  let mut out = Vec::with_capacity(25);
  out.push(1);
  put_u32(&mut out, TYPE_POINT | SRID_FLAG);
  put_u32(&mut out, SRID);
  put_coord(&mut out, point.x)?;
  put_coord(&mut out, point.y)?;
  Ok(out)
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
  out.extend_from_slice(&v.to_le_bytes());
}

fn put_coord(out: &mut Vec<u8>, v: f64) -> Result<()> {
  if !v.is_finite() {
    return Err(Error::Format(format!("non-finite coordinate: {v}")));
  }
  out.extend_from_slice(&v.to_le_bytes());
  Ok(())
}

fn len_overflow(_: std::num::TryFromIntError) -> Error {
  Error::Format("geometry element count exceeds u32".to_owned())
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode a stored EWKB multipolygon. The SRID must be 4326; anything
/// else was written by a foreign pipeline and is rejected outright.
pub fn decode_multipolygon(bytes: &[u8]) -> Result<MultiPolygon> {
  let mut reader = Reader::new(bytes);
  let (type_code, srid) = reader.header()?;
  check_type(type_code, TYPE_MULTIPOLYGON)?;
  check_srid(srid)?;

  let polygon_count = reader.u32()?;
  let mut polygons = Vec::with_capacity(polygon_count as usize);
  for _ in 0..polygon_count {
    // Nested polygons carry their own byte-order marker and bare type.
    let (inner_type, inner_srid) = reader.header()?;
    check_type(inner_type, TYPE_POLYGON)?;
    if let Some(srid) = inner_srid {
      check_srid(Some(srid))?;
    }
    polygons.push(reader.polygon()?);
  }

  reader.finish()?;
  Ok(MultiPolygon(polygons))
}

/// Decode a stored EWKB point.
pub fn decode_point(bytes: &[u8]) -> Result<Point> {
  let mut reader = Reader::new(bytes);
  let (type_code, srid) = reader.header()?;
  check_type(type_code, TYPE_POINT)?;
  check_srid(srid)?;
  let x = reader.f64()?;
  let y = reader.f64()?;
  reader.finish()?;
  Ok(Point { x, y })
}

fn check_type(got: u32, expected: u32) -> Result<()> {
  if got == expected {
    Ok(())
  } else {
    Err(Error::UnsupportedType(format!("wkb type {got}")))
  }
}

fn check_srid(srid: Option<u32>) -> Result<()> {
  match srid {
    None | Some(SRID) => Ok(()),
    Some(got) => Err(Error::SridMismatch { expected: SRID, got }),
  }
}

/// Cursor over a WKB buffer. The byte-order marker of the most recently
/// read geometry header governs integer and float decoding.
struct Reader<'a> {
  buf:           &'a [u8],
  pos:           usize,
  little_endian: bool,
}

impl<'a> Reader<'a> {
  fn new(buf: &'a [u8]) -> Self {
    Self { buf, pos: 0, little_endian: true }
  }

  fn take(&mut self, n: usize) -> Result<&'a [u8]> {
    let end = self
      .pos
      .checked_add(n)
      .filter(|&end| end <= self.buf.len())
      .ok_or(Error::Truncated(self.pos))?;
    let slice = &self.buf[self.pos..end];
    self.pos = end;
    Ok(slice)
  }

  fn u8(&mut self) -> Result<u8> {
    Ok(self.take(1)?[0])
  }

  fn u32(&mut self) -> Result<u32> {
    let raw: [u8; 4] = self.take(4)?.try_into().map_err(|_| Error::Truncated(self.pos))?;
    Ok(if self.little_endian {
      u32::from_le_bytes(raw)
    } else {
      u32::from_be_bytes(raw)
    })
  }

  fn f64(&mut self) -> Result<f64> {
    let raw: [u8; 8] = self.take(8)?.try_into().map_err(|_| Error::Truncated(self.pos))?;
    Ok(if self.little_endian {
      f64::from_le_bytes(raw)
    } else {
      f64::from_be_bytes(raw)
    })
  }

  /// Read a geometry header: byte-order marker, type word, and the SRID
  /// when the EWKB flag is set. Returns `(bare_type, srid)`.
  fn header(&mut self) -> Result<(u32, Option<u32>)> {
    match self.u8()? {
      0 => self.little_endian = false,
      1 => self.little_endian = true,
      other => {
        return Err(Error::Format(format!("invalid byte-order marker {other}")));
      }
    }
    let type_word = self.u32()?;
    let srid = if type_word & SRID_FLAG != 0 {
      Some(self.u32()?)
    } else {
      None
    };
    Ok((type_word & !SRID_FLAG, srid))
  }

  /// Read the ring block of a polygon whose header has been consumed.
  fn polygon(&mut self) -> Result<Polygon> {
    let ring_count = self.u32()?;
    if ring_count == 0 {
      return Err(Error::Format("polygon with no rings".to_owned()));
    }
    let mut rings = Vec::with_capacity(ring_count as usize);
    for _ in 0..ring_count {
      let point_count = self.u32()?;
      let mut points = Vec::with_capacity(point_count as usize);
      for _ in 0..point_count {
        let x = self.f64()?;
        let y = self.f64()?;
        points.push([x, y]);
      }
      rings.push(Ring(points));
    }
    let mut rings = rings.into_iter();
    let exterior = rings
      .next()
      .ok_or_else(|| Error::Format("polygon with no rings".to_owned()))?;
    Ok(Polygon { exterior, interiors: rings.collect() })
  }

  /// Fail if decodable bytes remain — a trailing tail means the blob was
  /// not produced by this codec.
  fn finish(&self) -> Result<()> {
    if self.pos == self.buf.len() {
      Ok(())
    } else {
      Err(Error::Format(format!(
        "{} trailing bytes after geometry",
        self.buf.len() - self.pos
      )))
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
