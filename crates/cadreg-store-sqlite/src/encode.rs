//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Areas are stored as decimal strings so precision survives the round
//! trip; SQL comparisons cast to REAL. Geometry is stored as EWKB blobs.

use cadreg_core::{
  filter::{MatchMode, Predicate, TextField},
  parcel::{CodeDesc, Layer, Parcel},
};
use rusqlite::ToSql;
use rust_decimal::{Decimal, prelude::ToPrimitive as _};

use crate::{Error, Result};

// ─── Layer ───────────────────────────────────────────────────────────────────

pub fn encode_layer(layer: Layer) -> String {
  layer.to_string()
}

pub fn decode_layer(s: &str) -> Result<Layer> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown layer: {s:?}")))
}

// ─── Area ────────────────────────────────────────────────────────────────────

pub fn encode_area(area: Decimal) -> String {
  area.to_string()
}

pub fn decode_area(s: &str) -> Result<Decimal> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unparseable area: {s:?}")))
}

// ─── Predicates ──────────────────────────────────────────────────────────────

fn text_column(field: TextField) -> &'static str {
  match field {
    TextField::Identifier => "p.identifier",
    TextField::OwnershipCode => "p.ownership_code",
    TextField::PurposeCode => "p.purpose_code",
    TextField::Address => "p.address",
  }
}

/// Map resolved predicates to SQL fragments and their bound parameters.
/// Filter values only ever travel as parameters, never as SQL text.
pub fn predicate_clauses(
  predicates: &[Predicate],
) -> (Vec<String>, Vec<Box<dyn ToSql + Send>>) {
  let mut clauses: Vec<String> = Vec::with_capacity(predicates.len());
  let mut params: Vec<Box<dyn ToSql + Send>> =
    Vec::with_capacity(predicates.len());

  for predicate in predicates {
    match predicate {
      Predicate::Area { op, value } => {
        clauses.push(format!("CAST(p.area AS REAL) {} ?", op.sql()));
        params.push(Box::new(value.to_f64().unwrap_or(0.0)));
      }
      Predicate::Text { field, value, mode } => {
        clauses.push(format!("{} LIKE ?", text_column(*field)));
        params.push(Box::new(like_pattern(value, *mode)));
      }
    }
  }

  (clauses, params)
}

fn like_pattern(value: &str, mode: MatchMode) -> String {
  // ESCAPE is not used; strip the two LIKE metacharacters instead, so
  // filter text always matches as a plain substring.
  let cleaned = value.replace(['%', '_'], "");
  match mode {
    MatchMode::Contains => format!("%{cleaned}%"),
    MatchMode::Prefix => format!("{cleaned}%"),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `parcels` row joined with the three
/// reference tables.
pub struct RawParcel {
  pub id:               i64,
  pub layer:            String,
  pub identifier:       String,
  pub area:             String,
  pub address:          Option<String>,
  pub ownership_code:   Option<String>,
  pub ownership_desc:   Option<String>,
  pub purpose_code:     Option<String>,
  pub purpose_desc:     Option<String>,
  pub category_code:    Option<String>,
  pub category_desc:    Option<String>,
  pub geometry:         Vec<u8>,
}

/// Column list matching [`RawParcel::from_row`]; keep the two in sync.
pub const PARCEL_COLUMNS: &str = "\
  p.id, p.layer, p.identifier, p.area, p.address, \
  p.ownership_code, o.description, \
  p.purpose_code, u.description, \
  p.category_code, c.description, \
  p.geometry";

/// Join clause resolving reference codes to descriptions.
pub const PARCEL_JOINS: &str = "\
  LEFT JOIN ownership_refs o ON o.code = p.ownership_code \
  LEFT JOIN purpose_refs   u ON u.code = p.purpose_code \
  LEFT JOIN category_refs  c ON c.code = p.category_code";

impl RawParcel {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      layer:          row.get(1)?,
      identifier:     row.get(2)?,
      area:           row.get(3)?,
      address:        row.get(4)?,
      ownership_code: row.get(5)?,
      ownership_desc: row.get(6)?,
      purpose_code:   row.get(7)?,
      purpose_desc:   row.get(8)?,
      category_code:  row.get(9)?,
      category_desc:  row.get(10)?,
      geometry:       row.get(11)?,
    })
  }

  pub fn into_parcel(self) -> Result<Parcel> {
    Ok(Parcel {
      id:         self.id,
      layer:      decode_layer(&self.layer)?,
      identifier: self.identifier,
      area:       decode_area(&self.area)?,
      address:    self.address,
      ownership:  code_desc(self.ownership_code, self.ownership_desc),
      purpose:    code_desc(self.purpose_code, self.purpose_desc),
      category:   code_desc(self.category_code, self.category_desc),
      geometry:   cadreg_geojson::wkb::decode_multipolygon(&self.geometry)?,
    })
  }
}

/// A reference row only resolves when both halves are present; a code with
/// no matching reference entry reads back as unresolved.
fn code_desc(code: Option<String>, desc: Option<String>) -> Option<CodeDesc> {
  match (code, desc) {
    (Some(code), Some(desc)) => Some(CodeDesc { code, desc }),
    _ => None,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use cadreg_core::filter::AreaOp;

  use super::*;

  #[test]
  fn layer_round_trips() {
    for layer in [Layer::Cadastre, Layer::Archive, Layer::Land] {
      assert_eq!(decode_layer(&encode_layer(layer)).unwrap(), layer);
    }
    assert!(decode_layer("lunar").is_err());
  }

  #[test]
  fn area_keeps_fractional_digits() {
    let area: Decimal = "1.2340".parse().unwrap();
    assert_eq!(encode_area(area), "1.2340");
    assert_eq!(decode_area("1.2340").unwrap(), area);
  }

  #[test]
  fn area_predicate_becomes_cast_comparison() {
    let (clauses, params) = predicate_clauses(&[Predicate::Area {
      op:    AreaOp::Ge,
      value: "2.5".parse().unwrap(),
    }]);
    assert_eq!(clauses, vec!["CAST(p.area AS REAL) >= ?"]);
    assert_eq!(params.len(), 1);
  }

  #[test]
  fn like_metacharacters_are_stripped() {
    assert_eq!(like_pattern("51%21_68", MatchMode::Contains), "%512168%");
  }

  #[test]
  fn prefix_mode_anchors_the_pattern() {
    assert_eq!(like_pattern("512", MatchMode::Prefix), "512%");
    assert_eq!(like_pattern("512", MatchMode::Contains), "%512%");
  }
}
