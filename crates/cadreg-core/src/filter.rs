//! Search-filter resolution.
//!
//! Turns raw string query parameters into a closed list of [`Predicate`]s.
//! Predicates are a fixed `{field, operator}` enumeration that the store
//! maps to parameterised SQL — raw input never becomes executable text.
//!
//! The resolver never rejects a whole request for one bad filter: a
//! malformed `area` value is dropped silently and the remaining filters
//! stay in effect. No filters at all means "match every row in the layer".

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// How partial text filters match against stored values. Whether
/// identifier/address filters are "contains" or "prefix" varies per
/// deployment, so it is a configuration option rather than a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
  #[default]
  Contains,
  Prefix,
}

/// The text columns a filter may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
  Identifier,
  OwnershipCode,
  PurposeCode,
  Address,
}

/// Comparison operators accepted as the two-character prefix of an `area`
/// filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaOp {
  Eq,
  Ge,
  Le,
  Ne,
}

impl AreaOp {
  fn from_token(token: &str) -> Option<Self> {
    match token {
      "==" => Some(Self::Eq),
      ">=" => Some(Self::Ge),
      "<=" => Some(Self::Le),
      "!=" => Some(Self::Ne),
      _ => None,
    }
  }

  /// The SQL comparison this operator maps to.
  pub fn sql(self) -> &'static str {
    match self {
      Self::Eq => "=",
      Self::Ge => ">=",
      Self::Le => "<=",
      Self::Ne => "!=",
    }
  }
}

/// One resolved, conjunctive predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  Area {
    op:    AreaOp,
    value: Decimal,
  },
  Text {
    field: TextField,
    value: String,
    mode:  MatchMode,
  },
}

/// Recognised filter keys, in the order predicates are emitted.
const KEYS: [&str; 5] = [
  "cadnum",
  "area",
  "ownership_code",
  "purpose_code",
  "address",
];

/// Resolve raw query parameters into predicates.
///
/// Unrecognised keys and empty values are ignored. `mode` applies to the
/// `cadnum` and `address` filters; code filters always contains-match.
/// Output order follows [`KEYS`] so results are stable for testing.
pub fn resolve(params: &BTreeMap<String, String>, mode: MatchMode) -> Vec<Predicate> {
  let mut predicates = Vec::new();

  for key in KEYS {
    let Some(raw) = params.get(key) else { continue };
    if raw.is_empty() {
      continue;
    }

    match key {
      "area" => {
        if let Some(p) = resolve_area(raw) {
          predicates.push(p);
        }
      }
      "cadnum" => predicates.push(Predicate::Text {
        field: TextField::Identifier,
        value: raw.clone(),
        mode,
      }),
      "ownership_code" => predicates.push(Predicate::Text {
        field: TextField::OwnershipCode,
        value: raw.clone(),
        mode:  MatchMode::Contains,
      }),
      "purpose_code" => predicates.push(Predicate::Text {
        field: TextField::PurposeCode,
        value: raw.clone(),
        mode:  MatchMode::Contains,
      }),
      "address" => predicates.push(Predicate::Text {
        field: TextField::Address,
        value: raw.clone(),
        mode,
      }),
      _ => unreachable!("KEYS is exhaustive"),
    }
  }

  predicates
}

/// Parse an `area` filter value: a two-character comparison token followed
/// by a decimal number accepting both `.` and `,` as the separator.
/// Returns `None` (filter dropped) for an unknown token, an unparseable
/// remainder, or a negative value.
fn resolve_area(raw: &str) -> Option<Predicate> {
  if raw.len() < 2 || !raw.is_char_boundary(2) {
    return None;
  }
  let (token, rest) = raw.split_at(2);
  let op = AreaOp::from_token(token)?;
  let value: Decimal = rest.trim().replace(',', ".").parse().ok()?;
  if value.is_sign_negative() {
    return None;
  }
  Some(Predicate::Area { op, value })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
