//! [`SqliteStore`] — the SQLite implementation of [`ParcelStore`].

use std::path::Path;
use std::time::Instant;

use rusqlite::{OptionalExtension as _, TransactionBehavior, params_from_iter};

use cadreg_core::{
  filter::Predicate,
  parcel::{
    CodeDesc, LAND_OWNERSHIP_SENTINEL, LAND_PURPOSE_SENTINEL, Layer,
    NewLandParcel, Parcel, PurposeEntry, RefParameters,
  },
  store::{ArchiveReport, FieldMapping, LayerResults, ParcelStore},
};
use cadreg_geojson::{feature::geometry_from_value, wkb};
use rust_decimal::Decimal;

use crate::{
  Error, Result,
  encode::{
    PARCEL_COLUMNS, PARCEL_JOINS, RawParcel, encode_area, encode_layer,
    predicate_clauses,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A parcel registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a registry at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory registry — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_layer(
    &self,
    layer: Layer,
    predicates: Vec<Predicate>,
  ) -> Result<Vec<Parcel>> {
    let layer_str = encode_layer(layer);

    let raws: Vec<RawParcel> = self
      .conn
      .call(move |conn| {
        let (clauses, mut params) = predicate_clauses(&predicates);

        let mut where_clause = "p.layer = ?".to_owned();
        for clause in &clauses {
          where_clause.push_str(" AND ");
          where_clause.push_str(clause);
        }

        let sql = format!(
          "SELECT {PARCEL_COLUMNS} FROM parcels p {PARCEL_JOINS}
           WHERE {where_clause}
           ORDER BY p.identifier ASC"
        );

        let mut all_params: Vec<Box<dyn rusqlite::ToSql + Send>> =
          vec![Box::new(layer_str)];
        all_params.append(&mut params);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(all_params.iter()), RawParcel::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParcel::into_parcel).collect()
  }

  async fn find_in_layer(
    &self,
    layer: Layer,
    identifier: String,
  ) -> Result<Option<Parcel>> {
    let layer_str = encode_layer(layer);

    let raw: Option<RawParcel> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PARCEL_COLUMNS} FROM parcels p {PARCEL_JOINS}
           WHERE p.layer = ?1 AND p.identifier = ?2"
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![layer_str, identifier],
              RawParcel::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParcel::into_parcel).transpose()
  }
}

// ─── ParcelStore impl ────────────────────────────────────────────────────────

impl ParcelStore for SqliteStore {
  type Error = Error;

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn search(
    &self,
    layer: Layer,
    predicates: &[Predicate],
  ) -> Result<Vec<Parcel>> {
    self.query_layer(layer, predicates.to_vec()).await
  }

  async fn search_across_layers(
    &self,
    predicates: &[Predicate],
  ) -> Result<LayerResults> {
    let cadastre = self
      .query_layer(Layer::Cadastre, predicates.to_vec())
      .await?;
    let archive = self.query_layer(Layer::Archive, predicates.to_vec()).await?;
    Ok(LayerResults { cadastre, archive })
  }

  async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Parcel>> {
    if let Some(parcel) = self
      .find_in_layer(Layer::Cadastre, identifier.to_owned())
      .await?
    {
      return Ok(Some(parcel));
    }
    self.find_in_layer(Layer::Archive, identifier.to_owned()).await
  }

  // ── User-drawn parcels ────────────────────────────────────────────────────

  async fn create_user_drawn(&self, input: NewLandParcel) -> Result<Parcel> {
    let geometry_blob = wkb::encode_multipolygon(&input.geometry)?;
    let area_str = encode_area(input.area);
    let layer_str = encode_layer(Layer::Land);
    let owner_label = input.owner_label.clone();

    let (id, identifier): (i64, String) = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the max+1 read and
        // the insert cannot interleave with another writer.
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let max: Option<i64> = tx.query_row(
          "SELECT MAX(CAST(identifier AS INTEGER)) FROM parcels WHERE layer = ?1",
          rusqlite::params![layer_str],
          |row| row.get(0),
        )?;
        let identifier = (max.unwrap_or(0) + 1).to_string();

        tx.execute(
          "INSERT INTO parcels (
             layer, identifier, area, address,
             ownership_code, purpose_code, geometry
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            layer_str,
            identifier,
            area_str,
            owner_label,
            LAND_OWNERSHIP_SENTINEL,
            LAND_PURPOSE_SENTINEL,
            geometry_blob,
          ],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((id, identifier))
      })
      .await
      .map_err(map_unique_violation)?;

    Ok(Parcel {
      id,
      layer: Layer::Land,
      identifier,
      area: input.area,
      address: Some(input.owner_label),
      ownership: None,
      purpose: None,
      category: None,
      geometry: input.geometry,
    })
  }

  async fn delete_user_drawn(&self, identifier: &str) -> Result<()> {
    let layer_str = encode_layer(Layer::Land);
    let identifier = identifier.to_owned();
    let identifier_for_err = identifier.clone();

    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM parcels WHERE layer = ?1 AND identifier = ?2",
          rusqlite::params![layer_str, identifier],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::Core(cadreg_core::Error::ParcelNotFound(
        identifier_for_err,
      )));
    }
    Ok(())
  }

  // ── Batch operations ──────────────────────────────────────────────────────

  async fn bulk_import(
    &self,
    features: Vec<serde_json::Value>,
    mapping: &FieldMapping,
    layer: Layer,
    deadline: Option<Instant>,
  ) -> Result<usize> {
    // Parse and encode everything up front; a bad feature fails the batch
    // before a single row is written.
    let mut rows = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
      if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(Error::DeadlineElapsed(index));
      }
      rows.push(feature_row(feature, mapping, index)?);
    }

    let layer_str = encode_layer(layer);
    let count = rows.len();

    // The cutoff also applies while inserting: bailing out before commit
    // drops the transaction, which rolls everything back.
    let elapsed_at: Option<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO parcels (
               layer, identifier, area, address,
               ownership_code, purpose_code, geometry
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for (index, row) in rows.into_iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
              return Ok(Some(index));
            }
            stmt.execute(rusqlite::params![
              layer_str,
              row.identifier,
              row.area,
              row.address,
              row.ownership_code,
              row.purpose_code,
              row.geometry,
            ])?;
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(index) = elapsed_at {
      return Err(Error::DeadlineElapsed(index));
    }

    Ok(count)
  }

  async fn archive(&self, identifiers: &[String]) -> Result<ArchiveReport> {
    let cadastre_str = encode_layer(Layer::Cadastre);
    let archive_str = encode_layer(Layer::Archive);
    let identifiers = identifiers.to_vec();

    let report: ArchiveReport = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut report = ArchiveReport::default();
        {
          // The layer flip carries every column along untouched.
          let mut stmt = tx.prepare(
            "UPDATE parcels SET layer = ?1
             WHERE layer = ?2 AND identifier = ?3",
          )?;
          for identifier in identifiers {
            let moved = stmt.execute(rusqlite::params![
              archive_str,
              cadastre_str,
              identifier
            ])?;
            if moved == 1 {
              report.archived.push(identifier);
            } else {
              report.missing.push(identifier);
            }
          }
        }
        tx.commit()?;
        Ok(report)
      })
      .await?;

    Ok(report)
  }

  // ── Reference tables ──────────────────────────────────────────────────────

  async fn parameters(&self) -> Result<RefParameters> {
    self
      .conn
      .call(|conn| {
        let ownership = conn
          .prepare(
            "SELECT code, description FROM ownership_refs ORDER BY code",
          )?
          .query_map([], |row| {
            Ok(CodeDesc { code: row.get(0)?, desc: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let purpose = conn
          .prepare(
            "SELECT code, description, category_code
             FROM purpose_refs ORDER BY code",
          )?
          .query_map([], |row| {
            Ok(PurposeEntry {
              code:          row.get(0)?,
              desc:          row.get(1)?,
              category_code: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(RefParameters { ownership, purpose })
      })
      .await
      .map_err(Error::from)
  }

  async fn upsert_ownership(&self, entry: CodeDesc) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ownership_refs (code, description) VALUES (?1, ?2)
           ON CONFLICT(code) DO UPDATE SET description = excluded.description",
          rusqlite::params![entry.code, entry.desc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_category(&self, entry: CodeDesc) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO category_refs (code, description) VALUES (?1, ?2)
           ON CONFLICT(code) DO UPDATE SET description = excluded.description",
          rusqlite::params![entry.code, entry.desc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_purpose(&self, entry: PurposeEntry) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO purpose_refs (code, description, category_code)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(code) DO UPDATE SET
             description   = excluded.description,
             category_code = excluded.category_code",
          rusqlite::params![entry.code, entry.desc, entry.category_code],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// One pre-encoded `parcels` row awaiting insertion.
struct ImportRow {
  identifier:     String,
  area:           String,
  address:        Option<String>,
  ownership_code: Option<String>,
  purpose_code:   Option<String>,
  geometry:       Vec<u8>,
}

/// Pull the mapped columns out of one raw GeoJSON feature.
fn feature_row(
  feature: &serde_json::Value,
  mapping: &FieldMapping,
  index: usize,
) -> Result<ImportRow> {
  let properties = feature
    .get("properties")
    .and_then(serde_json::Value::as_object)
    .ok_or_else(|| {
      validation(format!("feature {index} has no properties object"))
    })?;

  let identifier = property_string(properties, &mapping.identifier)
    .ok_or_else(|| {
      validation(format!(
        "feature {index} is missing identifier property {:?}",
        mapping.identifier
      ))
    })?;

  let area_raw = properties.get(&mapping.area).ok_or_else(|| {
    validation(format!(
      "feature {index} is missing area property {:?}",
      mapping.area
    ))
  })?;
  let area = property_area(area_raw).ok_or_else(|| {
    validation(format!("feature {index} has unparseable area: {area_raw}"))
  })?;

  let geometry_value = feature.get("geometry").ok_or_else(|| {
    validation(format!("feature {index} has no geometry member"))
  })?;
  let geometry = wkb::encode_multipolygon(&geometry_from_value(geometry_value)?)?;

  Ok(ImportRow {
    identifier,
    area: encode_area(area),
    address: property_string(properties, &mapping.address),
    ownership_code: property_string(properties, &mapping.ownership_code),
    purpose_code: property_string(properties, &mapping.purpose_code),
    geometry,
  })
}

fn property_string(
  properties: &serde_json::Map<String, serde_json::Value>,
  key: &str,
) -> Option<String> {
  match properties.get(key)? {
    serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
    serde_json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Areas arrive as JSON numbers or as strings with either decimal separator.
fn property_area(value: &serde_json::Value) -> Option<Decimal> {
  match value {
    serde_json::Value::Number(n) => n.to_string().parse().ok(),
    serde_json::Value::String(s) => s.trim().replace(',', ".").parse().ok(),
    _ => None,
  }
}

fn validation(message: String) -> Error {
  Error::Core(cadreg_core::Error::Validation(message))
}

/// Rewrite a UNIQUE-constraint failure on identifier assignment as a
/// conflict the caller can retry.
fn map_unique_violation(err: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
    failure,
    _,
  )) = &err
    && failure.code == rusqlite::ErrorCode::ConstraintViolation
  {
    return Error::Core(cadreg_core::Error::IdentifierConflict(
      "land identifier assignment raced another writer".to_owned(),
    ));
  }
  Error::Database(err)
}
