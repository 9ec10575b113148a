//! The `ParcelStore` trait and supporting batch types.
//!
//! The trait is implemented by storage backends (e.g. `cadreg-store-sqlite`).
//! Higher layers (`cadreg-api`, `cadreg-cli`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;
use std::time::Instant;

use crate::{
  error::ClassifyError,
  filter::Predicate,
  parcel::{CodeDesc, Layer, NewLandParcel, Parcel, PurposeEntry, RefParameters},
};

// ─── Batch types ─────────────────────────────────────────────────────────────

/// Field-name mapping for bulk GeoJSON import: which property key in the
/// incoming file supplies each parcel column.
#[derive(Debug, Clone)]
pub struct FieldMapping {
  pub identifier:     String,
  pub ownership_code: String,
  pub purpose_code:   String,
  pub area:           String,
  pub address:        String,
}

/// Results of one predicate list applied independently to each live layer.
#[derive(Debug, Default)]
pub struct LayerResults {
  pub cadastre: Vec<Parcel>,
  pub archive:  Vec<Parcel>,
}

/// Outcome of an archival transition batch. `missing` identifiers had
/// already vanished from the cadastre — skipped, not an error.
#[derive(Debug, Default)]
pub struct ArchiveReport {
  pub archived: Vec<String>,
  pub missing:  Vec<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a parcel registry backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (tokio with axum).
pub trait ParcelStore: Send + Sync {
  type Error: std::error::Error + ClassifyError + Send + Sync + 'static;

  // ── Queries ───────────────────────────────────────────────────────────

  /// Filtered lookup within one layer, ordered ascending by identifier
  /// (plain lexicographic — structured cadastral numbers sort correctly
  /// because their segment widths are fixed).
  fn search<'a>(
    &'a self,
    layer: Layer,
    predicates: &'a [Predicate],
  ) -> impl Future<Output = Result<Vec<Parcel>, Self::Error>> + Send + 'a;

  /// The same predicates applied independently to Cadastre and Archive.
  /// A filter meaningless to one layer yields no matches there.
  fn search_across_layers<'a>(
    &'a self,
    predicates: &'a [Predicate],
  ) -> impl Future<Output = Result<LayerResults, Self::Error>> + Send + 'a;

  /// Point lookup: probes Cadastre first, then Archive.
  fn find_by_identifier<'a>(
    &'a self,
    identifier: &'a str,
  ) -> impl Future<Output = Result<Option<Parcel>, Self::Error>> + Send + 'a;

  // ── User-drawn parcels ────────────────────────────────────────────────

  /// Persist a user-drawn parcel, assigning the next sequential
  /// identifier (`max + 1`, starting at 1). Identifier assignment is
  /// serialised; a uniqueness race surfaces as a conflict the caller
  /// retries.
  fn create_user_drawn(
    &self,
    input: NewLandParcel,
  ) -> impl Future<Output = Result<Parcel, Self::Error>> + Send + '_;

  /// Delete a user-drawn parcel. A missing identifier is a reportable
  /// not-found outcome, consistent with the rest of the API.
  fn delete_user_drawn<'a>(
    &'a self,
    identifier: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Batch operations ──────────────────────────────────────────────────

  /// Import a batch of raw GeoJSON features into `layer` as one
  /// transaction: any malformed feature, or an elapsed `deadline`,
  /// aborts the whole batch with no partial writes. Returns the number
  /// of inserted rows.
  fn bulk_import<'a>(
    &'a self,
    features: Vec<serde_json::Value>,
    mapping: &'a FieldMapping,
    layer: Layer,
    deadline: Option<Instant>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Lifecycle transition: move the listed parcels from Cadastre to
  /// Archive in one transaction, copying every descriptive field and the
  /// geometry verbatim. Identifiers no longer present are skipped and
  /// reported; any failure rolls the whole batch back, so no parcel ever
  /// exists in both layers after commit.
  fn archive<'a>(
    &'a self,
    identifiers: &'a [String],
  ) -> impl Future<Output = Result<ArchiveReport, Self::Error>> + Send + 'a;

  // ── Reference tables ──────────────────────────────────────────────────

  /// List the ownership and purpose reference tables.
  fn parameters(
    &self,
  ) -> impl Future<Output = Result<RefParameters, Self::Error>> + Send + '_;

  fn upsert_ownership(
    &self,
    entry: CodeDesc,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_category(
    &self,
    entry: CodeDesc,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn upsert_purpose(
    &self,
    entry: PurposeEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
