//! `cadreg` — batch tooling for the parcel registry.
//!
//! # Usage
//!
//! ```
//! cadreg --store registry.db import parcels.geojson --layer cadastre
//! cadreg --store registry.db export 5121680800 -o local.txt
//! cadreg reconcile external.txt local.txt --out-dir work/
//! cadreg --store registry.db archive work/toremove.txt
//! cadreg --store registry.db seed-ref references.json
//! ```

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  time::{Duration, Instant},
};

use anyhow::{Context as _, Result, bail};
use cadreg_core::{
  filter::{MatchMode, Predicate, TextField},
  parcel::{CodeDesc, Layer, PurposeEntry},
  reconcile::reconcile,
  store::{FieldMapping, ParcelStore},
};
use cadreg_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cadreg", about = "Batch tooling for the parcel registry")]
struct Cli {
  /// Path to the SQLite registry file.
  #[arg(short, long, env = "CADREG_STORE", default_value = "cadreg.db")]
  store: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Import a GeoJSON file into one layer as a single transaction.
  Import {
    /// GeoJSON file: a FeatureCollection or a bare feature array.
    file: PathBuf,

    /// Target layer.
    #[arg(long, default_value = "cadastre")]
    layer: Layer,

    /// Property key holding the cadastral number.
    #[arg(long, default_value = "cadnum")]
    identifier_key: String,

    /// Property key holding the ownership code.
    #[arg(long, default_value = "ownership")]
    ownership_key: String,

    /// Property key holding the purpose code.
    #[arg(long, default_value = "purpose")]
    purpose_key: String,

    /// Property key holding the area in hectares.
    #[arg(long, default_value = "area")]
    area_key: String,

    /// Property key holding the address.
    #[arg(long, default_value = "address")]
    address_key: String,

    /// Abort the import if it runs longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
  },

  /// Write the identifiers of one layer matching a prefix, one per line.
  Export {
    /// Identifier prefix, e.g. a settlement KOATUU code.
    prefix: String,

    /// Layer to export from.
    #[arg(long, default_value = "cadastre")]
    layer: Layer,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Diff an external identifier list against a locally exported one.
  Reconcile {
    /// Newline-delimited identifiers from the external registry.
    external: PathBuf,

    /// Newline-delimited identifiers held locally.
    local: PathBuf,

    /// Directory receiving `toadd.txt` and `toremove.txt`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Move the listed parcels from the cadastre to the archive.
  Archive {
    /// Newline-delimited identifiers to transition.
    file: PathBuf,
  },

  /// Load reference tables (ownership, category, purpose) from a JSON file.
  SeedRef {
    file: PathBuf,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let store = SqliteStore::open(&cli.store)
    .await
    .with_context(|| format!("failed to open registry at {:?}", cli.store))?;

  match cli.command {
    Command::Import {
      file,
      layer,
      identifier_key,
      ownership_key,
      purpose_key,
      area_key,
      address_key,
      timeout_secs,
    } => {
      let mapping = FieldMapping {
        identifier:     identifier_key,
        ownership_code: ownership_key,
        purpose_code:   purpose_key,
        area:           area_key,
        address:        address_key,
      };
      import(&store, &file, &mapping, layer, timeout_secs).await
    }
    Command::Export { prefix, layer, output } => {
      export(&store, &prefix, layer, output.as_deref()).await
    }
    Command::Reconcile { external, local, out_dir } => {
      run_reconcile(&external, &local, &out_dir)
    }
    Command::Archive { file } => run_archive(&store, &file).await,
    Command::SeedRef { file } => seed_ref(&store, &file).await,
  }
}

// ─── Subcommands ─────────────────────────────────────────────────────────────

async fn import(
  store: &SqliteStore,
  file: &Path,
  mapping: &FieldMapping,
  layer: Layer,
  timeout_secs: Option<u64>,
) -> Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let value: serde_json::Value =
    serde_json::from_str(&raw).context("parsing GeoJSON")?;
  let features = features_from_value(value)?;

  let deadline =
    timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

  let count = store
    .bulk_import(features, mapping, layer, deadline)
    .await
    .context("import failed, no rows were written")?;

  tracing::info!(count, layer = %layer, "import complete");
  Ok(())
}

async fn export(
  store: &SqliteStore,
  prefix: &str,
  layer: Layer,
  output: Option<&Path>,
) -> Result<()> {
  let predicates = [Predicate::Text {
    field: TextField::Identifier,
    value: prefix.to_owned(),
    mode:  MatchMode::Prefix,
  }];
  let parcels = store.search(layer, &predicates).await?;

  let mut lines = String::new();
  for parcel in &parcels {
    lines.push_str(&parcel.identifier);
    lines.push('\n');
  }

  match output {
    Some(path) => {
      std::fs::write(path, lines)
        .with_context(|| format!("writing {}", path.display()))?;
      tracing::info!(count = parcels.len(), path = %path.display(), "exported");
    }
    None => print!("{lines}"),
  }
  Ok(())
}

fn run_reconcile(external: &Path, local: &Path, out_dir: &Path) -> Result<()> {
  let external_ids = read_identifiers(external)?;
  let local_ids = read_identifiers(local)?;

  let outcome = reconcile(&external_ids, &local_ids);
  if outcome.is_settled() {
    tracing::info!("registries agree, nothing to do");
  }

  write_identifiers(&out_dir.join("toadd.txt"), &outcome.to_add)?;
  write_identifiers(&out_dir.join("toremove.txt"), &outcome.to_remove)?;

  tracing::info!(
    to_add = outcome.to_add.len(),
    to_remove = outcome.to_remove.len(),
    "reconciliation written"
  );
  Ok(())
}

async fn run_archive(store: &SqliteStore, file: &Path) -> Result<()> {
  let identifiers: Vec<String> =
    read_identifiers(file)?.into_iter().collect();
  if identifiers.is_empty() {
    bail!("{} contains no identifiers", file.display());
  }

  let report = store.archive(&identifiers).await?;
  for identifier in &report.missing {
    tracing::warn!(%identifier, "not in the cadastre, skipped");
  }
  tracing::info!(
    archived = report.archived.len(),
    missing = report.missing.len(),
    "archival transition complete"
  );
  Ok(())
}

/// Shape of the reference-seeding JSON file.
#[derive(Deserialize, Default)]
struct RefSeed {
  #[serde(default)]
  ownership: Vec<CodeDesc>,
  #[serde(default)]
  category:  Vec<CodeDesc>,
  #[serde(default)]
  purpose:   Vec<PurposeEntry>,
}

async fn seed_ref(store: &SqliteStore, file: &Path) -> Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let seed: RefSeed =
    serde_json::from_str(&raw).context("parsing reference file")?;

  // Categories first so purpose FK targets exist.
  for entry in seed.category {
    store.upsert_category(entry).await?;
  }
  for entry in seed.ownership {
    store.upsert_ownership(entry).await?;
  }
  for entry in seed.purpose {
    store.upsert_purpose(entry).await?;
  }

  tracing::info!("reference tables seeded");
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Accept either a FeatureCollection or a bare array of features.
fn features_from_value(
  value: serde_json::Value,
) -> Result<Vec<serde_json::Value>> {
  match value {
    serde_json::Value::Array(features) => Ok(features),
    serde_json::Value::Object(mut object) => {
      match object.remove("features") {
        Some(serde_json::Value::Array(features)) => Ok(features),
        _ => bail!("expected a FeatureCollection with a features array"),
      }
    }
    _ => bail!("expected a FeatureCollection or an array of features"),
  }
}

fn read_identifiers(path: &Path) -> Result<BTreeSet<String>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  Ok(
    raw
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_owned)
      .collect(),
  )
}

fn write_identifiers(path: &Path, identifiers: &BTreeSet<String>) -> Result<()> {
  let mut lines = String::new();
  for identifier in identifiers {
    lines.push_str(identifier);
    lines.push('\n');
  }
  std::fs::write(path, lines)
    .with_context(|| format!("writing {}", path.display()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn feature_collection_is_unwrapped() {
    let value = json!({
      "type": "FeatureCollection",
      "features": [{ "type": "Feature" }, { "type": "Feature" }],
    });
    assert_eq!(features_from_value(value).unwrap().len(), 2);
  }

  #[test]
  fn bare_array_is_accepted() {
    let value = json!([{ "type": "Feature" }]);
    assert_eq!(features_from_value(value).unwrap().len(), 1);
  }

  #[test]
  fn scalar_input_is_rejected() {
    assert!(features_from_value(json!("nope")).is_err());
    assert!(features_from_value(json!({ "type": "Feature" })).is_err());
  }

  #[test]
  fn ref_seed_sections_are_all_optional() {
    let seed: RefSeed = serde_json::from_str("{}").unwrap();
    assert!(seed.ownership.is_empty());
    assert!(seed.category.is_empty());
    assert!(seed.purpose.is_empty());
  }
}
