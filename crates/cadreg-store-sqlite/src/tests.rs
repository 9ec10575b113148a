//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;
use std::time::Instant;

use cadreg_core::{
  filter::{MatchMode, resolve},
  geometry::{MultiPolygon, Polygon, Ring},
  parcel::{CodeDesc, Layer, NewLandParcel, PurposeEntry},
  store::{FieldMapping, ParcelStore},
};
use serde_json::json;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn square(origin: f64) -> MultiPolygon {
  MultiPolygon(vec![Polygon {
    exterior:  Ring(vec![
      [origin, origin],
      [origin + 0.1, origin],
      [origin + 0.1, origin + 0.1],
      [origin, origin],
    ]),
    interiors: vec![],
  }])
}

fn mapping() -> FieldMapping {
  FieldMapping {
    identifier:     "cadnum".to_owned(),
    ownership_code: "ownership".to_owned(),
    purpose_code:   "purpose".to_owned(),
    area:           "area".to_owned(),
    address:        "address".to_owned(),
  }
}

fn feature(cadnum: &str, area: &str, ownership: &str) -> serde_json::Value {
  json!({
    "type": "Feature",
    "geometry": {
      "type": "MultiPolygon",
      "coordinates": [[[[30.0, 46.0], [30.1, 46.0], [30.1, 46.1], [30.0, 46.0]]]],
    },
    "properties": {
      "cadnum":    cadnum,
      "area":      area,
      "ownership": ownership,
      "purpose":   "01.01",
      "address":   "вул. Центральна",
    },
  })
}

async fn import_cadastre(s: &SqliteStore, features: Vec<serde_json::Value>) {
  s.bulk_import(features, &mapping(), Layer::Cadastre, None)
    .await
    .unwrap();
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect()
}

// ─── User-drawn parcels ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_drawn_assigns_sequential_identifiers() {
  let s = store().await;

  let input = |area| {
    NewLandParcel::new(area, square(30.0), "user@example.com").unwrap()
  };
  let first = s.create_user_drawn(input(1.5)).await.unwrap();
  let second = s.create_user_drawn(input(2.5)).await.unwrap();

  assert_eq!(first.identifier, "1");
  assert_eq!(second.identifier, "2");
  assert_eq!(first.layer, Layer::Land);
  assert_eq!(first.address.as_deref(), Some("user@example.com"));
}

#[tokio::test]
async fn concurrent_creates_assign_distinct_contiguous_identifiers() {
  let s = store().await;
  let input =
    || NewLandParcel::new(1.0, square(30.0), "user@example.com").unwrap();

  // Identifier assignment is serialised by the write lock, so every racer
  // must win a distinct slot and the sequence stays gap-free.
  let results = tokio::join!(
    s.create_user_drawn(input()),
    s.create_user_drawn(input()),
    s.create_user_drawn(input()),
    s.create_user_drawn(input()),
    s.create_user_drawn(input()),
  );

  let mut identifiers: Vec<String> = [
    results.0, results.1, results.2, results.3, results.4,
  ]
  .into_iter()
  .map(|r| r.unwrap().identifier)
  .collect();
  identifiers.sort_by_key(|id| id.parse::<i64>().unwrap());
  assert_eq!(identifiers, ["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn user_drawn_sequence_resumes_after_delete() {
  let s = store().await;
  let input =
    || NewLandParcel::new(1.0, square(30.0), "user@example.com").unwrap();

  s.create_user_drawn(input()).await.unwrap();
  let second = s.create_user_drawn(input()).await.unwrap();
  s.delete_user_drawn(&second.identifier).await.unwrap();

  // max + 1 over the remaining rows, so "2" is reused.
  let third = s.create_user_drawn(input()).await.unwrap();
  assert_eq!(third.identifier, "2");
}

#[tokio::test]
async fn delete_missing_user_drawn_is_not_found() {
  let s = store().await;
  let err = s.delete_user_drawn("99").await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(cadreg_core::Error::ParcelNotFound(_))
  ));
}

#[tokio::test]
async fn delete_ignores_other_layers() {
  let s = store().await;
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.0", "100")])
    .await;

  let err = s
    .delete_user_drawn("5121680800:01:001:0001")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(cadreg_core::Error::ParcelNotFound(_))
  ));
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_without_filters_returns_whole_layer_ordered() {
  let s = store().await;
  import_cadastre(
    &s,
    vec![
      feature("5121680800:01:001:0002", "1.0", "100"),
      feature("5121680800:01:001:0001", "2.0", "100"),
    ],
  )
  .await;

  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0].identifier, "5121680800:01:001:0001");
  assert_eq!(results[1].identifier, "5121680800:01:001:0002");
}

#[tokio::test]
async fn search_filters_combine_conjunctively() {
  let s = store().await;
  import_cadastre(
    &s,
    vec![
      feature("5121680800:01:001:0001", "1.0", "100"),
      feature("5121680800:01:001:0002", "3.5", "100"),
      feature("5121680800:01:001:0003", "3.5", "200"),
    ],
  )
  .await;

  let predicates = resolve(
    &params(&[("area", ">=2"), ("ownership_code", "100")]),
    MatchMode::Contains,
  );
  let results = s.search(Layer::Cadastre, &predicates).await.unwrap();
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].identifier, "5121680800:01:001:0002");
}

#[tokio::test]
async fn search_across_layers_keeps_results_separate() {
  let s = store().await;
  import_cadastre(
    &s,
    vec![
      feature("5121680800:01:001:0001", "1.0", "100"),
      feature("5121680800:01:001:0002", "1.0", "100"),
    ],
  )
  .await;
  s.archive(&["5121680800:01:001:0002".to_owned()])
    .await
    .unwrap();

  let predicates = resolve(&params(&[("cadnum", "5121")]), MatchMode::Contains);
  let results = s.search_across_layers(&predicates).await.unwrap();
  assert_eq!(results.cadastre.len(), 1);
  assert_eq!(results.archive.len(), 1);
  assert_eq!(results.cadastre[0].identifier, "5121680800:01:001:0001");
  assert_eq!(results.archive[0].identifier, "5121680800:01:001:0002");
}

#[tokio::test]
async fn search_resolves_reference_labels() {
  let s = store().await;
  s.upsert_ownership(CodeDesc {
    code: "100".to_owned(),
    desc: "приватна".to_owned(),
  })
  .await
  .unwrap();
  s.upsert_purpose(PurposeEntry {
    code:          "01.01".to_owned(),
    desc:          "товарне виробництво".to_owned(),
    category_code: None,
  })
  .await
  .unwrap();
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.0", "100")])
    .await;

  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  let ownership = results[0].ownership.as_ref().unwrap();
  assert_eq!(ownership.code, "100");
  assert_eq!(ownership.desc, "приватна");
  let purpose = results[0].purpose.as_ref().unwrap();
  assert_eq!(purpose.code, "01.01");
}

#[tokio::test]
async fn unresolved_reference_code_reads_back_as_none() {
  let s = store().await;
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.0", "999")])
    .await;

  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert!(results[0].ownership.is_none());
}

// ─── Point lookup ────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_identifier_prefers_cadastre() {
  let s = store().await;
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.0", "100")])
    .await;

  let found = s
    .find_by_identifier("5121680800:01:001:0001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.layer, Layer::Cadastre);
}

#[tokio::test]
async fn find_by_identifier_falls_back_to_archive() {
  let s = store().await;
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.0", "100")])
    .await;
  s.archive(&["5121680800:01:001:0001".to_owned()])
    .await
    .unwrap();

  let found = s
    .find_by_identifier("5121680800:01:001:0001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.layer, Layer::Archive);
}

#[tokio::test]
async fn find_by_identifier_missing_is_none() {
  let s = store().await;
  assert!(s.find_by_identifier("nope").await.unwrap().is_none());
}

// ─── Bulk import ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_import_reports_inserted_count() {
  let s = store().await;
  let count = s
    .bulk_import(
      vec![
        feature("5121680800:01:001:0001", "1.2345", "100"),
        feature("5121680800:01:001:0002", "2,5", "100"),
      ],
      &mapping(),
      Layer::Cadastre,
      None,
    )
    .await
    .unwrap();
  assert_eq!(count, 2);

  // Comma decimal separator parsed; precision kept.
  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert_eq!(results[0].area, "1.2345".parse().unwrap());
  assert_eq!(results[1].area, "2.5".parse().unwrap());
}

#[tokio::test]
async fn bulk_import_malformed_feature_aborts_whole_batch() {
  let s = store().await;
  let mut bad = feature("5121680800:01:001:0002", "1.0", "100");
  bad["geometry"] = json!({ "type": "Point", "coordinates": [30.0, 46.0] });

  let err = s
    .bulk_import(
      vec![feature("5121680800:01:001:0001", "1.0", "100"), bad],
      &mapping(),
      Layer::Cadastre,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Geometry(_)));

  // No partial writes.
  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert!(results.is_empty());
}

#[tokio::test]
async fn bulk_import_missing_identifier_aborts() {
  let s = store().await;
  let mut bad = feature("x", "1.0", "100");
  bad["properties"]
    .as_object_mut()
    .unwrap()
    .remove("cadnum");

  let err = s
    .bulk_import(vec![bad], &mapping(), Layer::Cadastre, None)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(cadreg_core::Error::Validation(_))
  ));
}

#[tokio::test]
async fn bulk_import_elapsed_deadline_aborts_with_no_rows() {
  let s = store().await;

  // A cutoff in the past fails the batch before anything commits.
  let err = s
    .bulk_import(
      vec![
        feature("5121680800:01:001:0001", "1.0", "100"),
        feature("5121680800:01:001:0002", "2.0", "100"),
      ],
      &mapping(),
      Layer::Cadastre,
      Some(Instant::now()),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DeadlineElapsed(_)));

  let results = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert!(results.is_empty());
}

// ─── Archival transition ─────────────────────────────────────────────────────

#[tokio::test]
async fn archive_moves_rows_and_reports_missing() {
  let s = store().await;
  import_cadastre(
    &s,
    vec![
      feature("5121680800:01:001:0001", "1.0", "100"),
      feature("5121680800:01:001:0002", "2.0", "100"),
    ],
  )
  .await;

  let report = s
    .archive(&[
      "5121680800:01:001:0001".to_owned(),
      "5121680800:01:001:0009".to_owned(),
    ])
    .await
    .unwrap();

  assert_eq!(report.archived, vec!["5121680800:01:001:0001"]);
  assert_eq!(report.missing, vec!["5121680800:01:001:0009"]);

  // Moved out of the cadastre, present in the archive, never both.
  let cadastre = s.search(Layer::Cadastre, &[]).await.unwrap();
  assert_eq!(cadastre.len(), 1);
  let archive = s.search(Layer::Archive, &[]).await.unwrap();
  assert_eq!(archive.len(), 1);
  assert_eq!(archive[0].identifier, "5121680800:01:001:0001");
}

#[tokio::test]
async fn archive_preserves_fields_and_geometry() {
  let s = store().await;
  import_cadastre(&s, vec![feature("5121680800:01:001:0001", "1.2345", "100")])
    .await;
  let before = s
    .find_by_identifier("5121680800:01:001:0001")
    .await
    .unwrap()
    .unwrap();

  s.archive(&["5121680800:01:001:0001".to_owned()])
    .await
    .unwrap();
  let after = s
    .find_by_identifier("5121680800:01:001:0001")
    .await
    .unwrap()
    .unwrap();

  assert_eq!(after.layer, Layer::Archive);
  assert_eq!(after.area, before.area);
  assert_eq!(after.address, before.address);
  assert_eq!(after.geometry, before.geometry);
}

// ─── Reference tables ────────────────────────────────────────────────────────

#[tokio::test]
async fn parameters_lists_upserted_entries_in_code_order() {
  let s = store().await;
  s.upsert_ownership(CodeDesc {
    code: "200".to_owned(),
    desc: "комунальна".to_owned(),
  })
  .await
  .unwrap();
  s.upsert_ownership(CodeDesc {
    code: "100".to_owned(),
    desc: "приватна".to_owned(),
  })
  .await
  .unwrap();
  s.upsert_purpose(PurposeEntry {
    code:          "01.01".to_owned(),
    desc:          "товарне виробництво".to_owned(),
    category_code: None,
  })
  .await
  .unwrap();

  let parameters = s.parameters().await.unwrap();
  assert_eq!(parameters.ownership.len(), 2);
  assert_eq!(parameters.ownership[0].code, "100");
  assert_eq!(parameters.ownership[1].code, "200");
  assert_eq!(parameters.purpose.len(), 1);
}

#[tokio::test]
async fn upsert_overwrites_description() {
  let s = store().await;
  let entry = |desc: &str| CodeDesc {
    code: "100".to_owned(),
    desc: desc.to_owned(),
  };
  s.upsert_ownership(entry("stale")).await.unwrap();
  s.upsert_ownership(entry("приватна")).await.unwrap();

  let parameters = s.parameters().await.unwrap();
  assert_eq!(parameters.ownership.len(), 1);
  assert_eq!(parameters.ownership[0].desc, "приватна");
}
