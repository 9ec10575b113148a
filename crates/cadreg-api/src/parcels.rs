//! Handlers for `/parcels` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/parcels` | Query keys: `cadnum`, `area`, `ownership_code`, `purpose_code`, `address` |
//! | `GET`    | `/parcels/{cadnum}` | Cadastre first, then archive; 404 if neither |
//! | `POST`   | `/parcels` | Draw a new land parcel; identifier is assigned |
//! | `DELETE` | `/parcels` | Body: `{"cadnum":"…"}`; land layer only |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cadreg_core::{
  filter::resolve,
  parcel::NewLandParcel,
  store::ParcelStore,
};
use cadreg_geojson::feature::{geometry_from_value, parcel_feature};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, error::ApiError};

// ─── Search ──────────────────────────────────────────────────────────────────

/// `GET /parcels[?cadnum=…&area=…&…]`
///
/// Runs the resolved filters against the cadastre and the archive
/// independently and returns the matching identifiers per layer.
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  let predicates = resolve(&params, state.match_mode);
  let results = state
    .store
    .search_across_layers(&predicates)
    .await
    .map_err(ApiError::from_store)?;

  let identifiers =
    |parcels: Vec<cadreg_core::parcel::Parcel>| -> Vec<String> {
      parcels.into_iter().map(|p| p.identifier).collect()
    };

  Ok(Json(json!({
    "Cadastre": identifiers(results.cadastre),
    "Archive":  identifiers(results.archive),
  })))
}

// ─── Point lookup ────────────────────────────────────────────────────────────

/// `GET /parcels/{cadnum}` — full GeoJSON feature for one parcel.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(cadnum): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  let parcel = state
    .store
    .find_by_identifier(&cadnum)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("parcel {cadnum} not found")))?;
  Ok(Json(parcel_feature(&parcel)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub area:        f64,
  pub geometry:    serde_json::Value,
  /// Recorded as the parcel address, e.g. the drawing user's email.
  pub owner_label: String,
}

/// `POST /parcels` — persist a user-drawn parcel.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  let geometry = geometry_from_value(&body.geometry)?;
  let input = NewLandParcel::new(body.area, geometry, body.owner_label)
    .map_err(ApiError::from_store)?;

  let parcel = state
    .store
    .create_user_drawn(input)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(identifier = %parcel.identifier, "created user-drawn parcel");
  Ok((
    StatusCode::CREATED,
    Json(json!({ "identifier": parcel.identifier })),
  ))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
  pub cadnum: String,
}

/// `DELETE /parcels` — body: `{"cadnum":"…"}`. Only user-drawn parcels can
/// be deleted through the API; cadastre rows leave via archival.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<DeleteBody>,
) -> Result<StatusCode, ApiError>
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .delete_user_drawn(&body.cadnum)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
