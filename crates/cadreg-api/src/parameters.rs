//! Handler for the `/parameters` reference-table listing.

use axum::{Json, extract::State};
use cadreg_core::{parcel::RefParameters, store::ParcelStore};

use crate::{AppState, error::ApiError};

/// `GET /parameters` — the ownership and purpose reference tables, for
/// populating filter drop-downs.
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<RefParameters>, ApiError>
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  let parameters = state
    .store
    .parameters()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(parameters))
}
