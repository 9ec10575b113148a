//! JSON REST API for the parcel registry.
//!
//! Exposes an axum [`Router`] backed by any
//! [`cadreg_core::store::ParcelStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.

pub mod error;
pub mod parameters;
pub mod parcels;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use cadreg_core::{filter::MatchMode, store::ParcelStore};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `CADREG_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// How `cadnum` and `address` filters match; codes always contains-match.
  #[serde(default)]
  pub match_mode: MatchMode,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ParcelStore> {
  pub store:      Arc<S>,
  pub match_mode: MatchMode,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ParcelStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/parcels",
      get(parcels::search::<S>)
        .post(parcels::create::<S>)
        .delete(parcels::delete::<S>),
    )
    .route("/parcels/{cadnum}", get(parcels::get_one::<S>))
    .route("/parameters", get(parameters::list::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
