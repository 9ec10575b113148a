//! Core types and trait definitions for the cadreg parcel registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod parcel;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
