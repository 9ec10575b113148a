//! SQL schema for the parcel registry SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS ownership_refs (
    code        TEXT PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS category_refs (
    code        TEXT PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS purpose_refs (
    code          TEXT PRIMARY KEY,
    description   TEXT NOT NULL,
    category_code TEXT REFERENCES category_refs(code)
);

-- One table for all three lifecycle layers. An archival transition is a
-- layer flip, so a parcel can never exist in two layers at once.
CREATE TABLE IF NOT EXISTS parcels (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    layer          TEXT NOT NULL,    -- 'cadastre' | 'archive' | 'land'
    identifier     TEXT NOT NULL,    -- cadastral number, or sequence for land
    area           TEXT NOT NULL,    -- decimal rendered as text, >= 4 dp kept
    address        TEXT,
    ownership_code TEXT,
    purpose_code   TEXT,
    category_code  TEXT,
    geometry       BLOB NOT NULL,    -- EWKB, SRID 4326
    UNIQUE (layer, identifier)
);

CREATE INDEX IF NOT EXISTS parcels_layer_idx          ON parcels(layer);
CREATE INDEX IF NOT EXISTS parcels_ownership_code_idx ON parcels(ownership_code);
CREATE INDEX IF NOT EXISTS parcels_purpose_code_idx   ON parcels(purpose_code);

PRAGMA user_version = 1;
";
