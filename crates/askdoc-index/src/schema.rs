//! SQLite schema for the persisted index artifact.

/// Artifact format version. Bumped on any incompatible layout change; a
/// mismatch on load is fatal, never reinterpreted.
pub const FORMAT_VERSION: u32 = 1;

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    chunk_id       TEXT PRIMARY KEY,
    sequence_index INTEGER NOT NULL,
    text           TEXT NOT NULL,
    page_start     INTEGER NOT NULL,
    page_end       INTEGER NOT NULL,
    metadata_json  TEXT
);

CREATE TABLE IF NOT EXISTS embeddings (
    chunk_id TEXT PRIMARY KEY REFERENCES chunks(chunk_id),
    vector   BLOB NOT NULL
);
";
