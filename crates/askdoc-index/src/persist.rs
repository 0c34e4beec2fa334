//! Versioned SQLite persistence for the vector index.
//!
//! The artifact is one SQLite file per document: a `meta` key/value table
//! declaring {format_version, document identity, model_identifier,
//! dimension, metric}, chunk rows, and raw little-endian f32 vector blobs.
//! Writes go to a temporary sibling file and are renamed into place, so a
//! crashed persist never leaves a half-written artifact at the published
//! path.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use askdoc_core::{Error, Result};

use crate::index::VectorIndex;
use crate::schema::{FORMAT_VERSION, SCHEMA_SQL};
use crate::types::{Chunk, DistanceMetric, DocumentInfo, EmbeddingRecord, MetaValue, PageRange};

impl VectorIndex {
    /// Persist this index to `path`, replacing any existing artifact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let tmp = tmp_path(path);
        if tmp.exists() {
            std::fs::remove_file(&tmp)?;
        }

        let conn = Connection::open(&tmp).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("schema init failed: {}", e)))?;

        let info = self.info();
        let meta: Vec<(&str, String)> = vec![
            ("format_version", FORMAT_VERSION.to_string()),
            ("document_id", info.document_id.clone()),
            ("source_name", info.source_name.clone()),
            ("pages", info.pages.to_string()),
            ("ingested_at", info.ingested_at.to_string()),
            ("model_identifier", self.model_identifier().to_string()),
            ("dimension", self.dimension().to_string()),
            ("metric", self.metric().as_str().to_string()),
            ("chunk_count", self.len().to_string()),
        ];

        conn.execute_batch("BEGIN")
            .map_err(|e| Error::Database(e.to_string()))?;
        {
            let mut put_meta = conn
                .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
                .map_err(|e| Error::Database(e.to_string()))?;
            for (key, value) in &meta {
                put_meta
                    .execute(params![key, value])
                    .map_err(|e| Error::Database(e.to_string()))?;
            }

            let mut put_chunk = conn
                .prepare(
                    "INSERT INTO chunks (chunk_id, sequence_index, text, page_start, page_end, metadata_json) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let mut put_vector = conn
                .prepare("INSERT INTO embeddings (chunk_id, vector) VALUES (?1, ?2)")
                .map_err(|e| Error::Database(e.to_string()))?;

            for record in self.records() {
                let chunk = self
                    .chunk(&record.chunk_id)
                    .ok_or_else(|| Error::Internal("record without chunk".into()))?;
                let metadata_json = if chunk.metadata.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&chunk.metadata)?)
                };
                put_chunk
                    .execute(params![
                        chunk.id,
                        chunk.sequence_index as i64,
                        chunk.text,
                        chunk.pages.start,
                        chunk.pages.end,
                        metadata_json,
                    ])
                    .map_err(|e| Error::Database(e.to_string()))?;
                put_vector
                    .execute(params![record.chunk_id, encode_vector(&record.vector)])
                    .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        conn.execute_batch("COMMIT")
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        std::fs::rename(&tmp, path)?;
        info!(
            "Persisted index for {} ({} chunks) to {}",
            info.document_id,
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a persisted index from `path`.
    ///
    /// Validates the format version and declared configuration before any
    /// query can be served; anything that doesn't add up is `CorruptIndex`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "no index artifact at {}",
                path.display()
            )));
        }

        let conn = Connection::open(path).map_err(|e| Error::Database(e.to_string()))?;
        let meta = read_meta(&conn)?;

        let version: u32 = meta_field(&meta, "format_version")?;
        if version != FORMAT_VERSION {
            return Err(Error::CorruptIndex(format!(
                "{}: artifact format version {} is not supported (expected {})",
                path.display(),
                version,
                FORMAT_VERSION
            )));
        }

        let document_id: String = meta_field(&meta, "document_id")?;
        let source_name: String = meta_field(&meta, "source_name")?;
        let pages: u32 = meta_field(&meta, "pages")?;
        let ingested_at: i64 = meta_field(&meta, "ingested_at")?;
        let model_identifier: String = meta_field(&meta, "model_identifier")?;
        let dimension: usize = meta_field(&meta, "dimension")?;
        let chunk_count: usize = meta_field(&meta, "chunk_count")?;
        let metric_name: String = meta_field(&meta, "metric")?;
        let metric = DistanceMetric::parse(&metric_name).ok_or_else(|| {
            Error::CorruptIndex(format!("unknown distance metric {:?}", metric_name))
        })?;

        let (chunks, records) = read_rows(&conn, &model_identifier, dimension)?;
        if chunks.len() != chunk_count {
            return Err(Error::CorruptIndex(format!(
                "artifact declares {} chunks but contains {}",
                chunk_count,
                chunks.len()
            )));
        }

        let info = DocumentInfo {
            document_id,
            source_name,
            pages,
            ingested_at,
        };
        let index = Self::build(info, &model_identifier, dimension, metric, chunks, records)
            .map_err(|e| Error::CorruptIndex(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded index for {} ({} chunks) from {}",
            index.document_id(),
            index.len(),
            path.display()
        );
        Ok(index)
    }
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("index.db");
    path.with_file_name(format!(".{}.tmp", name))
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn decode_vector(bytes: &[u8], dimension: usize, chunk_id: &str) -> Result<Vec<f32>> {
    if bytes.len() != dimension * 4 {
        return Err(Error::CorruptIndex(format!(
            "vector blob for chunk {} is {} bytes, expected {}",
            chunk_id,
            bytes.len(),
            dimension * 4
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn read_meta(conn: &Connection) -> Result<BTreeMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM meta")
        .map_err(|e| Error::CorruptIndex(format!("missing meta table: {}", e)))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| Error::Database(e.to_string()))?;
    let mut meta = BTreeMap::new();
    for row in rows {
        let (key, value) = row.map_err(|e| Error::Database(e.to_string()))?;
        meta.insert(key, value);
    }
    Ok(meta)
}

fn meta_field<T: std::str::FromStr>(meta: &BTreeMap<String, String>, key: &str) -> Result<T> {
    meta.get(key)
        .ok_or_else(|| Error::CorruptIndex(format!("artifact is missing meta key {:?}", key)))?
        .parse()
        .map_err(|_| Error::CorruptIndex(format!("artifact meta key {:?} is malformed", key)))
}

fn read_rows(
    conn: &Connection,
    model_identifier: &str,
    dimension: usize,
) -> Result<(Vec<Chunk>, Vec<EmbeddingRecord>)> {
    let mut stmt = conn
        .prepare(
            "SELECT c.chunk_id, c.sequence_index, c.text, c.page_start, c.page_end, \
                    c.metadata_json, e.vector \
             FROM chunks c JOIN embeddings e ON e.chunk_id = c.chunk_id \
             ORDER BY c.sequence_index",
        )
        .map_err(|e| Error::CorruptIndex(format!("missing chunk tables: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Vec<u8>>(6)?,
            ))
        })
        .map_err(|e| Error::Database(e.to_string()))?;

    let mut chunks = Vec::new();
    let mut records = Vec::new();
    for row in rows {
        let (chunk_id, sequence_index, text, page_start, page_end, metadata_json, blob) =
            row.map_err(|e| Error::Database(e.to_string()))?;
        let metadata: BTreeMap<String, MetaValue> = match metadata_json {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                Error::CorruptIndex(format!("metadata for chunk {} is malformed: {}", chunk_id, e))
            })?,
            None => BTreeMap::new(),
        };
        let vector = decode_vector(&blob, dimension, &chunk_id)?;
        chunks.push(Chunk {
            id: chunk_id.clone(),
            text,
            sequence_index: sequence_index as usize,
            pages: PageRange::new(page_start, page_end),
            metadata,
        });
        records.push(EmbeddingRecord {
            chunk_id,
            vector,
            model_identifier: model_identifier.to_string(),
        });
    }
    Ok((chunks, records))
}
