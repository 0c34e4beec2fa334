//! Askdoc Ingest — turning a source PDF into a searchable vector index.
//!
//! Extraction produces page-numbered text, the chunker cuts overlapping
//! windows with page provenance, the enricher attaches best-effort LLM
//! metadata, and the pipeline embeds everything and builds the index.

pub mod chunker;
pub mod enrich;
pub mod extract;
pub mod pipeline;

pub use chunker::{Chunker, ChunkerConfig};
pub use enrich::MetadataEnricher;
pub use extract::{content_hash, extract_document, Document, Page, PdfTextExtractor, TextExtractor};
pub use pipeline::{IngestPipeline, PipelineConfig};
