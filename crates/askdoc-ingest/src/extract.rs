//! Source document text extraction.

use askdoc_core::{Error, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

/// One page of extracted text, numbered from 1.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// An extracted source document: stable identity plus ordered page texts.
/// Created once per ingestion run and never mutated.
#[derive(Debug, Clone)]
pub struct Document {
    /// Content hash of the source bytes.
    pub id: String,
    /// Original filename or URL.
    pub source_name: String,
    pub pages: Vec<Page>,
}

/// Compute the content hash that identifies a source document.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Trait for turning raw document bytes into page-numbered text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>>;
}

/// PDF extraction backed by `pdf-extract`, run on the blocking pool.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>> {
        let owned = bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&owned)
        })
        .await
        .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))?
        .map_err(|e| Error::Extraction(format!("failed to read PDF: {}", e)))?;

        debug!("Extracted {} pages", pages.len());
        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i as u32 + 1,
                text,
            })
            .collect())
    }
}

/// Extract `bytes` into a [`Document`] with its content-hash identity.
pub async fn extract_document(
    extractor: &dyn TextExtractor,
    bytes: &[u8],
    source_name: &str,
) -> Result<Document> {
    let pages = extractor.extract(bytes).await?;
    Ok(Document {
        id: content_hash(bytes),
        source_name: source_name.to_string(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
        assert_eq!(content_hash(b"hello").len(), 64);
    }

    struct FixedExtractor;

    #[async_trait]
    impl TextExtractor for FixedExtractor {
        async fn extract(&self, _bytes: &[u8]) -> Result<Vec<Page>> {
            Ok(vec![
                Page {
                    number: 1,
                    text: "first".into(),
                },
                Page {
                    number: 2,
                    text: "second".into(),
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_extract_document_carries_identity() {
        let doc = extract_document(&FixedExtractor, b"bytes", "a.pdf")
            .await
            .unwrap();
        assert_eq!(doc.id, content_hash(b"bytes"));
        assert_eq!(doc.source_name, "a.pdf");
        assert_eq!(doc.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_pdf_extractor_rejects_garbage() {
        let result = PdfTextExtractor.extract(b"definitely not a pdf").await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
