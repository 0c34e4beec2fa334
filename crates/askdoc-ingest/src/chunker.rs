//! Fixed-size overlapping window chunker with page provenance.
//!
//! Page texts are concatenated while a per-offset page map is retained, then
//! the chunker walks the text in `chunk_size`-character windows advancing by
//! `chunk_size - overlap`. The same document and configuration always
//! produce byte-identical chunks, which is what makes chunk ids stable.

use askdoc_core::{Error, Result};
use askdoc_index::{Chunk, PageRange};

use crate::extract::Document;

/// Chunking parameters. Sizes are in characters, not bytes.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            overlap: 200,
        }
    }
}

/// Stateless document chunker.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Validate the configuration and build a chunker. `overlap >=
    /// chunk_size` would never advance the window and is rejected outright.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if config.overlap >= config.chunk_size {
            return Err(Error::Config(format!(
                "overlap {} must be smaller than chunk_size {}",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Cut `document` into overlapping chunks. An empty document yields an
    /// empty sequence.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut text: Vec<char> = Vec::new();
        let mut page_starts: Vec<(usize, u32)> = Vec::new();
        for page in &document.pages {
            page_starts.push((text.len(), page.number));
            text.extend(page.text.chars());
        }
        if text.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        let step = size - self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + size).min(text.len());
            let window: String = text[start..end].iter().collect();
            let pages = PageRange::new(
                page_at(&page_starts, start),
                page_at(&page_starts, end - 1),
            );
            chunks.push(Chunk::new(&document.id, chunks.len(), window, pages));
            if start + size >= text.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Page containing the character at `offset`. Empty pages contribute no
/// characters, so the last page starting at or before the offset wins.
fn page_at(page_starts: &[(usize, u32)], offset: usize) -> u32 {
    let idx = page_starts.partition_point(|&(start, _)| start <= offset);
    page_starts[idx.saturating_sub(1)].1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Page;

    fn doc(pages: &[(u32, &str)]) -> Document {
        Document {
            id: "doc1".into(),
            source_name: "doc1.pdf".into(),
            pages: pages
                .iter()
                .map(|&(number, text)| Page {
                    number,
                    text: text.into(),
                })
                .collect(),
        }
    }

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size: size,
            overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        // "ABCDEFGHIJ", size 4, overlap 1 → ABCD / DEFG / GHIJ.
        let chunks = chunker(4, 1).chunk(&doc(&[(1, "ABCDEFGHIJ")]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ABCD", "DEFG", "GHIJ"]);
        assert_eq!(
            chunks.iter().map(|c| c.sequence_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_short_document_is_one_chunk() {
        let chunks = chunker(100, 10).chunk(&doc(&[(1, "tiny")]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "tiny");
        assert_eq!(chunks[0].pages, PageRange::new(1, 1));
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        assert!(chunker(100, 10).chunk(&doc(&[])).is_empty());
        assert!(chunker(100, 10).chunk(&doc(&[(1, "")])).is_empty());
    }

    #[test]
    fn test_overlap_at_or_above_size_is_rejected() {
        assert!(Chunker::new(ChunkerConfig {
            chunk_size: 100,
            overlap: 100
        })
        .is_err());
        assert!(Chunker::new(ChunkerConfig {
            chunk_size: 100,
            overlap: 150
        })
        .is_err());
        assert!(Chunker::new(ChunkerConfig {
            chunk_size: 0,
            overlap: 0
        })
        .is_err());
    }

    #[test]
    fn test_page_ranges_span_boundaries() {
        // Pages of 5 chars each; the middle window straddles both.
        let chunks = chunker(4, 1).chunk(&doc(&[(1, "ABCDE"), (2, "FGHIJ")]));
        assert_eq!(chunks[0].pages, PageRange::new(1, 1));
        assert_eq!(chunks[1].pages, PageRange::new(1, 2));
        assert_eq!(chunks[2].pages, PageRange::new(2, 2));
    }

    #[test]
    fn test_empty_page_does_not_break_provenance() {
        let chunks = chunker(10, 0).chunk(&doc(&[(1, "AAAA"), (2, ""), (3, "BBBB")]));
        assert_eq!(chunks[0].pages, PageRange::new(1, 3));
    }

    #[test]
    fn test_reconstruction_property() {
        let original = "The quick brown fox jumps over the lazy dog. \
                        Pack my box with five dozen liquor jugs. \
                        Sphinx of black quartz, judge my vow.";
        for (size, overlap) in [(10, 0), (10, 3), (25, 5), (40, 39), (500, 200)] {
            let chunks = chunker(size, overlap).chunk(&doc(&[(1, original)]));
            let mut rebuilt = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let skip = if i == 0 { 0 } else { overlap };
                rebuilt.extend(chunk.text.chars().skip(skip));
            }
            assert_eq!(rebuilt, original, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_exactly_overlap() {
        let text: String = ('a'..='z').cycle().take(300).collect();
        let overlap = 7;
        let chunks = chunker(50, overlap).chunk(&doc(&[(1, &text)]));
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .text
                .chars()
                .skip(pair[0].text.chars().count() - overlap)
                .collect();
            let head: String = pair[1].text.chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_all_chunks_bounded_and_only_last_short() {
        let text: String = "x".repeat(1234);
        let chunks = chunker(100, 20).chunk(&doc(&[(1, &text)]));
        for (i, chunk) in chunks.iter().enumerate() {
            let len = chunk.text.chars().count();
            assert!(len <= 100);
            if i + 1 < chunks.len() {
                assert_eq!(len, 100);
            }
        }
    }

    #[test]
    fn test_multibyte_text_is_not_split_inside_code_points() {
        let text = "héllo wörld — ∂éjà vu çafé niño".repeat(5);
        let chunks = chunker(12, 4).chunk(&doc(&[(1, &text)]));
        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { 4 };
            rebuilt.extend(chunk.text.chars().skip(skip));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_determinism() {
        let document = doc(&[(1, "ABCDE"), (2, "FGHIJ"), (3, "KLMNO")]);
        let first = chunker(6, 2).chunk(&document);
        let second = chunker(6, 2).chunk(&document);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.text, b.text);
            assert_eq!(a.pages, b.pages);
        }
    }
}
