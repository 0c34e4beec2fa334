//! Recovery of JSON objects from chatty model output.
//!
//! Models asked for "ONLY valid JSON" still wrap it in markdown fences,
//! prose, or Python literals. This module digs the first object out anyway.

use askdoc_core::{Error, Result};

/// Extract the first JSON object from a model response.
///
/// Tries, in order: brace-matched extraction of the first `{...}` span, any
/// single line that is itself an object, and a last-resort pass that repairs
/// Python-style literals (`'`, `None`, `True`, `False`).
pub fn extract_json(response: &str) -> Result<serde_json::Value> {
    let cleaned = response
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    if let Some(span) = first_object_span(&cleaned) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    for line in cleaned.lines() {
        let line = line.trim();
        if line.starts_with('{') && line.ends_with('}') {
            if let Ok(value) = serde_json::from_str(line) {
                return Ok(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            let repaired = cleaned[start..=end]
                .replace('\'', "\"")
                .replace("None", "null")
                .replace("True", "true")
                .replace("False", "false");
            if let Ok(value) = serde_json::from_str(&repaired) {
                return Ok(value);
            }
        }
    }

    Err(Error::Model(format!(
        "could not parse JSON from model output: {}",
        truncate(&cleaned, 200)
    )))
}

/// Byte span of the first brace-balanced `{...}` in `text`, if any.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
