//! Whitespace-collapsing compression for context entries
//!
//! The transform serializes a payload to text and collapses every run of
//! whitespace to a single space. Content survives; formatting does not.
//! Compression is best-effort: a payload that cannot be serialized is left
//! untouched and reported as a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::{CompressedPayload, ContextEntry, ContextPayload, PayloadKind};
use crate::error::{LetheError, Result};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Outcome of compressing one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Entry id
    pub id: String,

    /// Size before compression (bytes)
    pub original_size: u64,

    /// Size after compression (bytes)
    pub compressed_size: u64,

    /// `compressed_size / original_size`; 1.0 for a no-op
    pub ratio: f64,
}

impl CompressionResult {
    /// Result describing an entry left as it was
    pub fn no_op(id: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            original_size: size,
            compressed_size: size,
            ratio: 1.0,
        }
    }

    /// Whether the entry was left unchanged
    pub fn is_no_op(&self) -> bool {
        self.original_size == self.compressed_size && self.ratio == 1.0
    }

    /// Bytes saved; negative if the entry grew
    pub fn bytes_saved(&self) -> i64 {
        signed_bytes(self.original_size).saturating_sub(signed_bytes(self.compressed_size))
    }
}

/// Byte count as `i64`, saturating at `i64::MAX`
pub(crate) fn signed_bytes(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

/// Reversible size-reduction transform for single entries
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor;

impl Compressor {
    /// Create a compressor
    pub fn new() -> Self {
        Self
    }

    /// Compress `entry` in place, never failing
    ///
    /// On failure the entry is untouched and the result reports
    /// `compressed_size == original_size` with ratio 1.0.
    pub fn compress(&self, entry: &mut ContextEntry) -> CompressionResult {
        match self.try_compress(entry) {
            Ok(result) => result,
            Err(e) => {
                warn!(context_id = %entry.id, error = %e, "Compression failed, entry left as is");
                CompressionResult::no_op(entry.id.clone(), entry.size)
            }
        }
    }

    /// Compress `entry` in place, reporting failures
    pub fn try_compress(&self, entry: &mut ContextEntry) -> Result<CompressionResult> {
        let original_size = entry.size;

        let (text, kind) = match &entry.data {
            ContextPayload::Compressed(_) => {
                debug!(context_id = %entry.id, "Entry already compressed");
                return Ok(CompressionResult::no_op(entry.id.clone(), original_size));
            }
            ContextPayload::Text(s) => (s.clone(), PayloadKind::Text),
            ContextPayload::Structured(value) => {
                (serde_json::to_string(value)?, PayloadKind::Structured)
            }
            ContextPayload::Raw(bytes) => {
                let text = String::from_utf8(bytes.clone()).map_err(|e| {
                    LetheError::Compression(format!("raw payload is not UTF-8: {}", e))
                })?;
                (text, PayloadKind::Raw)
            }
        };

        let collapsed = WHITESPACE_RUN.replace_all(&text, " ").into_owned();
        let compressed_size = collapsed.len() as u64;

        entry.data = ContextPayload::Compressed(CompressedPayload {
            text: collapsed,
            original: kind,
        });
        entry.size = compressed_size;

        let ratio = if original_size == 0 {
            1.0
        } else {
            compressed_size as f64 / original_size as f64
        };

        debug!(
            context_id = %entry.id,
            original_size,
            compressed_size,
            "Compressed context entry"
        );

        Ok(CompressionResult {
            id: entry.id.clone(),
            original_size,
            compressed_size,
            ratio,
        })
    }

    /// Return a decompressed copy of `entry`
    ///
    /// Structured payloads whose text no longer parses come back as
    /// [`ContextPayload::Text`] holding the stored text.
    pub fn decompress(&self, entry: &ContextEntry) -> ContextEntry {
        let mut restored = entry.clone();

        if let ContextPayload::Compressed(compressed) = &entry.data {
            restored.data = match compressed.original {
                PayloadKind::Structured => match serde_json::from_str(&compressed.text) {
                    Ok(value) => ContextPayload::Structured(value),
                    Err(e) => {
                        warn!(
                            context_id = %entry.id,
                            error = %e,
                            "Compressed text no longer parses, returning raw text"
                        );
                        ContextPayload::Text(compressed.text.clone())
                    }
                },
                PayloadKind::Text => ContextPayload::Text(compressed.text.clone()),
                PayloadKind::Raw => ContextPayload::Raw(compressed.text.clone().into_bytes()),
            };
        }

        restored
    }
}
