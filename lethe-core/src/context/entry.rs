//! Context entry and payload types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Clamp an importance value into `[0.0, 1.0]`; NaN becomes 0.0
pub fn clamp_importance(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Kind of payload before compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Text,
    Structured,
    Raw,
}

/// Whitespace-collapsed text standing in for a compressed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedPayload {
    /// Collapsed textual form of the original payload
    pub text: String,

    /// Payload kind the text was produced from
    pub original: PayloadKind,
}

/// Opaque payload carried by a context entry
///
/// The engine never interprets payloads; it only hands them to the
/// [`Compressor`](crate::compression::Compressor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextPayload {
    /// Plain text
    Text(String),

    /// Structured JSON value
    Structured(serde_json::Value),

    /// Raw bytes
    Raw(Vec<u8>),

    /// Output of the compressor
    Compressed(CompressedPayload),
}

impl ContextPayload {
    /// Whether the payload has been through the compressor
    pub fn is_compressed(&self) -> bool {
        matches!(self, ContextPayload::Compressed(_))
    }

    /// Kind of the payload, looking through compression
    pub fn kind(&self) -> PayloadKind {
        match self {
            ContextPayload::Text(_) => PayloadKind::Text,
            ContextPayload::Structured(_) => PayloadKind::Structured,
            ContextPayload::Raw(_) => PayloadKind::Raw,
            ContextPayload::Compressed(c) => c.original,
        }
    }
}

impl From<String> for ContextPayload {
    fn from(s: String) -> Self {
        ContextPayload::Text(s)
    }
}

impl From<&str> for ContextPayload {
    fn from(s: &str) -> Self {
        ContextPayload::Text(s.to_string())
    }
}

impl From<serde_json::Value> for ContextPayload {
    fn from(value: serde_json::Value) -> Self {
        ContextPayload::Structured(value)
    }
}

impl From<Vec<u8>> for ContextPayload {
    fn from(bytes: Vec<u8>) -> Self {
        ContextPayload::Raw(bytes)
    }
}

/// One unit of managed context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Unique identifier, used as the store key
    pub id: String,

    /// Caller-owned payload
    pub data: ContextPayload,

    /// Creation time (ms since epoch)
    pub created_at: u64,

    /// Last successful read (ms since epoch)
    pub last_accessed: u64,

    /// Number of successful reads
    pub access_count: u64,

    /// Importance score in `[0.0, 1.0]`
    pub importance: f64,

    /// Size in bytes; caller-supplied, updated after compression
    pub size: u64,

    /// Informational tags
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Auxiliary values
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Timestamps are taken from the store's clock on insert
    #[serde(skip)]
    pub(crate) stamp_on_insert: bool,
}

impl ContextEntry {
    /// Create an entry
    ///
    /// `created_at` and `last_accessed` are set from the store's clock when
    /// the entry is added, unless pinned with [`ContextEntry::with_timestamp`].
    pub fn new(id: impl Into<String>, data: impl Into<ContextPayload>, size: u64) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            created_at: 0,
            last_accessed: 0,
            access_count: 0,
            importance: 0.5,
            size,
            tags: BTreeSet::new(),
            metadata: HashMap::new(),
            stamp_on_insert: true,
        }
    }

    /// Set importance (clamped)
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = clamp_importance(importance);
        self
    }

    /// Pin both creation and last-access time; the store keeps them as given
    pub fn with_timestamp(mut self, millis: u64) -> Self {
        self.created_at = millis;
        self.last_accessed = millis;
        self.stamp_on_insert = false;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a metadata value
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the payload has been compressed
    pub fn is_compressed(&self) -> bool {
        self.data.is_compressed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clamp_importance() {
        assert_eq!(clamp_importance(-3.0), 0.0);
        assert_eq!(clamp_importance(5.0), 1.0);
        assert_eq!(clamp_importance(0.25), 0.25);
        assert_eq!(clamp_importance(f64::NAN), 0.0);
    }

    #[test]
    fn test_entry_builder() {
        let entry = ContextEntry::new("ctx-1", "hello", 5)
            .with_importance(1.7)
            .with_timestamp(100)
            .with_tag("session")
            .with_metadata("source", json!("planner"));

        assert_eq!(entry.importance, 1.0);
        assert_eq!(entry.created_at, 100);
        assert_eq!(entry.last_accessed, 100);
        assert!(entry.tags.contains("session"));
        assert_eq!(entry.metadata["source"], json!("planner"));
        assert!(!entry.is_compressed());
    }

    #[test]
    fn test_entry_serde_keeps_tags_and_metadata() {
        let entry = ContextEntry::new("ctx-1", json!({"a": 1}), 7)
            .with_timestamp(5)
            .with_tag("b")
            .with_tag("a")
            .with_metadata("k", json!([1, 2]));

        let text = serde_json::to_string(&entry).expect("serialize");
        let back: ContextEntry = serde_json::from_str(&text).expect("deserialize");

        assert_eq!(back, entry);
        assert_eq!(back.data.kind(), PayloadKind::Structured);
    }
}
