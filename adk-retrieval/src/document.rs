//! Data types for stored documents and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arbitrary key-value metadata attached to a document.
///
/// Metadata is only ever used for filtering, never for ranking.
pub type Metadata = HashMap<String, Value>;

/// Opaque identity of a stored document, assigned by the storage engine on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source document to be embedded and ingested.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The text content to embed and index.
    pub text: String,
    /// Metadata for the document. `title`, `url` and `text_override` keys are
    /// lifted into the stored record on ingestion.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: Metadata::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document ready for insertion: everything but the storage-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    /// Display title, mirrored from the `title` metadata entry.
    pub title: String,
    /// Source location, mirrored from the `url` metadata entry.
    pub url: String,
    /// The text that was embedded.
    pub text: String,
    /// Replacement text returned to callers instead of `text`.
    pub text_override: Option<String>,
    /// Filterable metadata.
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl NewDocument {
    /// Build an insertable record from raw text, its embedding and ingestion metadata.
    ///
    /// `title` and `url` are taken out of `metadata` (empty when absent or not a
    /// string) while staying in the filterable metadata. `text_override` is removed
    /// from metadata entirely. Entries whose value is JSON `null` are dropped.
    pub fn from_parts(
        text: impl Into<String>,
        embedding: Vec<f32>,
        mut metadata: Metadata,
    ) -> Self {
        let title = string_field(&metadata, "title");
        let url = string_field(&metadata, "url");
        let text_override = metadata.remove("text_override").and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        metadata.retain(|_, v| !v.is_null());

        Self { title, url, text: text.into(), text_override, metadata, embedding }
    }
}

fn string_field(metadata: &Metadata, key: &str) -> String {
    metadata.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// A document as persisted by the storage engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedDocument {
    /// Store-assigned identifier.
    pub id: DocumentId,
    pub title: String,
    pub url: String,
    /// The text that was embedded.
    pub text: String,
    /// Replacement text returned to callers instead of `text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_override: Option<String>,
    /// Filterable metadata, including `title` and `url`.
    pub metadata: Metadata,
    /// Empty when the storage engine does not return vectors with search rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl EmbeddedDocument {
    /// The text shown to callers: `text_override` when set, otherwise `text`.
    pub fn display_text(&self) -> &str {
        self.text_override.as_deref().unwrap_or(&self.text)
    }
}

/// A stored document paired with its raw distance to a query vector.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: EmbeddedDocument,
    /// Distance as computed by the active [`DistanceStrategy`](crate::DistanceStrategy).
    /// Lower is nearer.
    pub distance: f64,
}

/// A retrieved document returned to callers.
///
/// Built fresh per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentResult {
    pub id: DocumentId,
    /// `text_override` if the stored document has one, otherwise its `text`.
    pub text: String,
    pub title: String,
    pub url: String,
    pub metadata: Metadata,
    /// Higher is more relevant for cosine. Euclidean and max-inner-product
    /// report the raw distance, which is not bounded to `[0, 1]`. Fused
    /// results carry their reciprocal rank fusion score here.
    pub similarity_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_parts_lifts_record_fields_and_drops_nulls() {
        let metadata: Metadata = serde_json::from_value(json!({
            "title": "Rust",
            "url": "https://www.rust-lang.org",
            "text_override": "shown instead",
            "lang": "en",
            "draft": null
        }))
        .unwrap();

        let doc = NewDocument::from_parts("body", vec![1.0, 0.0], metadata);

        assert_eq!(doc.title, "Rust");
        assert_eq!(doc.url, "https://www.rust-lang.org");
        assert_eq!(doc.text_override.as_deref(), Some("shown instead"));
        assert!(!doc.metadata.contains_key("text_override"));
        assert!(!doc.metadata.contains_key("draft"));
        assert_eq!(doc.metadata.get("lang"), Some(&json!("en")));
        assert_eq!(doc.metadata.get("title"), Some(&json!("Rust")));
    }

    #[test]
    fn from_parts_defaults_missing_title_and_url_to_empty() {
        let doc = NewDocument::from_parts("body", vec![], Metadata::new());
        assert_eq!(doc.title, "");
        assert_eq!(doc.url, "");
        assert_eq!(doc.text_override, None);
    }

    #[test]
    fn display_text_prefers_override() {
        let mut doc = EmbeddedDocument {
            id: DocumentId(1),
            title: String::new(),
            url: String::new(),
            text: "original".into(),
            text_override: None,
            metadata: Metadata::new(),
            embedding: vec![],
        };
        assert_eq!(doc.display_text(), "original");
        doc.text_override = Some("override".into());
        assert_eq!(doc.display_text(), "override");
    }
}
