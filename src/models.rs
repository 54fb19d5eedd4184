//! Core data models used throughout Rika.
//!
//! These types represent the targets, raw engine outcomes, and normalized
//! extraction results that flow through the resolve → extract → assemble
//! → render pipeline.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Metadata key/value pairs in engine-provided (or sorted) order.
pub type Metadata = IndexMap<String, String>;

/// Metadata key holding the detected language code.
pub const LANGUAGE_KEY: &str = "rika:language";
/// Metadata key holding the literal target string.
pub const DATA_SOURCE_KEY: &str = "rika:data-source";
/// Metadata key the engine uses for the media type.
pub const CONTENT_TYPE_KEY: &str = "Content-Type";

/// Kind of resource a target refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    File,
    Http,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::File => f.write_str("file"),
            InputType::Http => f.write_str("http"),
        }
    }
}

/// A validated resource to process: a file path or an HTTP(S) URL.
///
/// The original argument string is kept verbatim; it becomes the
/// result's `data_source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    source: String,
    input_type: InputType,
}

impl Target {
    pub fn file(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            input_type: InputType::File,
        }
    }

    pub fn url(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            input_type: InputType::Http,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn is_file(&self) -> bool {
        self.input_type == InputType::File
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Bound on the amount of text extracted per document.
///
/// Mirrors the integer convention of the command line: `-1` (any
/// negative value) is unbounded, `0` is metadata-only, `N` keeps at most
/// `N` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentLimit {
    #[default]
    Unbounded,
    MetadataOnly,
    Chars(usize),
}

impl ContentLimit {
    pub fn from_i64(n: i64) -> Self {
        match n {
            n if n < 0 => ContentLimit::Unbounded,
            0 => ContentLimit::MetadataOnly,
            n => ContentLimit::Chars(n as usize),
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            ContentLimit::Unbounded => -1,
            ContentLimit::MetadataOnly => 0,
            ContentLimit::Chars(n) => n as i64,
        }
    }

    /// Whether any text extraction should happen at all.
    pub fn wants_text(self) -> bool {
        self != ContentLimit::MetadataOnly
    }

    /// Cut `text` to this limit, counting Unicode scalar values.
    pub fn apply(self, mut text: String) -> String {
        match self {
            ContentLimit::Unbounded => text,
            ContentLimit::MetadataOnly => String::new(),
            ContentLimit::Chars(n) => {
                if let Some((idx, _)) = text.char_indices().nth(n) {
                    text.truncate(idx);
                }
                text
            }
        }
    }
}

/// Raw output of the extraction engine for one target.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub media_type: String,
    pub content: String,
    pub metadata: Metadata,
}

/// The normalized, user-facing record for one processed target.
///
/// `metadata["rika:data-source"]` always equals `data_source` and
/// `metadata["rika:language"]` always equals `language`; both are set once
/// by the assembler.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub content: String,
    pub metadata: Metadata,
    pub content_type: String,
    pub language: String,
    pub input_type: InputType,
    pub data_source: String,
    pub max_content_length: i64,
}

impl ExtractionResult {
    pub fn is_file(&self) -> bool {
        self.input_type == InputType::File
    }

    pub fn is_http(&self) -> bool {
        self.input_type == InputType::Http
    }

    /// Content and metadata as one JSON object, in that key order.
    pub fn content_and_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "content": self.content,
            "metadata": self.metadata,
        })
    }
}
