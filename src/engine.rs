//! Detection + extraction engine.
//!
//! [`ExtractionEngine`] is the contract the rest of Rika depends on: given
//! a resource's bytes, return its media type, text (bounded by a
//! [`ContentLimit`]) and a metadata map. [`NativeEngine`] is the bundled
//! implementation built on [`crate::media_type`] and [`crate::extract`].

use tracing::debug;

use crate::error::EngineError;
use crate::extract;
use crate::fetch::SourceBytes;
use crate::media_type;
use crate::models::{ContentLimit, ExtractionOutcome, Metadata, CONTENT_TYPE_KEY};

/// Media-type detection and text/metadata extraction over a byte source.
///
/// Implementations must not extract text when `limit` is
/// [`ContentLimit::MetadataOnly`], and must return text no longer than
/// the limit otherwise.
pub trait ExtractionEngine {
    /// Short identification, shown by `--version`.
    fn name(&self) -> &str;

    fn detect_and_extract(
        &self,
        source: &SourceBytes,
        limit: ContentLimit,
    ) -> Result<ExtractionOutcome, EngineError>;
}

/// Pure-Rust engine: PDF, OOXML, HTML, XML and plain-text formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl ExtractionEngine for NativeEngine {
    fn name(&self) -> &str {
        "native (pdf, docx, pptx, xlsx, html, xml, text)"
    }

    fn detect_and_extract(
        &self,
        source: &SourceBytes,
        limit: ContentLimit,
    ) -> Result<ExtractionOutcome, EngineError> {
        let bytes = source.bytes.as_slice();
        let detected = media_type::detect(
            bytes,
            source.declared_type.as_deref(),
            source.resource_name.as_deref(),
        );

        let mut metadata = Metadata::new();
        if media_type::is_textual(&detected)
            || media_type::is_html(&detected)
            || media_type::is_xml(&detected)
        {
            let encoding = extract::decode_text(bytes).encoding;
            metadata.insert(
                CONTENT_TYPE_KEY.to_string(),
                format!("{}; charset={}", detected, encoding),
            );
            metadata.insert("Content-Encoding".to_string(), encoding.to_string());
        } else {
            metadata.insert(CONTENT_TYPE_KEY.to_string(), detected.clone());
        }
        metadata.insert("Content-Length".to_string(), bytes.len().to_string());
        if let Some(name) = &source.resource_name {
            metadata.insert("resourceName".to_string(), name.clone());
        }
        metadata.insert(
            "X-Parsed-By".to_string(),
            extract::parser_name(&detected).to_string(),
        );
        extract::extract_metadata(bytes, &detected, &mut metadata);

        let content = if limit.wants_text() {
            limit.apply(extract::extract_text(bytes, &detected)?)
        } else {
            debug!(media_type = %detected, "metadata only, skipping text extraction");
            String::new()
        };

        Ok(ExtractionOutcome {
            media_type: detected,
            content,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(bytes: &[u8], name: &str) -> SourceBytes {
        SourceBytes {
            bytes: bytes.to_vec(),
            resource_name: Some(name.to_string()),
            declared_type: None,
        }
    }

    #[test]
    fn plain_text_gets_charset_and_length() {
        let outcome = NativeEngine
            .detect_and_extract(&source(b"Whose woods these are", "poem.txt"), ContentLimit::Unbounded)
            .unwrap();
        assert_eq!(outcome.media_type, "text/plain");
        assert_eq!(outcome.content, "Whose woods these are");
        assert_eq!(outcome.metadata["Content-Type"], "text/plain; charset=UTF-8");
        assert_eq!(outcome.metadata["Content-Length"], "21");
        assert_eq!(outcome.metadata["resourceName"], "poem.txt");
        assert_eq!(outcome.metadata["X-Parsed-By"], "TextParser");
    }

    #[test]
    fn content_is_truncated_to_limit() {
        let outcome = NativeEngine
            .detect_and_extract(&source(b"Whose woods these are", "poem.txt"), ContentLimit::Chars(5))
            .unwrap();
        assert_eq!(outcome.content, "Whose");
        // metadata describes the whole resource, not the truncated text
        assert_eq!(outcome.metadata["Content-Length"], "21");
    }

    #[test]
    fn metadata_only_never_runs_text_extraction() {
        // Unparseable PDF body: text extraction would fail, detection does not.
        let broken_pdf = b"%PDF-1.4\nthis is not really a pdf";
        let full = NativeEngine.detect_and_extract(&source(broken_pdf, "doc.pdf"), ContentLimit::Unbounded);
        assert!(full.is_err());

        let outcome = NativeEngine
            .detect_and_extract(&source(broken_pdf, "doc.pdf"), ContentLimit::MetadataOnly)
            .unwrap();
        assert_eq!(outcome.content, "");
        assert_eq!(outcome.media_type, "application/pdf");
        assert_eq!(outcome.metadata["Content-Type"], "application/pdf");
    }

    #[test]
    fn unknown_binary_yields_empty_text() {
        let outcome = NativeEngine
            .detect_and_extract(&source(&[0, 1, 2, 3, 0, 255], "blob"), ContentLimit::Unbounded)
            .unwrap();
        assert_eq!(outcome.media_type, "application/octet-stream");
        assert_eq!(outcome.content, "");
        assert_eq!(outcome.metadata["X-Parsed-By"], "EmptyParser");
    }
}
