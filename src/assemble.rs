//! Result assembly.
//!
//! Turns a raw [`ExtractionOutcome`] into the [`ExtractionResult`] users
//! see: language detected from the content, the two synthetic
//! `rika:*` metadata keys appended, and keys optionally sorted
//! case-insensitively.

use crate::language::LanguageDetector;
use crate::media_type;
use crate::models::{
    ContentLimit, ExtractionOutcome, ExtractionResult, Metadata, Target, CONTENT_TYPE_KEY,
    DATA_SOURCE_KEY, LANGUAGE_KEY,
};

pub fn assemble(
    target: &Target,
    outcome: ExtractionOutcome,
    limit: ContentLimit,
    key_sort: bool,
    detector: &dyn LanguageDetector,
) -> ExtractionResult {
    let ExtractionOutcome {
        media_type: detected,
        content,
        mut metadata,
    } = outcome;

    let language = detector.detect(&content);
    metadata.insert(LANGUAGE_KEY.to_string(), language.clone());
    metadata.insert(DATA_SOURCE_KEY.to_string(), target.as_str().to_string());
    if key_sort {
        sort_keys(&mut metadata);
    }

    let content_type = metadata
        .get(CONTENT_TYPE_KEY)
        .map(|ct| media_type::essence(ct))
        .filter(|ct| !ct.is_empty())
        .unwrap_or(detected);

    ExtractionResult {
        content,
        metadata,
        content_type,
        language,
        input_type: target.input_type(),
        data_source: target.as_str().to_string(),
        max_content_length: limit.as_i64(),
    }
}

/// Stable sort by lower-cased key; keys equal ignoring case keep their
/// engine order.
fn sort_keys(metadata: &mut Metadata) {
    metadata.sort_by(|a, _, b, _| a.to_lowercase().cmp(&b.to_lowercase()));
}
