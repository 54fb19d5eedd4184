//! # Rika
//!
//! Document ingestion from the command line: given files, glob patterns or
//! HTTP(S) URLs, Rika detects each resource's media type, extracts its
//! text (optionally bounded) and metadata, detects the text's natural
//! language, and renders the result as pretty-printed text, JSON or YAML.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────┐   ┌──────────────┐
//! │ Resolver │──▶│ Extractor                 │──▶│ Assembler    │
//! │ globs,   │   │ fetch ─▶ engine           │   │ + language   │
//! │ URLs     │   │ (file/HTTP)  (detect+text)│   │ + key sort   │
//! └────┬─────┘   └─────────────┬─────────────┘   └──────┬───────┘
//!      │ issues                │ issues                  ▼
//!      └───────────────────────┴──────────────▶ ┌──────────────┐
//!                                               │ Runner       │
//!                                               │ stream/array │
//!                                               └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rika report.pdf                    # metadata (pretty) + text
//! rika -f J -a 'docs/**/*.docx'      # all documents as one JSON array
//! rika -t- https://example.com/      # metadata only; text never extracted
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Command-line flags, `RIKA_OPTIONS`, validated `Config` |
//! | [`models`] | Core data types |
//! | [`issues`] | Issue categories and the ordered issue map |
//! | [`resolve`] | Argument classification and glob expansion |
//! | [`fetch`] | Reading files and HTTP resources |
//! | [`media_type`] | Media type detection |
//! | [`extract`] | Per-format text and metadata extraction |
//! | [`engine`] | Extraction engine trait and the native engine |
//! | [`extractor`] | Fetch + engine behind one error taxonomy |
//! | [`language`] | Language detection |
//! | [`assemble`] | Normalized result records |
//! | [`formatters`] | Output formats |
//! | [`run`] | Per-run orchestration and reporting |
//! | [`error`] | Error types |

pub mod assemble;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod fetch;
pub mod formatters;
pub mod issues;
pub mod language;
pub mod media_type;
pub mod models;
pub mod resolve;
pub mod run;

use std::time::Duration;

use crate::error::ExtractionError;
use crate::extractor::Extractor;
use crate::fetch::DEFAULT_TIMEOUT;
use crate::language::{LanguageDetector, WhatlangDetector};
use crate::models::{ContentLimit, ExtractionResult, Target};

/// Options for [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub limit: ContentLimit,
    pub key_sort: bool,
    pub http_timeout: Duration,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            limit: ContentLimit::Unbounded,
            key_sort: true,
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Parse one file path or URL, without glob expansion or the resolver's
/// pre-checks.
///
/// ```no_run
/// let result = rika::parse("report.pdf", &rika::ParseOptions::default())?;
/// println!("{} ({})", result.content_type, result.language);
/// # Ok::<(), rika::error::ExtractionError>(())
/// ```
pub fn parse(target: &str, options: &ParseOptions) -> Result<ExtractionResult, ExtractionError> {
    let target = if target.contains("://") {
        Target::url(target)
    } else {
        Target::file(target)
    };
    let outcome = Extractor::new(options.http_timeout).extract(&target, options.limit)?;
    Ok(assemble::assemble(
        &target,
        outcome,
        options.limit,
        options.key_sort,
        WhatlangDetector::shared(),
    ))
}

/// ISO 639-1 code for the language of `text`, or `""` if undetectable.
pub fn language(text: &str) -> String {
    WhatlangDetector::shared().detect(text)
}
