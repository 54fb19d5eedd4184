//! Run orchestration.
//!
//! A run resolves its arguments, extracts every target in order, and
//! renders results either as each one completes (streamed mode) or all
//! at once as an array (array mode). A failing target is recorded as an
//! issue and the run moves on; only output failures abort it.
//!
//! # Streamed output
//!
//! Per document, when both metadata and text are enabled and the format
//! pair is `jj`, `JJ` or `yy`, one record `{source, metadata, text}` is
//! serialized. Otherwise the document prints as:
//!
//! ```text
//! Source: <target>
//! <metadata, rendered with the metadata format>
//! <text, rendered with the text format>
//! ```
//!
//! with each section individually switchable.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::assemble::assemble;
use crate::engine::{ExtractionEngine, NativeEngine};
use crate::extractor::Extractor;
use crate::formatters::FormatPair;
use crate::issues::Issues;
use crate::language::{LanguageDetector, WhatlangDetector};
use crate::models::{ContentLimit, ExtractionResult, Target};
use crate::resolve::resolve;

/// What to render and how; fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub formats: FormatPair,
    pub metadata: bool,
    pub text: bool,
    pub key_sort: bool,
    pub source: bool,
    pub as_array: bool,
    pub limit: ContentLimit,
    /// ANSI colour for the pretty-print format.
    pub colour: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            formats: FormatPair::default(),
            metadata: true,
            text: true,
            key_sort: true,
            source: true,
            as_array: false,
            limit: ContentLimit::Unbounded,
            colour: false,
        }
    }
}

/// End-of-run state: successful results in target order plus every
/// issue recorded during resolution and extraction.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<ExtractionResult>,
    pub issues: Issues,
    /// Resolution left nothing to process; the run was a no-op.
    pub no_targets: bool,
}

impl RunReport {
    /// `0` for a clean run or a no-op, `1` when any issue was recorded.
    pub fn exit_code(&self) -> u8 {
        if self.no_targets || self.issues.is_empty() {
            0
        } else {
            1
        }
    }

    /// Issue summary followed, for a no-op run, by the no-targets notice.
    pub fn write_summary(&self, err: &mut dyn Write) -> Result<()> {
        if let Some(report) = self.issues.report() {
            err.write_all(report.as_bytes())?;
        }
        if self.no_targets {
            writeln!(err, "No valid targets specified.")?;
        }
        Ok(())
    }
}

pub struct Runner<'d, E: ExtractionEngine = NativeEngine> {
    extractor: Extractor<E>,
    detector: &'d dyn LanguageDetector,
    options: RunOptions,
}

impl Runner<'static, NativeEngine> {
    /// Native engine and the shared language detector.
    pub fn new(options: RunOptions, http_timeout: Duration) -> Self {
        Self::with_parts(
            Extractor::new(http_timeout),
            WhatlangDetector::shared(),
            options,
        )
    }
}

impl<'d, E: ExtractionEngine> Runner<'d, E> {
    pub fn with_parts(
        extractor: Extractor<E>,
        detector: &'d dyn LanguageDetector,
        options: RunOptions,
    ) -> Self {
        Self {
            extractor,
            detector,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Resolve `args` and process every valid target, writing rendered
    /// output to `out`.
    pub fn run<S: AsRef<str>>(&self, args: &[S], out: &mut dyn Write) -> Result<RunReport> {
        let resolution = resolve(args);
        let mut report = RunReport {
            issues: resolution.issues,
            ..RunReport::default()
        };
        if resolution.targets.is_empty() {
            report.no_targets = true;
            return Ok(report);
        }
        debug!(
            targets = resolution.targets.len(),
            as_array = self.options.as_array,
            "processing"
        );

        if self.options.as_array {
            let mut records = Vec::new();
            for target in &resolution.targets {
                if let Some(result) = self.process(target, &mut report.issues) {
                    records.push(self.record(&result));
                    report.results.push(result);
                }
            }
            let rendered = self
                .options
                .formats
                .metadata
                .render(&Value::Array(records), self.options.colour)
                .context("rendering result array")?;
            emit(out, rendered)?;
        } else {
            for target in &resolution.targets {
                if let Some(result) = self.process(target, &mut report.issues) {
                    let rendered = self
                        .document_output(&result)
                        .with_context(|| format!("rendering {}", target))?;
                    emit(out, rendered)?;
                    report.results.push(result);
                }
            }
        }
        Ok(report)
    }

    /// Extract and assemble one target, recording a failure as an issue.
    pub fn process(&self, target: &Target, issues: &mut Issues) -> Option<ExtractionResult> {
        match self.extractor.extract(target, self.options.limit) {
            Ok(outcome) => Some(assemble(
                target,
                outcome,
                self.options.limit,
                self.options.key_sort,
                self.detector,
            )),
            Err(e) => {
                debug!(target = %target, error = %e, "extraction failed");
                issues.record(e.category(), target.as_str());
                None
            }
        }
    }

    fn document_output(&self, result: &ExtractionResult) -> Result<String> {
        let opts = &self.options;
        if opts.metadata && opts.text && opts.formats.is_whole_record() {
            return Ok(opts.formats.metadata.render(&self.record(result), opts.colour)?);
        }

        let mut out = String::new();
        if opts.source {
            out.push_str(&format!("Source: {}\n", result.data_source));
        }
        if opts.metadata {
            out.push_str(&opts.formats.metadata.render(&metadata_value(result), opts.colour)?);
            out.push('\n');
        }
        if opts.text {
            out.push_str(
                &opts
                    .formats
                    .text
                    .render(&Value::String(result.content.clone()), opts.colour)?,
            );
            out.push('\n');
        }
        Ok(out)
    }

    /// `{source?, metadata?, text?}` for whole-record and array output.
    fn record(&self, result: &ExtractionResult) -> Value {
        let mut record = Map::new();
        if self.options.source {
            record.insert(
                "source".to_string(),
                Value::String(result.data_source.clone()),
            );
        }
        if self.options.metadata {
            record.insert("metadata".to_string(), metadata_value(result));
        }
        if self.options.text {
            record.insert("text".to_string(), Value::String(result.content.clone()));
        }
        Value::Object(record)
    }
}

fn metadata_value(result: &ExtractionResult) -> Value {
    Value::Object(
        result
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Write `rendered`, terminated by exactly one newline unless it already
/// ends with one.
fn emit(out: &mut dyn Write, mut rendered: String) -> Result<()> {
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    out.write_all(rendered.as_bytes())
        .context("writing to standard output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::fetch::{Fetcher, SourceBytes};
    use crate::issues::IssueCategory;
    use crate::models::{ExtractionOutcome, Metadata};
    use std::cell::Cell;
    use tempfile::TempDir;

    struct FixedDetector;

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> String {
            "en".to_string()
        }
    }

    /// Echoes the file body as text; fails on bodies starting with `FAIL`.
    #[derive(Default)]
    struct EchoEngine {
        calls: Cell<usize>,
    }

    impl ExtractionEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn detect_and_extract(
            &self,
            source: &SourceBytes,
            limit: ContentLimit,
        ) -> Result<ExtractionOutcome, EngineError> {
            self.calls.set(self.calls.get() + 1);
            let body = String::from_utf8_lossy(&source.bytes).into_owned();
            if body.starts_with("FAIL") {
                return Err(EngineError::Pdf("broken".to_string()));
            }
            let mut metadata = Metadata::new();
            metadata.insert("X-Parsed-By".to_string(), "Echo".to_string());
            metadata.insert("Content-Type".to_string(), "text/plain".to_string());
            Ok(ExtractionOutcome {
                media_type: "text/plain".to_string(),
                content: limit.apply(body),
                metadata,
            })
        }
    }

    fn runner(options: RunOptions) -> Runner<'static, EchoEngine> {
        static DETECTOR: FixedDetector = FixedDetector;
        Runner::with_parts(
            Extractor::with_engine(Fetcher::default(), EchoEngine::default()),
            &DETECTOR,
            options,
        )
    }

    fn write(tmp: &TempDir, name: &str, body: &str) -> String {
        let path = tmp.path().join(name);
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn run(options: RunOptions, args: &[String]) -> (RunReport, String) {
        let mut out = Vec::new();
        let report = runner(options).run(args, &mut out).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn streamed_output_has_source_metadata_and_text() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.txt", "alpha");
        let options = RunOptions {
            formats: FormatPair::parse("it").unwrap(),
            ..RunOptions::default()
        };
        let (report, out) = run(options, &[a.clone()]);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            out,
            format!(
                "Source: {a}\n{{\"Content-Type\" => \"text/plain\", \"rika:data-source\" => \"{a}\", \"rika:language\" => \"en\", \"X-Parsed-By\" => \"Echo\"}}\nalpha\n"
            )
        );
    }

    #[test]
    fn whole_record_json_per_document() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.txt", "alpha");
        let options = RunOptions {
            formats: FormatPair::parse("j").unwrap(),
            ..RunOptions::default()
        };
        let (_, out) = run(options, &[a.clone()]);
        let value: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["source"], a.as_str());
        assert_eq!(value["text"], "alpha");
        assert_eq!(value["metadata"]["rika:data-source"], a.as_str());
    }

    #[test]
    fn array_mode_renders_once_in_target_order() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.txt", "alpha");
        let b = write(&tmp, "b.txt", "bravo");
        let options = RunOptions {
            formats: FormatPair::parse("J").unwrap(),
            as_array: true,
            source: false,
            metadata: false,
            ..RunOptions::default()
        };
        let (report, out) = run(options, &[b, a]);
        assert_eq!(report.results.len(), 2);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!([{"text": "bravo"}, {"text": "alpha"}]));
    }

    #[test]
    fn failing_target_is_isolated() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.txt", "alpha");
        let bad = write(&tmp, "bad.txt", "FAIL here");
        let c = write(&tmp, "c.txt", "charlie");
        let missing = tmp.path().join("missing.txt").to_string_lossy().into_owned();
        let options = RunOptions {
            formats: FormatPair::parse("tt").unwrap(),
            metadata: false,
            source: false,
            ..RunOptions::default()
        };
        let (report, out) = run(options, &[a, missing.clone(), bad.clone(), c]);
        assert_eq!(out, "alpha\ncharlie\n");
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.issues.get(IssueCategory::NonExistentFile), [missing]);
        assert_eq!(report.issues.get(IssueCategory::IoError), [bad]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn no_targets_is_a_successful_no_op() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nothing-*.txt").to_string_lossy().into_owned();
        let runner = runner(RunOptions::default());
        let mut out = Vec::new();
        let report = runner.run(&[missing], &mut out).unwrap();
        assert!(report.no_targets);
        assert!(out.is_empty());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(runner.extractor.engine().calls.get(), 0);

        let mut err = Vec::new();
        report.write_summary(&mut err).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("Issues:\n  non_existent_file:\n"));
        assert!(err.ends_with("No valid targets specified.\n"));
    }

    #[test]
    fn metadata_only_limit_reaches_the_engine() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.txt", "alpha");
        let options = RunOptions {
            text: false,
            limit: ContentLimit::MetadataOnly,
            ..RunOptions::default()
        };
        let (report, _) = run(options, &[a]);
        assert_eq!(report.results[0].content, "");
        assert_eq!(report.results[0].max_content_length, 0);
    }
}
