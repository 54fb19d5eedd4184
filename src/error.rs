//! Error types for Rika.
//!
//! Expected, per-target failures are values, not panics: the extraction
//! adapter returns [`ExtractionError`], whose three variants map one-to-one
//! onto extraction-time [`IssueCategory`] values. Configuration problems
//! are [`ConfigError`] and abort the run before any target is touched.

use thiserror::Error;

use crate::issues::IssueCategory;

/// Failure to extract one target, as surfaced by the adapter.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The URL's host name could not be resolved.
    #[error("unknown host: {host}")]
    UnknownHost { host: String },

    /// Read, connection or transport failure, non-2xx HTTP status, or a
    /// stream the engine could not decode.
    #[error("I/O failure: {message}")]
    IoFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The target passed syntax checks but cannot be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ExtractionError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::IoFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn io_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::IoFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Issue category this failure is reported under.
    pub fn category(&self) -> IssueCategory {
        match self {
            ExtractionError::UnknownHost { .. } => IssueCategory::UnknownHost,
            ExtractionError::IoFailure { .. } => IssueCategory::IoError,
            ExtractionError::InvalidInput(_) => IssueCategory::InvalidInput,
        }
    }
}

impl From<std::io::Error> for ExtractionError {
    fn from(err: std::io::Error) -> Self {
        Self::io_with_source(err.to_string(), err)
    }
}

/// Failure inside an extraction engine while decoding a byte stream.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("XML extraction failed: {0}")]
    Xml(String),
}

impl From<EngineError> for ExtractionError {
    fn from(err: EngineError) -> Self {
        Self::io_with_source(err.to_string(), err)
    }
}

/// Failure to serialize a value with a formatter.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Fatal, pre-flight configuration problem.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid format: {format} (invalid format character '{code}'; valid characters are {valid})")]
    InvalidFormat {
        format: String,
        code: char,
        valid: String,
    },

    #[error("Format must not be empty")]
    EmptyFormat,

    #[error("Could not parse {variable}: {value}")]
    BadEnvironment { variable: String, value: String },
}
