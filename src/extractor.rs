//! Extraction adapter.
//!
//! The single seam the orchestrator calls per target: open the resource,
//! run the engine, and translate every failure into the three-way
//! [`ExtractionError`] taxonomy. The fetched bytes are owned by
//! [`Extractor::extract`] and released when it returns, whichever path it
//! returns by.

use std::time::Duration;
use tracing::debug;

use crate::engine::{ExtractionEngine, NativeEngine};
use crate::error::ExtractionError;
use crate::fetch::{Fetcher, DEFAULT_TIMEOUT};
use crate::models::{ContentLimit, ExtractionOutcome, Target};

pub struct Extractor<E: ExtractionEngine = NativeEngine> {
    fetcher: Fetcher,
    engine: E,
}

impl Default for Extractor<NativeEngine> {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Extractor<NativeEngine> {
    pub fn new(http_timeout: Duration) -> Self {
        Self::with_engine(Fetcher::new(http_timeout), NativeEngine)
    }
}

impl<E: ExtractionEngine> Extractor<E> {
    pub fn with_engine(fetcher: Fetcher, engine: E) -> Self {
        Self { fetcher, engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Extract one validated target.
    pub fn extract(
        &self,
        target: &Target,
        limit: ContentLimit,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        debug!(target = %target, limit = limit.as_i64(), "extracting");
        let source = self.fetcher.open(target)?;
        let outcome = self.engine.detect_and_extract(&source, limit)?;
        debug!(
            target = %target,
            media_type = %outcome.media_type,
            chars = outcome.content.chars().count(),
            "extracted"
        );
        Ok(outcome)
    }
}
