//! Per-target issue tracking.
//!
//! Targets that cannot be resolved or extracted are never dropped silently:
//! each one is recorded under an [`IssueCategory`]. Resolution-time and
//! extraction-time issues share one map and are reported once, at the end
//! of a run.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Why a target was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    NonExistentFile,
    EmptyFile,
    IsSymlink,
    BadUrlScheme,
    InvalidUrl,
    FileWithUrlLikeName,
    IoError,
    UnknownHost,
    InvalidInput,
}

impl IssueCategory {
    /// Every category, in reporting order.
    pub const ALL: [IssueCategory; 9] = [
        IssueCategory::NonExistentFile,
        IssueCategory::EmptyFile,
        IssueCategory::IsSymlink,
        IssueCategory::BadUrlScheme,
        IssueCategory::InvalidUrl,
        IssueCategory::FileWithUrlLikeName,
        IssueCategory::IoError,
        IssueCategory::UnknownHost,
        IssueCategory::InvalidInput,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::NonExistentFile => "non_existent_file",
            IssueCategory::EmptyFile => "empty_file",
            IssueCategory::IsSymlink => "is_symlink",
            IssueCategory::BadUrlScheme => "bad_url_scheme",
            IssueCategory::InvalidUrl => "invalid_url",
            IssueCategory::FileWithUrlLikeName => "file_with_url_like_name",
            IssueCategory::IoError => "io_error",
            IssueCategory::UnknownHost => "unknown_host",
            IssueCategory::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from category to the targets recorded under it.
///
/// All categories exist from construction, each with an empty list.
/// Targets keep insertion order within a category; duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issues {
    by_category: IndexMap<IssueCategory, Vec<String>>,
}

impl Default for Issues {
    fn default() -> Self {
        Self::new()
    }
}

impl Issues {
    pub fn new() -> Self {
        let by_category = IssueCategory::ALL
            .iter()
            .map(|category| (*category, Vec::new()))
            .collect();
        Self { by_category }
    }

    pub fn record(&mut self, category: IssueCategory, target: impl Into<String>) {
        let target = target.into();
        tracing::warn!(category = %category, target = %target, "issue recorded");
        self.by_category.entry(category).or_default().push(target);
    }

    /// Append every entry of `other`, keeping its per-category order.
    pub fn merge(&mut self, other: Issues) {
        for (category, targets) in other.by_category {
            self.by_category.entry(category).or_default().extend(targets);
        }
    }

    pub fn get(&self, category: IssueCategory) -> &[String] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.values().all(Vec::is_empty)
    }

    /// Total number of recorded targets across all categories.
    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    /// Non-empty categories with their targets, in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (IssueCategory, &[String])> {
        self.by_category
            .iter()
            .filter(|(_, targets)| !targets.is_empty())
            .map(|(category, targets)| (*category, targets.as_slice()))
    }

    /// Human-readable summary for stderr, or `None` when nothing was recorded.
    pub fn report(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut out = String::from("Issues:\n");
        for (category, targets) in self.iter() {
            out.push_str(&format!("  {}:\n", category));
            for target in targets {
                out.push_str(&format!("    {}\n", target));
            }
        }
        Some(out)
    }
}
