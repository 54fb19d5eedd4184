//! Target resolution.
//!
//! Turns raw command-line strings into validated [`Target`]s. Strings
//! containing `://` are URL candidates; everything else is a filesystem
//! path or glob pattern, expanded here (not by the shell) so patterns such
//! as `docs/**/*.pdf` work on every platform and have no argument-count
//! limit.
//!
//! Bad input never fails the call: each rejected string is recorded in
//! [`Issues`] under the category explaining why.

use globset::GlobBuilder;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

use crate::issues::{IssueCategory, Issues};
use crate::models::Target;

/// Output of [`resolve`]: accepted targets in first-seen order plus issues.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub targets: Vec<Target>,
    pub issues: Issues,
}

/// Classify and validate each argument, expanding glob patterns.
pub fn resolve<S: AsRef<str>>(args: &[S]) -> Resolution {
    let mut resolution = Resolution::default();
    for arg in args {
        let arg = arg.as_ref();
        if arg.contains("://") {
            match resolve_url(arg) {
                Ok(target) => {
                    debug!(target = %target, "resolved URL target");
                    resolution.targets.push(target);
                }
                Err(category) => resolution.issues.record(category, arg),
            }
        } else if has_glob_meta(arg) {
            expand_glob(arg, &mut resolution);
        } else {
            classify_path(arg, Path::new(arg), &mut resolution);
        }
    }
    resolution
}

fn resolve_url(arg: &str) -> Result<Target, IssueCategory> {
    // A URL-shaped name that also exists on disk is ambiguous; refuse to guess.
    if fs::symlink_metadata(arg).is_ok() {
        return Err(IssueCategory::FileWithUrlLikeName);
    }

    let scheme = arg.split("://").next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Err(IssueCategory::BadUrlScheme);
    }

    match Url::parse(arg) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(Target::url(arg)),
        _ => Err(IssueCategory::InvalidUrl),
    }
}

fn classify_path(shown: &str, path: &Path, resolution: &mut Resolution) {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            resolution
                .issues
                .record(IssueCategory::NonExistentFile, shown);
            return;
        }
        Err(_) => {
            resolution.issues.record(IssueCategory::IoError, shown);
            return;
        }
    };

    if metadata.file_type().is_symlink() {
        resolution.issues.record(IssueCategory::IsSymlink, shown);
    } else if metadata.is_dir() {
        // Recursive patterns like `**/*` routinely match directories.
        debug!(path = shown, "skipping directory");
    } else if metadata.len() == 0 {
        resolution.issues.record(IssueCategory::EmptyFile, shown);
    } else if fs::File::open(path).is_err() {
        resolution.issues.record(IssueCategory::IoError, shown);
    } else {
        debug!(path = shown, "resolved file target");
        resolution.targets.push(Target::file(shown));
    }
}

fn expand_glob(pattern: &str, resolution: &mut Resolution) {
    let (base, rest) = split_glob(pattern);
    let matcher = match GlobBuilder::new(&rest).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            debug!(pattern, error = %e, "unparseable glob pattern");
            no_glob_match(pattern, resolution);
            return;
        }
    };

    let walk_root = if base.is_empty() { "." } else { base.as_str() };
    let max_depth = if rest.contains("**") {
        usize::MAX
    } else {
        rest.split('/').count()
    };
    let include_hidden = rest.starts_with('.') || rest.contains("/.");

    let mut matched = Vec::new();
    let walker = WalkDir::new(walk_root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(pattern, error = %e, "unreadable entry during glob expansion");
                continue;
            }
        };
        let relative = entry
            .path()
            .strip_prefix(walk_root)
            .unwrap_or(entry.path());
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if !include_hidden && rel_str.split('/').any(|part| part.starts_with('.')) {
            continue;
        }
        if matcher.is_match(&rel_str) {
            matched.push(join_display(&base, &rel_str));
        }
    }

    if matched.is_empty() {
        no_glob_match(pattern, resolution);
        return;
    }
    for path in matched {
        classify_path(&path, Path::new(&path), resolution);
    }
}

/// A pattern that expands to nothing may still name a file literally,
/// e.g. `report[1].txt`.
fn no_glob_match(pattern: &str, resolution: &mut Resolution) {
    if fs::symlink_metadata(pattern).is_ok() {
        debug!(pattern, "no glob matches, using literal path");
        classify_path(pattern, Path::new(pattern), resolution);
    } else {
        resolution
            .issues
            .record(IssueCategory::NonExistentFile, pattern);
    }
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Split a pattern into its literal directory prefix and the globbed rest.
fn split_glob(pattern: &str) -> (String, String) {
    let parts: Vec<&str> = pattern.split('/').collect();
    let first_glob = parts
        .iter()
        .position(|part| has_glob_meta(part))
        .unwrap_or(parts.len());
    let base = parts[..first_glob].join("/");
    let rest = parts[first_glob..].join("/");
    if base.is_empty() && pattern.starts_with('/') {
        ("/".to_string(), rest)
    } else {
        (base, rest)
    }
}

fn join_display(base: &str, relative: &str) -> String {
    if base.is_empty() {
        relative.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, relative)
    } else {
        format!("{}/{}", base, relative)
    }
}
