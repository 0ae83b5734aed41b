//! Path normalization, traversal rejection and include/exclude filtering.
//!
//! Paths are handled as `/`-separated strings. This matches the manifest
//! format, which stores paths as text, and keeps normalization independent of
//! the host platform's separator rules.

use crate::context::ScanPolicy;

/// Longest path, in bytes, that normalization accepts.
pub const MAX_PATH_LEN: usize = 4096;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Path is empty")]
    Empty,
    #[error("Path exceeds {max} bytes ({len} bytes): {prefix}...", max = MAX_PATH_LEN)]
    TooLong { len: usize, prefix: String },
}

/// Normalizes a path string.
///
/// Converts `\` separators to `/`, collapses duplicate separators, drops `.`
/// segments and resolves `..` against the preceding segment. Absolute paths
/// stay absolute and cannot climb above `/`. A relative path keeps any
/// leading `..` segments it cannot resolve, so that [`is_safe`] still sees
/// them.
pub fn normalize(path: &str) -> Result<String, SanitizeError> {
    if path.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if path.len() >= MAX_PATH_LEN {
        return Err(SanitizeError::TooLong {
            len: path.len(),
            prefix: path.chars().take(64).collect(),
        });
    }

    let converted = path.replace('\\', "/");
    let absolute = converted.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in converted.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    Ok(match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    })
}

/// Conservative traversal guard.
///
/// Rejects any path containing a `..` segment marker as a literal substring
/// (`../`, `..\`, a trailing `/..` or `\..`, or the bare `..`). Names such as
/// `foo../bar` are rejected too.
pub fn is_safe(path: &str) -> bool {
    !(path == ".."
        || path.contains("../")
        || path.contains("..\\")
        || path.ends_with("/..")
        || path.ends_with("\\.."))
}

/// Returns the last segment of a `/`-separated path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_hidden(path: &str) -> bool {
    let base = base_name(path);
    base.len() > 1 && base.starts_with('.')
}

fn contains_pattern(path: &str, pattern: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        path.contains(pattern)
    } else {
        path.to_lowercase().contains(&pattern.to_lowercase())
    }
}

/// Decides whether a file path is filtered out by `policy`.
///
/// Applied in order: hidden-file suppression (when enabled), the include
/// allow-list (if any include pattern exists, at least one must match), then
/// the exclude deny-list (any match excludes). Patterns are plain substrings.
pub fn should_exclude(path: &str, policy: &ScanPolicy) -> bool {
    if policy.ignore_hidden && is_hidden(path) {
        return true;
    }

    if !policy.include.is_empty()
        && !policy
            .include
            .iter()
            .any(|pattern| contains_pattern(path, pattern, policy.case_sensitive))
    {
        return true;
    }

    policy
        .exclude
        .iter()
        .any(|pattern| contains_pattern(path, pattern, policy.case_sensitive))
}

/// Decides whether a directory is pruned from a walk.
///
/// Only hidden suppression and the exclude list apply; the include
/// allow-list selects files, so it must not cut off the directories that
/// lead to them.
pub fn should_exclude_dir(path: &str, policy: &ScanPolicy) -> bool {
    if policy.ignore_hidden && is_hidden(path) {
        return true;
    }

    policy
        .exclude
        .iter()
        .any(|pattern| contains_pattern(path, pattern, policy.case_sensitive))
}

/// Whether a walk of the tree would skip the file at relative `path`, either
/// because one of its parent directories is pruned or because the file
/// itself is filtered.
pub fn is_filtered(path: &str, policy: &ScanPolicy) -> bool {
    let pruned_parent = path
        .match_indices('/')
        .map(|(i, _)| &path[..i])
        .filter(|dir| !dir.is_empty())
        .any(|dir| should_exclude_dir(dir, policy));
    pruned_parent || should_exclude(path, policy)
}

/// Strips a normalized `root` from a normalized `path`, anchored at a
/// separator.
///
/// Returns `None` when `path` does not lie strictly below `root`.
pub fn relative_to<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let rest = match root {
        "." if !path.starts_with('/') && path != "." => return Some(path),
        "." => return None,
        "/" => path.strip_prefix('/')?,
        _ => path.strip_prefix(root)?.strip_prefix('/')?,
    };
    (!rest.is_empty()).then_some(rest)
}

/// Joins a relative path onto `root` and normalizes the result.
///
/// An absolute `relative` is appended rather than replacing `root`, so the
/// result always stays under `root` unless `relative` climbs out with `..`.
pub fn join(root: &str, relative: &str) -> Result<String, SanitizeError> {
    normalize(&format!("{root}/{relative}"))
}
