//! Version oracle: reads `changelog.json` from a version directory and
//! decides whether a staged fetch is actually newer than what is live.
//!
//! The changelog is a JSON object whose keys are version tokens; the
//! *last* key in document order is the version the directory claims to
//! be. The comparison is deliberately conservative: if either side
//! cannot be read or parsed the verdict is inconclusive and the current
//! version stays in place.

use std::fs;
use std::io;
use std::path::Path;

use semver::Version;
use tracing::{info, warn};

use crate::errors::ChangelogError;

/// File name looked up inside a version directory.
pub const CHANGELOG_FILE: &str = "changelog.json";

/// Outcome of comparing staged against active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapVerdict {
    /// Staged is strictly newer; swap.
    Newer,
    /// Staged is the same or older; discard it.
    NotNewer,
    /// One side could not be read or parsed; keep the current version.
    Inconclusive,
}

/// Last version token declared by the changelog in `dir`.
pub fn latest_entry(dir: &Path) -> Result<String, ChangelogError> {
    let path = dir.join(CHANGELOG_FILE);
    let raw = fs::read_to_string(&path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            ChangelogError::Missing(path.clone())
        } else {
            ChangelogError::Malformed {
                path: path.clone(),
                detail: err.to_string(),
            }
        }
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| ChangelogError::Malformed {
            path: path.clone(),
            detail: err.to_string(),
        })?;
    let object = value.as_object().ok_or_else(|| ChangelogError::Malformed {
        path: path.clone(),
        detail: "top level is not an object".to_string(),
    })?;
    let last = object.keys().last().ok_or_else(|| ChangelogError::Malformed {
        path: path.clone(),
        detail: "no entries".to_string(),
    })?;
    Ok(last.clone())
}

/// Parse a version token. A leading `v`/`V` is dropped and short
/// numeric tokens are padded (`1.2` reads as `1.2.0`).
pub fn parse_version(token: &str) -> Option<Version> {
    let trimmed = token.trim().trim_start_matches(['v', 'V']);
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let segments: Vec<&str> = trimmed.split('.').collect();
    if segments.len() < 3 && segments.iter().all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())) {
        let mut padded = trimmed.to_string();
        for _ in segments.len()..3 {
            padded.push_str(".0");
        }
        return Version::parse(&padded).ok();
    }
    None
}

/// Compare the staged directory's version against the active one.
pub fn swap_verdict(staged_dir: &Path, active_dir: &Path) -> SwapVerdict {
    let staged_raw = match latest_entry(staged_dir) {
        Ok(token) => token,
        Err(err) => {
            warn!(side = "staged", error = %err, "version unknown; keeping current version");
            return SwapVerdict::Inconclusive;
        }
    };
    let active_raw = match latest_entry(active_dir) {
        Ok(token) => token,
        Err(err) => {
            warn!(side = "active", error = %err, "version unknown; keeping current version");
            return SwapVerdict::Inconclusive;
        }
    };
    match (parse_version(&staged_raw), parse_version(&active_raw)) {
        (Some(staged), Some(active)) => {
            let verdict = if staged > active {
                SwapVerdict::Newer
            } else {
                SwapVerdict::NotNewer
            };
            info!(
                staged = %staged_raw,
                active = %active_raw,
                newer = matches!(verdict, SwapVerdict::Newer),
                "version comparison"
            );
            verdict
        }
        _ => {
            warn!(
                staged = %staged_raw,
                active = %active_raw,
                "unparseable version token; keeping current version"
            );
            SwapVerdict::Inconclusive
        }
    }
}
