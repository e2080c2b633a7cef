//! Profile catalog.
//!
//! Enumerates the connection profiles available in the profile directory.
//! The filename is the profile's identity: it is what the operator sees,
//! what selection and rotation are keyed on, and what equality means.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::logger::{self, LogLevel};

/// The profile directory could not be enumerated.
///
/// Non-fatal: the supervisor degrades to an empty catalog and logs a warning.
#[derive(Debug, Error)]
#[error("failed to read profile directory {}: {}", .dir.display(), .source)]
pub struct CatalogError {
    /// The directory that could not be read.
    pub dir: PathBuf,
    #[source]
    source: std::io::Error,
}

/// A selectable client configuration file.
///
/// Immutable once the catalog is built; equality is by name.
#[derive(Debug, Clone, Eq)]
pub struct Profile {
    /// Filename, the profile's identity.
    pub name: String,
    /// Full path handed to the client at launch.
    pub path: PathBuf,
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Enumerates profiles in `dir` whose filename ends in `.{extension}`.
///
/// The result is deduplicated by name and sorted ascending, so catalog order
/// is stable across runs and rotation visits profiles in a predictable
/// sequence. An empty result is valid (it just disables start).
///
/// # Errors
///
/// Returns [`CatalogError`] if the directory cannot be read.
pub fn load(dir: &Path, extension: &str) -> Result<Vec<Profile>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CatalogError {
        dir: dir.to_path_buf(),
        source: e,
    })?;

    let mut profiles: Vec<Profile> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case(extension) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            logger::log(
                LogLevel::Warning,
                "CATALOG",
                format!("Skipped non-UTF-8 filename: {}", path.display()),
            );
            continue;
        };
        profiles.push(Profile {
            name: name.to_string(),
            path,
        });
    }

    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    profiles.dedup_by(|a, b| a.name == b.name);

    if profiles.is_empty() {
        logger::log(
            LogLevel::Warning,
            "CATALOG",
            format!("No .{extension} profiles found in {}", dir.display()),
        );
    }

    Ok(profiles)
}

/// Position of the named profile in the catalog, used for cycle advancement.
#[must_use]
pub fn index_of(profiles: &[Profile], name: &str) -> Option<usize> {
    profiles.iter().position(|p| p.name == name)
}
