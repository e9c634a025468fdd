//! `frostutils::path` is a module containing path utilities for the frostvault project.

use std::{
    env,
    path::{Component, Path, PathBuf},
};

use crate::{FrostutilsError, FrostutilsResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolves a storage root from an environment variable, falling back to `default_subdir` inside
/// the user's home directory.
///
/// An empty variable counts as unset.
pub fn resolve_env_path(env_var: &str, default_subdir: &str) -> FrostutilsResult<PathBuf> {
    match env::var_os(env_var) {
        Some(value) if !value.is_empty() => {
            let path = PathBuf::from(value);
            tracing::debug!("using {} from {}", path.display(), env_var);
            Ok(path)
        }
        _ => dirs::home_dir()
            .map(|home| home.join(default_subdir))
            .ok_or(FrostutilsError::HomeDirUnavailable),
    }
}

/// Lexically normalizes `path`, resolving `.` and `..` without touching the filesystem.
///
/// Fails if the path is relative or if `..` would climb above the root.
pub fn normalize_absolute(path: &Path) -> FrostutilsResult<PathBuf> {
    if !path.is_absolute() {
        return Err(FrostutilsError::PathValidation(format!(
            "expected an absolute path: {}",
            path.display()
        )));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.parent().is_none() {
                    return Err(FrostutilsError::PathValidation(format!(
                        "path escapes the root: {}",
                        path.display()
                    )));
                }
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    Ok(normalized)
}

/// Returns `true` when one path equals or contains the other, comparing whole components.
///
/// `/data/sys` and `/data/system` do not overlap; `/data` and `/data/sys` do.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
