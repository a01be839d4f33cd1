//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::util::errors::BuildError;

/// Require `path` to be an existing directory.
pub fn check_dir(path: &Path) -> Result<(), BuildError> {
    if !path.exists() {
        return Err(BuildError::not_found("directory", path));
    }
    if !path.is_dir() {
        return Err(BuildError::invalid_path(path, "not a directory"));
    }
    Ok(())
}

/// Require `path` to be an existing regular file.
pub fn check_file(path: &Path) -> Result<(), BuildError> {
    if !path.exists() {
        return Err(BuildError::not_found("file", path));
    }
    if !path.is_file() {
        return Err(BuildError::invalid_path(path, "not a regular file"));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
///
/// An existing directory is left untouched with a warning; an existing
/// non-directory is an error.
pub fn ensure_dir(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        if path.is_dir() {
            tracing::warn!("skip creating directory: '{}' exists", path.display());
            return Ok(());
        }
        return Err(BuildError::invalid_path(
            path,
            "cannot create directory: path exists and is not a directory",
        ));
    }
    fs::create_dir_all(path)?;
    tracing::debug!("created directory {}", path.display());
    Ok(())
}

/// Lexically normalize a path, folding `.` and `..` components.
///
/// Unlike `canonicalize`, this works for paths that do not exist yet and
/// does not follow symlinks.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `path` against `base` if it is relative, then normalize it.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&base.join(path))
    }
}

/// Move an existing file out of the way by appending its creation
/// timestamp to the stem, optionally gzip-compressing it.
///
/// Returns the new path, or `None` if `path` did not exist.
pub fn rotate_file(path: &Path, compress: bool) -> Result<Option<PathBuf>, BuildError> {
    if !path.exists() {
        return Ok(None);
    }
    if !path.is_file() {
        return Err(BuildError::invalid_path(path, "not a regular file"));
    }

    let metadata = fs::metadata(path)?;
    let stamp = metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let gz = if compress { ".gz" } else { "" };

    let mut count = 0usize;
    let target = loop {
        let name = if count == 0 {
            format!("{}_{}{}{}", stem, stamp, ext, gz)
        } else {
            format!("{}_{}_{}{}{}", stem, stamp, count, ext, gz)
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            break candidate;
        }
        count += 1;
    };

    if compress {
        let mut input = fs::File::open(path)?;
        let output = fs::File::create(&target)?;
        let mut encoder = GzEncoder::new(output, Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?;
        fs::remove_file(path)?;
    } else {
        fs::rename(path, &target)?;
    }

    tracing::debug!("rotated {} to {}", path.display(), target.display());
    Ok(Some(target))
}
