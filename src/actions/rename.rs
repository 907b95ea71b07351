//! In-place file renaming with cache invalidation.

use std::fs;
use std::path::{Path, PathBuf};

use super::{invalidate_cache, regular_file_size, FileOpError};
use crate::cache::HashCache;
use crate::scanner::absolute_path;

/// Characters rejected in new file names on every platform.
pub const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Check that `name` is a bare file name we are willing to rename to.
///
/// # Errors
///
/// Returns [`FileOpError::InvalidName`] if the name is empty, `.` or `..`,
/// contains a path separator, a control character, or one of
/// [`INVALID_NAME_CHARS`].
pub fn validate_new_name(name: &str) -> Result<(), FileOpError> {
    let invalid = |reason: &str| FileOpError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name cannot be a relative directory"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("name cannot contain path separators"));
    }
    if name.chars().any(|c| INVALID_NAME_CHARS.contains(&c)) {
        return Err(invalid("name contains invalid characters"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("name contains control characters"));
    }
    Ok(())
}

/// Rename `path` to `new_name` within the same directory.
///
/// Cache entries for both the old and the new path are invalidated, so
/// neither name can serve a digest recorded for a different file.
///
/// Returns the new path, absolute even when `path` was relative.
///
/// # Errors
///
/// - [`FileOpError::NotFound`] / [`FileOpError::NotAFile`] for a bad source
/// - [`FileOpError::InvalidName`] if `new_name` fails [`validate_new_name`]
/// - [`FileOpError::AlreadyExists`] if the target name is taken
/// - [`FileOpError::PermissionDenied`] or [`FileOpError::Io`] if the rename fails
pub fn rename_file(
    path: &Path,
    new_name: &str,
    cache: Option<&HashCache>,
) -> Result<PathBuf, FileOpError> {
    let absolute = absolute_path(path);
    let path = absolute.as_path();
    regular_file_size(path)?;
    validate_new_name(new_name)?;

    let target = path
        .parent()
        .map_or_else(|| PathBuf::from(new_name), |parent| parent.join(new_name));

    if target.symlink_metadata().is_ok() {
        return Err(FileOpError::AlreadyExists(target));
    }

    fs::rename(path, &target).map_err(|e| {
        log::error!("Rename failed for {}: {}", path.display(), e);
        FileOpError::from_io(path, e)
    })?;
    log::info!("Renamed {} -> {}", path.display(), target.display());

    invalidate_cache(cache, path);
    invalidate_cache(cache, &target);

    Ok(target)
}
