//! File deletion with cache invalidation.
//!
//! # Overview
//!
//! [`delete_file`] removes one image, either permanently or by moving it to
//! the system trash, and then drops its hash cache entry so that a new file
//! later created at the same path is never matched against the old digest.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::actions::{delete_file, DeleteMode};
//! use std::path::Path;
//!
//! match delete_file(Path::new("/photos/copy.jpg"), DeleteMode::Trash, None) {
//!     Ok(result) => println!("Deleted: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::{invalidate_cache, regular_file_size, FileOpError};
use crate::cache::HashCache;
use crate::scanner::absolute_path;

/// How a file is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Remove the file immediately.
    #[default]
    Permanent,
    /// Move the file to the system trash (recoverable).
    Trash,
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// How the file was removed.
    pub mode: DeleteMode,
}

/// Delete a single file and invalidate its cache entry.
///
/// The cache is only touched after the file is gone. A cache failure at
/// that point is logged, not returned, since the deletion itself succeeded.
/// A relative `path` is resolved against the current directory first, and
/// the returned [`DeleteResult::path`] is that absolute form.
///
/// # Errors
///
/// - [`FileOpError::NotFound`] if the file doesn't exist
/// - [`FileOpError::NotAFile`] if the path is a directory
/// - [`FileOpError::PermissionDenied`] if deletion is not allowed
/// - [`FileOpError::TrashFailed`] if the trash operation fails
/// - [`FileOpError::Io`] for other failures
pub fn delete_file(
    path: &Path,
    mode: DeleteMode,
    cache: Option<&HashCache>,
) -> Result<DeleteResult, FileOpError> {
    let absolute = absolute_path(path);
    let path = absolute.as_path();
    let size = regular_file_size(path)?;

    match mode {
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                FileOpError::from_io(path, e)
            })?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
        }
        DeleteMode::Trash => {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                FileOpError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        }
    }

    invalidate_cache(cache, path);

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        mode,
    })
}
