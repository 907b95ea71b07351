//! File actions module.
//!
//! This module is the deletion boundary of the pipeline:
//! - [`delete_file`]: permanent deletion or move to the system trash
//! - [`rename_file`]: rename within the same directory
//!
//! Both synchronously invalidate the hash cache for every path they touch,
//! before returning, so a later scan cannot be served a stale digest.
//! Updating an in-memory [`GroupedResult`](crate::duplicates::GroupedResult)
//! is left to the caller via
//! [`GroupedResult::remove_path`](crate::duplicates::GroupedResult::remove_path).
//!
//! ```no_run
//! use picdupe::actions::{rename_file, delete_file, DeleteMode};
//! use picdupe::cache::HashCache;
//! use std::path::Path;
//!
//! let cache = HashCache::open_default().unwrap();
//! rename_file(Path::new("/photos/IMG_1.jpg"), "beach.jpg", Some(&cache)).unwrap();
//! delete_file(Path::new("/photos/copy.jpg"), DeleteMode::Trash, Some(&cache)).unwrap();
//! ```

pub mod delete;
pub mod rename;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::HashCache;

// Re-export commonly used types
pub use delete::{delete_file, DeleteMode, DeleteResult};
pub use rename::{rename_file, validate_new_name, INVALID_NAME_CHARS};

/// Error type for delete and rename operations.
#[derive(Debug, Error)]
pub enum FileOpError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The path is a directory or special file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Permission denied when attempting the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The rename target already exists.
    #[error("a file named '{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// The requested new name is not acceptable.
    #[error("invalid file name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the platform trash implementation
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    /// Classify an I/O error raised while operating on `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Size of `path`, which must be an existing regular file.
fn regular_file_size(path: &Path) -> Result<u64, FileOpError> {
    let metadata = fs::metadata(path).map_err(|e| FileOpError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(FileOpError::NotAFile(path.to_path_buf()));
    }
    Ok(metadata.len())
}

fn invalidate_cache(cache: Option<&HashCache>, path: &Path) {
    let Some(cache) = cache else {
        return;
    };
    if let Err(e) = cache.invalidate(path) {
        log::warn!(
            "Failed to invalidate cache entry for {}: {}",
            path.display(),
            e
        );
    }
}
