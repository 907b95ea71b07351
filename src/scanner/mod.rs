//! Scanner module for image discovery and content hashing.
//!
//! This module provides functionality for:
//! - Directory walking restricted to supported image formats
//! - Content hashing with MD5 or SHA-256 (streaming, 8 KiB chunks)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal producing [`FileDescriptor`]s
//! - [`hasher`]: Chunked content digests
//! - [`formats`]: Supported image extensions
//!
//! # Example
//!
//! ```no_run
//! use picdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/photos"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod formats;
pub mod hasher;
pub mod walker;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use formats::{format_of, is_supported_format, SUPPORTED_FORMATS};
pub use hasher::{compute_digest, digest_bytes, CHUNK_SIZE};
pub use walker::{WalkStats, Walker};

/// A scanned image file.
///
/// Produced by the scanner on every directory pass. The hash cache never
/// owns descriptors; it only stores the (path, size, modified) fingerprint
/// derived from one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Lower-cased extension without the dot (e.g. `jpg`)
    pub format: String,
}

impl FileDescriptor {
    /// Create a new descriptor, deriving the format tag from the extension.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        let format = format_of(&path);
        Self {
            path,
            size,
            modified,
            format,
        }
    }

    /// Build a descriptor from the file's current metadata.
    ///
    /// A relative `path` is resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be stat'ed.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(Self::new(absolute_path(path), metadata.len(), modified))
    }

    /// File name component, used as a group's display name.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Resolve `path` against the current directory without touching symlinks.
///
/// Cache rows are keyed by this form, so `./a.jpg` scanned from two
/// directories never shares a row. Falls back to `path` unchanged when the
/// current directory is unavailable.
#[must_use]
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Digest algorithm used for content hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 (fast, the historical default)
    #[default]
    Md5,
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// Identifier stored in the cache and accepted in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hexadecimal digest produced by this algorithm.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An algorithm identifier that is neither `md5` nor `sha256`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported hash algorithm '{0}' (expected 'md5' or 'sha256')")]
pub struct UnsupportedAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Descend into subdirectories.
    pub recursive: bool,

    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised while visiting `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source: err },
        }
    }
}

/// Coarse classification of a hashing failure, used for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashErrorKind {
    /// The file vanished between scan and hash.
    NotFound,
    /// The file is unreadable.
    PermissionDenied,
    /// The path is a directory or special file.
    NotAFile,
    /// Any other read failure.
    Io,
}

impl fmt::Display for HashErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::NotAFile => "not a regular file",
            Self::Io => "I/O error",
        })
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path does not refer to a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<io::Error>,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(err),
            },
        }
    }

    /// The failure class.
    #[must_use]
    pub fn kind(&self) -> HashErrorKind {
        match self {
            Self::NotFound(_) => HashErrorKind::NotFound,
            Self::PermissionDenied(_) => HashErrorKind::PermissionDenied,
            Self::NotAFile(_) => HashErrorKind::NotAFile,
            Self::Io { .. } => HashErrorKind::Io,
        }
    }

    /// The path that failed to hash.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::NotAFile(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
