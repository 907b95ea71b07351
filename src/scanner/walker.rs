//! Directory walker producing image file descriptors.
//!
//! # Overview
//!
//! [`Walker`] traverses a directory (recursively or top level only) using
//! [`jwalk`] and yields a [`FileDescriptor`] for every file with a supported
//! image extension. Per-entry problems are yielded as [`ScanError`] values
//! instead of stopping the walk.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     recursive: false,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/photos"), config);
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} images", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{absolute_path, is_supported_format, FileDescriptor, ScanError, WalkerConfig};

/// Counters collected during a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Regular files visited (any format)
    pub scanned: usize,
    /// Files with a supported image format
    pub found: usize,
}

/// Directory walker for image discovery.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    scanned: AtomicUsize,
    found: AtomicUsize,
}

impl Walker {
    /// Create a new walker for the given root directory.
    ///
    /// A relative root is resolved against the current directory here, so
    /// every descriptor carries an absolute path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: absolute_path(path),
            config,
            shutdown_flag: None,
            scanned: AtomicUsize::new(0),
            found: AtomicUsize::new(0),
        }
    }

    /// The absolute directory being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop yielding entries once `flag` becomes `true`.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// [`ScanError::NotFound`], [`ScanError::NotADirectory`], or the
    /// classified I/O error from reading the root's metadata.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(ScanError::from_io(self.root.clone(), e)),
        }
    }

    /// Counters from the most recent walk.
    #[must_use]
    pub fn stats(&self) -> WalkStats {
        WalkStats {
            scanned: self.scanned.load(Ordering::Relaxed),
            found: self.found.load(Ordering::Relaxed),
        }
    }

    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn should_ignore(&self, path: &Path, gitignore: &Option<Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched_path_or_any_parents(relative, false).is_ignore()
    }

    /// Walk the directory, yielding descriptors in sorted path order.
    ///
    /// The returned iterator is lazy and restartable: calling `walk` again
    /// performs a fresh pass and resets the counters.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileDescriptor, ScanError>> + '_ {
        self.scanned.store(0, Ordering::Relaxed);
        self.found.store(0, Ordering::Relaxed);

        let gitignore = self.build_gitignore();
        let mut walk_dir = WalkDir::new(&self.root)
            .sort(true)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden);
        if !self.config.recursive {
            walk_dir = walk_dir.max_depth(1);
        }

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_dir() {
                        return None;
                    }
                    if entry.file_type().is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    self.process_entry(path, &gitignore)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    let kind = e.io_error().map(std::io::Error::kind);
                    log::debug!("Walk error at {}: {}", path.display(), e);
                    Some(Err(match kind {
                        Some(std::io::ErrorKind::PermissionDenied) => {
                            ScanError::PermissionDenied(path)
                        }
                        Some(std::io::ErrorKind::NotFound) => ScanError::NotFound(path),
                        _ => ScanError::Io {
                            path,
                            source: std::io::Error::new(
                                std::io::ErrorKind::Other,
                                e.to_string(),
                            ),
                        },
                    }))
                }
            }
        })
    }

    fn process_entry(
        &self,
        path: PathBuf,
        gitignore: &Option<Gitignore>,
    ) -> Option<Result<FileDescriptor, ScanError>> {
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return Some(Err(ScanError::from_io(path, e))),
        };
        if !metadata.is_file() {
            return None;
        }

        self.scanned.fetch_add(1, Ordering::Relaxed);

        if !is_supported_format(&path) {
            log::trace!("Skipping unsupported format: {}", path.display());
            return None;
        }
        if self.should_ignore(&path, gitignore) {
            log::trace!("Ignoring file: {}", path.display());
            return None;
        }

        self.found.fetch_add(1, Ordering::Relaxed);
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Ok(FileDescriptor::new(path, metadata.len(), modified)))
    }
}
