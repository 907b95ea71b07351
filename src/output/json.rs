//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "digest": "9e107d9d372bb6826bd81d3542a419d6",
//!       "name": "a.jpg",
//!       "size": 1024,
//!       "wasted_space": 1024,
//!       "files": ["/photos/a.jpg", "/photos/sub/a.jpg"]
//!     }
//!   ],
//!   "failures": [
//!     { "path": "/photos/locked.jpg", "kind": "permission_denied", "message": "..." }
//!   ],
//!   "summary": {
//!     "group_count": 1,
//!     "duplicate_files": 1,
//!     "wasted_bytes": 1024,
//!     "files_hashed": 12,
//!     "cache_hits": 10,
//!     "computed": 2,
//!     "failed": 1,
//!     "cancelled": false,
//!     "cache_degraded": false,
//!     "exit_code": 3,
//!     "exit_code_name": "PD003"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, Grouping, HashFailure, HashStats};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Lowercase hex digest
    pub digest: String,
    /// Representative file name
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Bytes held by copies beyond the first
    pub wasted_space: u64,
    /// Absolute paths of all members, in scan order
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            digest: group.digest.clone(),
            name: group.name(),
            size: group.size,
            wasted_space: group.wasted_space(),
            files: group
                .files
                .iter()
                .map(|f| normalize_path(f.path.as_path()))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of duplicate groups
    pub group_count: usize,
    /// Duplicate copies across all groups
    pub duplicate_files: usize,
    /// Bytes held by duplicate copies
    pub wasted_bytes: u64,
    /// Files submitted for hashing
    pub files_hashed: usize,
    /// Digests served from the cache
    pub cache_hits: usize,
    /// Digests computed from file content
    pub computed: usize,
    /// Files that could not be hashed
    pub failed: usize,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Whether the cache failed during the run
    pub cache_degraded: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "PD000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Files that could not be hashed
    pub failures: Vec<HashFailure>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create JSON output from a grouping, hashing statistics and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use picdupe::duplicates::{Grouping, HashStats};
    /// use picdupe::error::ExitCode;
    /// use picdupe::output::JsonOutput;
    ///
    /// let output = JsonOutput::new(&Grouping::default(), &HashStats::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(grouping: &Grouping, stats: &HashStats, exit_code: ExitCode) -> Self {
        let group_stats = grouping.result.stats();
        Self {
            duplicates: grouping
                .result
                .groups()
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            failures: grouping.failures.clone(),
            summary: JsonSummary {
                group_count: group_stats.group_count,
                duplicate_files: group_stats.duplicate_files,
                wasted_bytes: group_stats.wasted_bytes,
                files_hashed: stats.total,
                cache_hits: stats.cache_hits,
                computed: stats.computed,
                failed: stats.failed,
                cancelled: stats.cancelled,
                cache_degraded: stats.cache_degraded,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Canonical path string, or the path as given if it no longer exists.
fn normalize_path(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
