//! Cache entry definitions.
//!
//! A [`CacheEntry`] is the persisted fingerprint of one file: its path,
//! size, modification time and the digest computed for it. An entry is only
//! trusted for a [`FileDescriptor`] when all identity fields match exactly.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::scanner::{FileDescriptor, HashAlgorithm};

/// Represents a single file entry in the hash cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute path of the file (primary key)
    pub path: PathBuf,
    /// File size in bytes when hashed
    pub size: u64,
    /// Modification time when hashed, nanoseconds since the Unix epoch
    pub modified_ns: i64,
    /// Lowercase hexadecimal digest
    pub digest: String,
    /// Algorithm that produced `digest`
    pub algorithm: HashAlgorithm,
}

impl CacheEntry {
    /// Build the entry that records `digest` for `descriptor`.
    #[must_use]
    pub fn new(descriptor: &FileDescriptor, digest: impl Into<String>, algorithm: HashAlgorithm) -> Self {
        Self {
            path: descriptor.path.clone(),
            size: descriptor.size,
            modified_ns: system_time_to_nanos(descriptor.modified),
            digest: digest.into(),
            algorithm,
        }
    }

    /// Whether this entry is still valid for `descriptor` under `algorithm`.
    ///
    /// Path, size, modification time and algorithm must all be equal.
    #[must_use]
    pub fn matches(&self, descriptor: &FileDescriptor, algorithm: HashAlgorithm) -> bool {
        self.path == descriptor.path
            && self.size == descriptor.size
            && self.modified_ns == system_time_to_nanos(descriptor.modified)
            && self.algorithm == algorithm
    }

    /// Stored modification time as a [`SystemTime`].
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        nanos_to_system_time(self.modified_ns)
    }
}

/// Convert a timestamp to signed nanoseconds since the Unix epoch.
///
/// Saturates at the `i64` range (roughly years 1677 to 2262).
#[must_use]
pub fn system_time_to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}

/// Inverse of [`system_time_to_nanos`].
#[must_use]
pub fn nanos_to_system_time(nanos: i64) -> SystemTime {
    let magnitude = Duration::from_nanos(nanos.unsigned_abs());
    if nanos >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}
