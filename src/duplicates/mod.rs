//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Parallel, cache-aware hashing of scanned files ([`coordinator`])
//! - Grouping by digest with wasted-space statistics ([`groups`])
//! - Incremental removal of deleted files from a result ([`update`])
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::{group, hash_all, CoordinatorConfig};
//! use picdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/photos"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//!
//! let stream = hash_all(files, CoordinatorConfig::default()).unwrap();
//! let grouping = group(stream);
//! println!("{} duplicate groups", grouping.result.len());
//! ```

pub mod coordinator;
pub mod groups;
pub mod update;

pub use coordinator::{
    default_worker_count, hash_all, CoordinatorConfig, CoordinatorError, HashOutcome, HashStats,
    HashStream, DEFAULT_PROGRESS_INTERVAL, MAX_WORKERS,
};
pub use groups::{
    group, group_pairs, summarize_failures, DuplicateGroup, GroupStats, GroupedResult, Grouping,
    HashFailure,
};
pub use update::remove_file;
