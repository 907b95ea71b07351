//! Duplicate grouping by content digest.
//!
//! # Overview
//!
//! [`group`] consumes hashing outcomes, buckets the successful ones by
//! digest, discards buckets with a single member and returns a sorted
//! [`GroupedResult`]. Failed files never take part in grouping; they come
//! back separately as [`HashFailure`]s.
//!
//! Arrival order carries no meaning: members are ordered by their scan
//! position (`seq`), and groups are sorted by descending member count, then
//! case-insensitive representative name, then digest. Two runs over the
//! same files therefore produce identical results.
//!
//! # Example
//!
//! ```
//! use picdupe::duplicates::group_pairs;
//! use picdupe::scanner::FileDescriptor;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let fd = |p: &str| FileDescriptor::new(PathBuf::from(p), 1024, SystemTime::UNIX_EPOCH);
//! let result = group_pairs(vec![
//!     (fd("/a.jpg"), "aa".to_string()),
//!     (fd("/b.jpg"), "aa".to_string()),
//!     (fd("/c.jpg"), "cc".to_string()),
//! ]);
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result.stats().wasted_bytes, 1024);
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::coordinator::HashOutcome;
use crate::scanner::{FileDescriptor, HashError, HashErrorKind};

/// Two or more files sharing one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Lowercase hex digest shared by every member
    pub digest: String,
    /// File size in bytes (identical content implies identical size)
    pub size: u64,
    /// Members in scan order
    pub files: Vec<FileDescriptor>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(digest: String, size: u64, files: Vec<FileDescriptor>) -> Self {
        Self {
            digest,
            size,
            files,
        }
    }

    /// Representative display name: the first member's file name.
    #[must_use]
    pub fn name(&self) -> String {
        self.files
            .first()
            .map(FileDescriptor::file_name)
            .unwrap_or_default()
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes held by copies beyond the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (all files minus one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Whether `path` is a member of this group.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Member paths in order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Aggregate statistics over a set of duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Number of duplicate groups
    pub group_count: usize,
    /// Duplicate copies across all groups (members minus one, summed)
    pub duplicate_files: usize,
    /// Bytes held by duplicate copies
    pub wasted_bytes: u64,
}

impl GroupStats {
    /// Sum statistics over `groups`.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        Self {
            group_count: groups.len(),
            duplicate_files: groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            wasted_bytes: groups.iter().map(DuplicateGroup::wasted_space).sum(),
        }
    }
}

/// Sorted duplicate groups plus their statistics.
///
/// Built by [`group`] or [`group_pairs`] and mutated only through
/// [`GroupedResult::remove_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedResult {
    pub(crate) groups: Vec<DuplicateGroup>,
    pub(crate) stats: GroupStats,
}

impl GroupedResult {
    /// Sort `groups` and compute statistics.
    ///
    /// Groups with fewer than two members are dropped.
    #[must_use]
    pub fn from_groups(groups: Vec<DuplicateGroup>) -> Self {
        let mut groups: Vec<DuplicateGroup> = groups.into_iter().filter(|g| g.len() > 1).collect();
        sort_groups(&mut groups);
        let stats = GroupStats::from_groups(&groups);
        Self { groups, stats }
    }

    /// Groups in display order.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> GroupStats {
        self.stats
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The group containing `path`, if any.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.contains(path))
    }

    /// Consume the result, returning the groups.
    #[must_use]
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        self.groups
    }

    pub(crate) fn refresh(&mut self) {
        sort_groups(&mut self.groups);
        self.stats = GroupStats::from_groups(&self.groups);
    }
}

pub(crate) fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by_cached_key(|g| (Reverse(g.len()), g.name().to_lowercase(), g.digest.clone()));
}

/// A file that could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFailure {
    /// Path of the file
    pub path: PathBuf,
    /// Failure class
    pub kind: HashErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&HashError> for HashFailure {
    fn from(err: &HashError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Output of [`group`]: the grouped result and the files that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    /// Duplicate groups and statistics
    pub result: GroupedResult,
    /// Files excluded because they could not be hashed, sorted by path
    pub failures: Vec<HashFailure>,
}

impl Grouping {
    /// One-line failure summary, e.g.
    /// `3 files could not be hashed: 2 permission denied, 1 not found`.
    ///
    /// `None` when every file hashed.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        summarize_failures(&self.failures)
    }
}

/// Format a failure list as a single summary line.
#[must_use]
pub fn summarize_failures(failures: &[HashFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let mut by_kind: BTreeMap<HashErrorKind, usize> = BTreeMap::new();
    for failure in failures {
        *by_kind.entry(failure.kind).or_default() += 1;
    }
    let mut counts: Vec<(HashErrorKind, usize)> = by_kind.into_iter().collect();
    counts.sort_by_key(|&(kind, n)| (Reverse(n), kind));

    let detail = counts
        .iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if failures.len() == 1 { "file" } else { "files" };

    Some(format!(
        "{} {} could not be hashed: {}",
        failures.len(),
        noun,
        detail
    ))
}

fn build(buckets: HashMap<String, Vec<(usize, FileDescriptor)>>) -> GroupedResult {
    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(digest, mut members)| {
            members.sort_by_key(|(seq, _)| *seq);
            let files: Vec<FileDescriptor> = members.into_iter().map(|(_, fd)| fd).collect();
            let size = files.first().map_or(0, |f| f.size);
            log::debug!(
                "Duplicate group {}: {} files, {} bytes each",
                digest,
                files.len(),
                size
            );
            DuplicateGroup::new(digest, size, files)
        })
        .collect();

    GroupedResult::from_groups(groups)
}

/// Group hashing outcomes by digest.
///
/// Successful outcomes are bucketed; failures are returned separately,
/// sorted by path.
pub fn group<I>(outcomes: I) -> Grouping
where
    I: IntoIterator<Item = HashOutcome>,
{
    let mut buckets: HashMap<String, Vec<(usize, FileDescriptor)>> = HashMap::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(digest) => buckets
                .entry(digest)
                .or_default()
                .push((outcome.seq, outcome.descriptor)),
            Err(e) => failures.push(HashFailure::from(&e)),
        }
    }

    failures.sort_by(|a, b| a.path.cmp(&b.path));
    let result = build(buckets);

    log::info!(
        "Grouping complete: {} groups, {} duplicate files, {} bytes wasted, {} failures",
        result.stats.group_count,
        result.stats.duplicate_files,
        result.stats.wasted_bytes,
        failures.len()
    );

    Grouping { result, failures }
}

/// Group plain `(descriptor, digest)` pairs; input order is scan order.
pub fn group_pairs<I>(pairs: I) -> GroupedResult
where
    I: IntoIterator<Item = (FileDescriptor, String)>,
{
    let mut buckets: HashMap<String, Vec<(usize, FileDescriptor)>> = HashMap::new();
    for (seq, (descriptor, digest)) in pairs.into_iter().enumerate() {
        buckets.entry(digest).or_default().push((seq, descriptor));
    }
    build(buckets)
}
