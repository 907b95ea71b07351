//! Hash caching module for picdupe.
//!
//! This module provides persistent storage for file digests so that repeat
//! scans skip re-reading unchanged files.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence, schema versioning and maintenance.
//! * [`entry`]: The stored record and its validation logic.
//!
//! # Cache Invalidation
//!
//! An entry is trusted only when all of these match the scanned file:
//! * File path (primary key)
//! * File size
//! * Modification time (nanoseconds)
//! * Hash algorithm
//!
//! Any difference is a miss; the next `store` overwrites the row. Files the
//! application deletes or renames are removed explicitly with
//! [`HashCache::invalidate`]. Rows for files removed behind our back are
//! never queried again and can be dropped with [`HashCache::purge_missing`].

pub mod database;
pub mod entry;

pub use database::{CacheError, CacheResult, HashCache, CACHE_FILE_NAME, SCHEMA_VERSION};
pub use entry::CacheEntry;
