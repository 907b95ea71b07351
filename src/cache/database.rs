//! SQLite-backed hash cache database.
//!
//! One row per absolute path. Paths that are not valid UTF-8 are never
//! cached: lookups miss, stores are skipped and invalidations are no-ops.
//! Every operation runs on a single
//! [`Connection`] behind a [`Mutex`], so hashing workers share the cache
//! through one writer and each write is a single atomic statement.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use super::entry::{system_time_to_nanos, CacheEntry};
use crate::scanner::{FileDescriptor, HashAlgorithm};

/// Current on-disk schema version, stored in `PRAGMA user_version`.
///
/// A database carrying any other version is dropped and recreated.
pub const SCHEMA_VERSION: i64 = 1;

/// File name of the default cache database.
pub const CACHE_FILE_NAME: &str = "hash_cache.db";

/// Errors raised by the hash cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// SQLite reported an error (corrupt file, disk full, locked, ...).
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The cache directory could not be created.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Directory or file involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No per-user cache directory could be determined.
    #[error("Could not determine a cache directory for this user")]
    NoCacheDir,

    /// A thread panicked while holding the connection lock.
    #[error("Cache connection lock was poisoned")]
    Poisoned,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent cache for file hashes using SQLite.
pub struct HashCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl fmt::Debug for HashCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl HashCache {
    /// Opens or creates a hash cache at the specified path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file is
    /// not a usable SQLite database.
    pub fn new(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let cache = Self::from_connection(conn, Some(path.to_path_buf()))?;
        log::debug!("Opened hash cache at {}", path.display());
        Ok(cache)
    }

    /// Opens the cache at [`HashCache::default_path`].
    ///
    /// # Errors
    ///
    /// See [`HashCache::new`] and [`HashCache::default_path`].
    pub fn open_default() -> CacheResult<Self> {
        Self::new(&Self::default_path()?)
    }

    /// Opens a throwaway cache that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    /// Platform cache location: `<user cache dir>/picdupe/hash_cache.db`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] when no home directory is known.
    pub fn default_path() -> CacheResult<PathBuf> {
        ProjectDirs::from("com", "picdupe", "picdupe")
            .map(|dirs| dirs.cache_dir().join(CACHE_FILE_NAME))
            .ok_or(CacheError::NoCacheDir)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> CacheResult<Self> {
        configure_pragmas(&conn, path.is_some())?;
        migrate_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn conn(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Backing file, or `None` for an in-memory cache.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cached digest for `descriptor`, if a fresh entry exists.
    ///
    /// Returns `None` when there is no row for the path or when its size,
    /// modification time or algorithm differ from the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn lookup(
        &self,
        descriptor: &FileDescriptor,
        algorithm: HashAlgorithm,
    ) -> CacheResult<Option<String>> {
        Ok(self
            .get_entry(&descriptor.path)?
            .filter(|entry| entry.matches(descriptor, algorithm))
            .map(|entry| entry.digest))
    }

    /// Raw entry stored for `path`, stale or not.
    ///
    /// Rows with an unknown algorithm identifier are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_entry(&self, path: &Path) -> CacheResult<Option<CacheEntry>> {
        let Some(key) = path_key(path) else {
            return Ok(None);
        };
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT path, size, modified_ns, digest, algorithm FROM file_hashes WHERE path = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((stored_path, size, modified_ns, digest, algorithm)) = row else {
            return Ok(None);
        };

        let Ok(algorithm) = algorithm.parse::<HashAlgorithm>() else {
            log::debug!(
                "Ignoring cache row for {} with unknown algorithm '{}'",
                path.display(),
                algorithm
            );
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            path: PathBuf::from(stored_path),
            size: u64::try_from(size).unwrap_or_default(),
            modified_ns,
            digest,
            algorithm,
        }))
    }

    /// Record `digest` for `descriptor`, replacing any previous row.
    ///
    /// Does nothing for a path that is not valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn store(
        &self,
        descriptor: &FileDescriptor,
        digest: &str,
        algorithm: HashAlgorithm,
    ) -> CacheResult<()> {
        let Some(key) = path_key(&descriptor.path) else {
            log::trace!("Not caching non-UTF-8 path {}", descriptor.path.display());
            return Ok(());
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO file_hashes (path, size, modified_ns, digest, algorithm)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                i64::try_from(descriptor.size).unwrap_or(i64::MAX),
                system_time_to_nanos(descriptor.modified),
                digest,
                algorithm.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Remove the entry for `path`. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn invalidate(&self, path: &Path) -> CacheResult<bool> {
        let Some(key) = path_key(path) else {
            return Ok(false);
        };
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM file_hashes WHERE path = ?1", params![key])?;
        if removed > 0 {
            log::trace!("Invalidated cache entry for {}", path.display());
        }
        Ok(removed > 0)
    }

    /// Number of rows in the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn entry_count(&self) -> CacheResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM file_hashes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Delete rows whose file no longer exists. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read or written.
    pub fn purge_missing(&self) -> CacheResult<usize> {
        let mut conn = self.conn()?;

        let paths: Vec<String> = {
            let mut stmt = conn.prepare("SELECT path FROM file_hashes")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let missing: Vec<&String> = paths.iter().filter(|p| !Path::new(p).exists()).collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM file_hashes WHERE path = ?1")?;
            for path in &missing {
                stmt.execute(params![path])?;
            }
        }
        tx.commit()?;

        log::info!("Purged {} stale cache entries", missing.len());
        Ok(missing.len())
    }

    /// Delete every row. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> CacheResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM file_hashes", [])?;
        log::debug!("Cleared {} cache entries", removed);
        Ok(removed)
    }
}

/// Row key for `path`, or `None` if it has no exact UTF-8 form.
fn path_key(path: &Path) -> Option<&str> {
    path.to_str()
}

fn configure_pragmas(conn: &Connection, on_disk: bool) -> CacheResult<()> {
    if on_disk {
        // journal_mode returns a row, so it cannot go through execute_batch.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

fn migrate_schema(conn: &Connection) -> CacheResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version != SCHEMA_VERSION {
        log::debug!(
            "Cache schema version {} != {}, recreating table",
            version,
            SCHEMA_VERSION
        );
        conn.execute_batch("DROP TABLE IF EXISTS file_hashes;")?;
    }

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS file_hashes (
             path        TEXT PRIMARY KEY NOT NULL,
             size        INTEGER NOT NULL,
             modified_ns INTEGER NOT NULL,
             digest      TEXT NOT NULL,
             algorithm   TEXT NOT NULL
         );
         PRAGMA user_version = {SCHEMA_VERSION};"
    ))?;
    Ok(())
}
