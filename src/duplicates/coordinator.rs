//! Parallel hash coordinator.
//!
//! # Overview
//!
//! [`hash_all`] fans a batch of [`FileDescriptor`]s out over a bounded rayon
//! pool. For each file the worker consults the [`HashCache`]; on a hit the
//! cached digest is yielded without reading the file, on a miss the content
//! is hashed and stored before it is yielded.
//!
//! Work runs on a background driver thread and results arrive over a
//! channel, so the returned [`HashStream`] is consumed lazily as an
//! iterator. Completion order is arbitrary; every [`HashOutcome`] carries
//! the input position (`seq`) so later stages can restore scan order.
//!
//! # Cancellation
//!
//! Cancellation is cooperative and checked before each file. Hashes already
//! in flight complete and are yielded; nothing new starts afterwards. The
//! cache only ever receives complete entries.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::{hash_all, CoordinatorConfig};
//! use picdupe::scanner::{HashAlgorithm, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/photos"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//!
//! let config = CoordinatorConfig::default().with_algorithm(HashAlgorithm::Sha256);
//! let stream = hash_all(files, config).unwrap();
//! for outcome in stream {
//!     println!("{}: {:?}", outcome.descriptor.path.display(), outcome.result);
//! }
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::cache::HashCache;
use crate::progress::{ProgressCallback, PHASE_HASH};
use crate::scanner::{compute_digest, FileDescriptor, HashAlgorithm, HashError};

/// Upper bound on hashing workers, to avoid disk thrashing on spinning or
/// network storage.
pub const MAX_WORKERS: usize = 8;

/// Default minimum spacing between progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Default worker count: available cores, capped at [`MAX_WORKERS`].
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(MAX_WORKERS)
}

/// Configuration for a hashing run.
#[derive(Clone)]
pub struct CoordinatorConfig {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Size of the worker pool (at least 1).
    pub max_workers: usize,
    /// Optional hash cache for faster rescans.
    pub cache: Option<Arc<HashCache>>,
    /// Optional external cancellation flag (e.g. Ctrl+C).
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Minimum spacing between progress notifications.
    pub progress_interval: Duration,
}

impl std::fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("algorithm", &self.algorithm)
            .field("max_workers", &self.max_workers)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            max_workers: default_worker_count(),
            cache: None,
            shutdown_flag: None,
            progress_callback: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl CoordinatorConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the worker count (clamped to at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Set the hash cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the minimum spacing between progress notifications.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Result of hashing one file.
#[derive(Debug, Clone)]
pub struct HashOutcome {
    /// Position of the descriptor in the input batch.
    pub seq: usize,
    /// The file that was hashed.
    pub descriptor: FileDescriptor,
    /// Lowercase hex digest, or the per-file failure.
    pub result: Result<String, HashError>,
    /// Whether the digest was served from the cache.
    pub from_cache: bool,
}

impl HashOutcome {
    /// The digest, if hashing succeeded.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Statistics for one hashing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashStats {
    /// Files submitted.
    pub total: usize,
    /// Digests served from the cache.
    pub cache_hits: usize,
    /// Content hasher invocations (successful or not).
    pub computed: usize,
    /// Files that failed to hash.
    pub failed: usize,
    /// Files never started because of cancellation.
    pub skipped: usize,
    /// Whether the run stopped early.
    pub cancelled: bool,
    /// Whether the cache failed and the run continued without it.
    pub cache_degraded: bool,
}

impl HashStats {
    /// Number of outcomes produced (hits plus computations).
    #[must_use]
    pub fn completed(&self) -> usize {
        self.cache_hits + self.computed
    }
}

/// Errors that prevent a hashing run from starting.
#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    /// The background driver thread could not be spawned.
    #[error("Failed to start hashing thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Default)]
struct SharedStats {
    cache_hits: AtomicUsize,
    computed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    completed: AtomicUsize,
    cache_degraded: AtomicBool,
}

/// Rate limiter for progress notifications.
///
/// Uses `try_lock` so workers never wait on each other just to report.
struct ProgressThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl ProgressThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    fn should_emit(&self) -> bool {
        let Ok(mut last) = self.last.try_lock() else {
            return false;
        };
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

struct Worker {
    algorithm: HashAlgorithm,
    cache: Option<Arc<HashCache>>,
    cancel: Arc<AtomicBool>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    throttle: ProgressThrottle,
    stats: Arc<SharedStats>,
    total: usize,
}

impl Worker {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
            || self
                .shutdown_flag
                .as_ref()
                .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn active_cache(&self) -> Option<&HashCache> {
        if self.stats.cache_degraded.load(Ordering::SeqCst) {
            return None;
        }
        self.cache.as_deref()
    }

    fn degrade(&self, err: &crate::cache::CacheError) {
        if !self.stats.cache_degraded.swap(true, Ordering::SeqCst) {
            log::warn!(
                "Hash cache unavailable ({}); continuing without caching for this run",
                err
            );
        }
    }

    fn lookup(&self, descriptor: &FileDescriptor) -> Option<String> {
        let cache = self.active_cache()?;
        match cache.lookup(descriptor, self.algorithm) {
            Ok(Some(digest)) => {
                log::trace!("Cache hit: {}", descriptor.path.display());
                Some(digest)
            }
            Ok(None) => {
                log::trace!("Cache miss: {}", descriptor.path.display());
                None
            }
            Err(e) => {
                self.degrade(&e);
                None
            }
        }
    }

    fn remember(&self, descriptor: &FileDescriptor, digest: &str) {
        if let Some(cache) = self.active_cache() {
            if let Err(e) = cache.store(descriptor, digest, self.algorithm) {
                self.degrade(&e);
            }
        }
    }

    fn process(&self, seq: usize, descriptor: FileDescriptor) -> Option<HashOutcome> {
        if self.is_cancelled() {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let outcome = if let Some(digest) = self.lookup(&descriptor) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            HashOutcome {
                seq,
                descriptor,
                result: Ok(digest),
                from_cache: true,
            }
        } else {
            self.stats.computed.fetch_add(1, Ordering::Relaxed);
            let result = compute_digest(&descriptor.path, self.algorithm);
            match &result {
                Ok(digest) => self.remember(&descriptor, digest),
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("Failed to hash {}: {}", descriptor.path.display(), e);
                }
            }
            HashOutcome {
                seq,
                descriptor,
                result,
                from_cache: false,
            }
        };

        let completed = self.stats.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = self.progress_callback {
            if self.throttle.should_emit() {
                callback.on_progress(completed, self.total);
            }
        }

        Some(outcome)
    }

    fn run(&self, files: Vec<FileDescriptor>, workers: usize, tx: Sender<HashOutcome>) {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("picdupe-hash-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                files
                    .into_par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (seq, fd)| {
                        if let Some(outcome) = self.process(seq, fd) {
                            // The receiver may be gone if the caller stopped early.
                            let _ = tx.send(outcome);
                        }
                    });
            }),
            Err(e) => {
                log::warn!("Failed to create hashing thread pool ({}), hashing sequentially", e);
                for (seq, fd) in files.into_iter().enumerate() {
                    if let Some(outcome) = self.process(seq, fd) {
                        let _ = tx.send(outcome);
                    }
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(self.stats.completed.load(Ordering::Relaxed), self.total);
            callback.on_phase_end(PHASE_HASH);
        }

        log::info!(
            "Hashing complete: {} files, {} cache hits, {} computed, {} failed, {} skipped",
            self.total,
            self.stats.cache_hits.load(Ordering::Relaxed),
            self.stats.computed.load(Ordering::Relaxed),
            self.stats.failed.load(Ordering::Relaxed),
            self.stats.skipped.load(Ordering::Relaxed)
        );
    }
}

/// Lazy stream of [`HashOutcome`]s from a running batch.
///
/// Dropping the stream before it is exhausted cancels the remaining work
/// and waits for in-flight files to finish.
pub struct HashStream {
    receiver: Receiver<HashOutcome>,
    cancel: Arc<AtomicBool>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    stats: Arc<SharedStats>,
    driver: Option<JoinHandle<()>>,
    total: usize,
}

impl std::fmt::Debug for HashStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashStream")
            .field("total", &self.total)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl HashStream {
    /// Stop dispatching new files. Results already in flight still arrive.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Number of files in the batch.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Snapshot of the run statistics.
    ///
    /// Final once the iterator has returned `None`.
    #[must_use]
    pub fn stats(&self) -> HashStats {
        let skipped = self.stats.skipped.load(Ordering::SeqCst);
        HashStats {
            total: self.total,
            cache_hits: self.stats.cache_hits.load(Ordering::SeqCst),
            computed: self.stats.computed.load(Ordering::SeqCst),
            failed: self.stats.failed.load(Ordering::SeqCst),
            skipped,
            cancelled: skipped > 0,
            cache_degraded: self.stats.cache_degraded.load(Ordering::SeqCst),
        }
    }

    /// Whether cancellation was requested, by [`HashStream::cancel`] or the
    /// external shutdown flag.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
            || self
                .shutdown_flag
                .as_ref()
                .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Drain the stream, returning every outcome and the final statistics.
    #[must_use]
    pub fn into_results(mut self) -> (Vec<HashOutcome>, HashStats) {
        let outcomes: Vec<HashOutcome> = self.by_ref().collect();
        self.join();
        let stats = self.stats();
        (outcomes, stats)
    }

    fn join(&mut self) {
        if let Some(handle) = self.driver.take() {
            if handle.join().is_err() {
                log::error!("Hashing driver thread panicked");
            }
        }
    }
}

impl Iterator for HashStream {
    type Item = HashOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        match self.receiver.recv() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                self.join();
                None
            }
        }
    }
}

impl Drop for HashStream {
    fn drop(&mut self) {
        if self.driver.is_some() {
            self.cancel();
            while self.receiver.recv().is_ok() {}
            self.join();
        }
    }
}

/// Hash every descriptor, consulting and updating the cache.
///
/// Returns immediately; outcomes arrive through the returned
/// [`HashStream`] as files complete.
///
/// # Errors
///
/// Returns [`CoordinatorError::Spawn`] if the driver thread cannot start.
pub fn hash_all<I>(descriptors: I, config: CoordinatorConfig) -> Result<HashStream, CoordinatorError>
where
    I: IntoIterator<Item = FileDescriptor>,
{
    let files: Vec<FileDescriptor> = descriptors.into_iter().collect();
    let total = files.len();
    let workers = config.max_workers.max(1);

    log::info!(
        "Hashing {} files with {} ({} workers, cache {})",
        total,
        config.algorithm,
        workers,
        if config.cache.is_some() { "on" } else { "off" }
    );

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(PHASE_HASH, total);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(SharedStats::default());
    let (tx, rx) = mpsc::channel();

    let worker = Worker {
        algorithm: config.algorithm,
        cache: config.cache,
        cancel: Arc::clone(&cancel),
        shutdown_flag: config.shutdown_flag.clone(),
        progress_callback: config.progress_callback,
        throttle: ProgressThrottle::new(config.progress_interval),
        stats: Arc::clone(&stats),
        total,
    };

    let driver = std::thread::Builder::new()
        .name("picdupe-hash-driver".to_string())
        .spawn(move || worker.run(files, workers, tx))
        .map_err(CoordinatorError::Spawn)?;

    Ok(HashStream {
        receiver: rx,
        cancel,
        shutdown_flag: config.shutdown_flag,
        stats,
        driver: Some(driver),
        total,
    })
}
