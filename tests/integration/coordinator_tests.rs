use picdupe::cache::HashCache;
use picdupe::duplicates::{group, hash_all, CoordinatorConfig};
use picdupe::progress::ProgressCallback;
use picdupe::scanner::{FileDescriptor, HashAlgorithm};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn make_files(dir: &TempDir, count: usize) -> Vec<FileDescriptor> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("img_{i:03}.jpg"));
            fs::write(&path, format!("content {i}")).unwrap();
            FileDescriptor::from_path(&path).unwrap()
        })
        .collect()
}

/// Raises the shutdown flag once `after` files have completed.
struct CancelAfter {
    after: usize,
    flag: Arc<AtomicBool>,
}

impl ProgressCallback for CancelAfter {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, completed: usize, _total: usize) {
        if completed >= self.after {
            self.flag.store(true, Ordering::SeqCst);
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_cancelled_run_caches_exactly_what_it_returns() {
    let dir = tempdir().unwrap();
    let files = make_files(&dir, 50);
    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let flag = Arc::new(AtomicBool::new(false));

    let config = CoordinatorConfig::default()
        .with_workers(1)
        .with_cache(cache.clone())
        .with_shutdown_flag(flag.clone())
        .with_progress_interval(Duration::ZERO)
        .with_progress_callback(Arc::new(CancelAfter {
            after: 5,
            flag: flag.clone(),
        }));

    let (outcomes, stats) = hash_all(files, config).unwrap().into_results();

    assert!(stats.cancelled);
    assert!(outcomes.len() >= 5);
    assert!(outcomes.len() < 50);
    assert_eq!(stats.completed() + stats.skipped, 50);
    assert_eq!(cache.entry_count().unwrap(), outcomes.len());
    for outcome in &outcomes {
        let entry = cache.get_entry(&outcome.descriptor.path).unwrap().unwrap();
        assert_eq!(Some(entry.digest.as_str()), outcome.digest());
    }
}

#[test]
fn test_explicit_cancel_keeps_results_consistent() {
    let dir = tempdir().unwrap();
    let files = make_files(&dir, 40);
    let cache = Arc::new(HashCache::open_in_memory().unwrap());

    let mut stream = hash_all(
        files,
        CoordinatorConfig::default()
            .with_workers(2)
            .with_cache(cache.clone()),
    )
    .unwrap();

    let mut seen = Vec::new();
    seen.extend(stream.by_ref().take(3));
    stream.cancel();
    assert!(stream.is_cancel_requested());
    seen.extend(stream.by_ref());

    let stats = stream.stats();
    assert_eq!(seen.len(), stats.completed());
    assert_eq!(cache.entry_count().unwrap(), seen.len());

    let unique: HashSet<usize> = seen.iter().map(|o| o.seq).collect();
    assert_eq!(unique.len(), seen.len());
}

#[test]
fn test_algorithm_switch_recomputes() {
    let dir = tempdir().unwrap();
    let files = make_files(&dir, 4);
    let cache = Arc::new(HashCache::open_in_memory().unwrap());

    let md5 = CoordinatorConfig::default().with_cache(cache.clone());
    let (md5_out, _) = hash_all(files.clone(), md5).unwrap().into_results();
    assert!(md5_out.iter().all(|o| o.digest().unwrap().len() == 32));

    let sha = CoordinatorConfig::default()
        .with_algorithm(HashAlgorithm::Sha256)
        .with_cache(cache.clone());
    let (sha_out, stats) = hash_all(files, sha).unwrap().into_results();

    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.computed, 4);
    assert!(sha_out.iter().all(|o| o.digest().unwrap().len() == 64));
}

#[test]
fn test_worker_count_does_not_change_results() {
    let dir = tempdir().unwrap();
    let files = make_files(&dir, 30);

    let mut by_worker_count = Vec::new();
    for workers in [1, 3, 8] {
        let (mut outcomes, _) = hash_all(
            files.clone(),
            CoordinatorConfig::default().with_workers(workers),
        )
        .unwrap()
        .into_results();
        outcomes.sort_by_key(|o| o.seq);
        let digests: Vec<String> = outcomes
            .iter()
            .map(|o| o.digest().unwrap().to_string())
            .collect();
        by_worker_count.push(digests);
    }

    assert_eq!(by_worker_count[0], by_worker_count[1]);
    assert_eq!(by_worker_count[1], by_worker_count[2]);
}

#[test]
fn test_empty_batch() {
    let (outcomes, stats) = hash_all(Vec::new(), CoordinatorConfig::default())
        .unwrap()
        .into_results();
    assert!(outcomes.is_empty());
    assert_eq!(stats.total, 0);
    assert!(!stats.cancelled);
}

#[test]
fn test_broken_cache_degrades_to_hashing_everything() {
    let dir = tempdir().unwrap();
    let mut files = Vec::new();
    for (name, content) in [
        ("a.jpg", "pair one"),
        ("b.jpg", "pair one"),
        ("c.jpg", "pair two"),
        ("d.jpg", "pair two"),
        ("e.jpg", "single"),
        ("f.jpg", "another single"),
    ] {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        files.push(FileDescriptor::from_path(&path).unwrap());
    }

    let db = dir.path().join("cache.db");
    let cache = Arc::new(HashCache::new(&db).unwrap());
    rusqlite::Connection::open(&db)
        .unwrap()
        .execute_batch("DROP TABLE file_hashes;")
        .unwrap();

    let config = CoordinatorConfig::default()
        .with_workers(2)
        .with_cache(cache.clone());
    let (outcomes, stats) = hash_all(files, config).unwrap().into_results();

    assert_eq!(outcomes.len(), 6);
    assert!(stats.cache_degraded);
    assert!(!stats.cancelled);
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.computed, 6);
    assert_eq!(stats.failed, 0);

    let grouping = group(outcomes);
    assert!(grouping.failures.is_empty());
    assert_eq!(grouping.result.len(), 2);
    assert_eq!(grouping.result.stats().duplicate_files, 2);
}
