use filetime::{set_file_mtime, FileTime};
use picdupe::cache::{HashCache, SCHEMA_VERSION};
use picdupe::duplicates::{hash_all, CoordinatorConfig};
use picdupe::scanner::{compute_digest, FileDescriptor, HashAlgorithm};
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::{tempdir, NamedTempFile};

fn hash_once(cache: &Arc<HashCache>, descriptor: &FileDescriptor) -> (String, bool) {
    let config = CoordinatorConfig::default().with_cache(Arc::clone(cache));
    let (outcomes, _) = hash_all(vec![descriptor.clone()], config)
        .unwrap()
        .into_results();
    let outcome = outcomes.into_iter().next().unwrap();
    (outcome.digest().unwrap().to_string(), outcome.from_cache)
}

#[test]
fn test_changed_content_with_new_mtime_is_rehashed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    fs::write(&path, b"original pixels!").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let before = FileDescriptor::from_path(&path).unwrap();
    let (first, from_cache) = hash_once(&cache, &before);
    assert!(!from_cache);

    // Same size, different bytes, later mtime.
    fs::write(&path, b"modified pixels!").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let after = FileDescriptor::from_path(&path).unwrap();
    assert_eq!(before.size, after.size);
    let (second, from_cache) = hash_once(&cache, &after);

    assert!(!from_cache);
    assert_ne!(first, second);
    assert_eq!(second, compute_digest(&path, HashAlgorithm::Md5).unwrap());
}

#[test]
fn test_unchanged_file_is_a_hit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"pixels").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_650_000_000, 123_000_000)).unwrap();

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let descriptor = FileDescriptor::from_path(&path).unwrap();
    let (first, _) = hash_once(&cache, &descriptor);

    let (second, from_cache) = hash_once(&cache, &FileDescriptor::from_path(&path).unwrap());
    assert!(from_cache);
    assert_eq!(first, second);
}

#[test]
fn test_lookup_only_hits_on_exact_metadata() {
    let cache = HashCache::open_in_memory().unwrap();
    let at = UNIX_EPOCH + Duration::from_secs(1_650_000_000);
    let fd = FileDescriptor::new("/photos/a.jpg".into(), 10, at);
    cache.store(&fd, "abc", HashAlgorithm::Md5).unwrap();

    assert_eq!(
        cache.lookup(&fd, HashAlgorithm::Md5).unwrap().as_deref(),
        Some("abc")
    );

    let resized = FileDescriptor::new(fd.path.clone(), 11, at);
    assert!(cache.lookup(&resized, HashAlgorithm::Md5).unwrap().is_none());

    let touched = FileDescriptor::new(fd.path.clone(), 10, at + Duration::from_nanos(1));
    assert!(cache.lookup(&touched, HashAlgorithm::Md5).unwrap().is_none());

    assert!(cache.lookup(&fd, HashAlgorithm::Sha256).unwrap().is_none());
}

#[test]
fn test_open_corrupted_database() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"this is not a sqlite database at all, just text").unwrap();
    temp_file.flush().unwrap();

    assert!(HashCache::new(temp_file.path()).is_err());
}

#[test]
fn test_recreate_after_removing_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    fs::write(&path, b"garbage garbage garbage garbage").unwrap();
    assert!(HashCache::new(&path).is_err());

    fs::remove_file(&path).unwrap();
    let cache = HashCache::new(&path).unwrap();
    assert_eq!(cache.entry_count().unwrap(), 0);
}

#[test]
fn test_schema_version_is_recorded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    drop(HashCache::new(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn test_purge_removes_deleted_files_only() {
    let dir = tempdir().unwrap();
    let keep = dir.path().join("keep.jpg");
    let gone = dir.path().join("gone.jpg");
    fs::write(&keep, b"k").unwrap();
    fs::write(&gone, b"g").unwrap();

    let cache = HashCache::new(&dir.path().join("cache.db")).unwrap();
    for path in [&keep, &gone] {
        let fd = FileDescriptor::from_path(path).unwrap();
        cache.store(&fd, "d", HashAlgorithm::Md5).unwrap();
    }
    fs::remove_file(&gone).unwrap();

    assert_eq!(cache.purge_missing().unwrap(), 1);
    assert_eq!(cache.entry_count().unwrap(), 1);
    assert!(cache.get_entry(&keep).unwrap().is_some());
    assert!(cache.get_entry(&gone).unwrap().is_none());
}

#[test]
fn test_cache_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("cache.db");

    let cache = HashCache::new(&path).unwrap();
    assert_eq!(cache.path(), Some(path.as_path()));
    assert!(path.exists());
}
