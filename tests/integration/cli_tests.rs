use clap::Parser;
use picdupe::cache::HashCache;
use picdupe::cli::Cli;
use picdupe::error::ExitCode;
use picdupe::run_app;
use picdupe::scanner::{FileDescriptor, HashAlgorithm};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::{tempdir, TempDir};

/// A photo directory plus an isolated config file and cache location.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("photos")).unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn photos(&self) -> PathBuf {
        self.dir.path().join("photos")
    }

    fn photo(&self, name: &str) -> PathBuf {
        self.photos().join(name)
    }

    fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.photo(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn cache_path(&self) -> PathBuf {
        self.dir.path().join("state").join("cache.db")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let config = self.config_path();
        let mut argv = vec!["picdupe", "-q", "--config", path_str(&config)];
        argv.extend_from_slice(args);
        run_app(Cli::try_parse_from(argv).unwrap())
    }

    fn scan(&self, extra: &[&str]) -> anyhow::Result<ExitCode> {
        let photos = self.photos();
        let cache = self.cache_path();
        let mut args = vec!["scan", path_str(&photos), "--cache", path_str(&cache)];
        args.extend_from_slice(extra);
        self.run(&args)
    }

    fn open_cache(&self) -> HashCache {
        HashCache::new(&self.cache_path()).unwrap()
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_scan_with_duplicates_exits_success() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");
    ws.write("c.png", b"different");

    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::Success);
    assert_eq!(ws.open_cache().entry_count().unwrap(), 3);
}

#[test]
fn test_scan_without_duplicates_exits_no_duplicates() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"one");
    ws.write("b.jpg", b"two");

    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_unopenable_cache_exits_partial_success() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");

    // The cache's parent directory is a regular file.
    let blocker = ws.dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let cache = blocker.join("cache.db");
    let photos = ws.photos();

    let code = ws
        .run(&["scan", path_str(&photos), "--cache", path_str(&cache)])
        .unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_exits_partial_success() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");
    let locked = ws.write("locked.jpg", b"secret");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to check in that case.
    if fs::read(&locked).is_ok() {
        return;
    }

    let code = ws.scan(&[]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(code.unwrap(), ExitCode::PartialSuccess);
}

#[test]
fn test_clear_cache_drops_old_rows_before_scanning() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");

    let elsewhere = FileDescriptor::new(PathBuf::from("/nowhere/old.jpg"), 3, UNIX_EPOCH);
    {
        let cache = ws.open_cache();
        cache.store(&elsewhere, "stale", HashAlgorithm::Md5).unwrap();
        assert_eq!(cache.entry_count().unwrap(), 1);
    }

    assert_eq!(ws.scan(&["--clear-cache"]).unwrap(), ExitCode::Success);

    let cache = ws.open_cache();
    assert!(cache.get_entry(&elsewhere.path).unwrap().is_none());
    assert!(cache.get_entry(&ws.photo("a.jpg")).unwrap().is_some());
    assert_eq!(cache.entry_count().unwrap(), 2);
}

#[test]
fn test_no_cache_leaves_cache_file_untouched() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");
    let photos = ws.photos();

    let code = ws.run(&["scan", path_str(&photos), "--no-cache"]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(!ws.cache_path().exists());
}

#[test]
fn test_export_writes_report() {
    let ws = Workspace::new();
    let a = ws.write("a.jpg", b"same bytes");
    let b = ws.write("b.jpg", b"same bytes");
    let report = ws.dir.path().join("report.txt");

    let code = ws.scan(&["--export", path_str(&report)]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let text = fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "# picdupe duplicate report");
    assert!(lines.contains(&format!("# root: {}", ws.photos().display()).as_str()));
    assert!(lines.contains(&"a.jpg"));
    assert!(lines.contains(&format!("    {}", a.display()).as_str()));
    assert!(lines.contains(&format!("    {}", b.display()).as_str()));
    assert_eq!(
        lines.last().copied(),
        Some("Summary: 1 groups, 1 duplicate files, 10 B wasted (10 bytes)")
    );
}

#[test]
fn test_delete_invalidates_configured_cache() {
    let ws = Workspace::new();
    let a = ws.write("a.jpg", b"same bytes");
    let b = ws.write("b.jpg", b"same bytes");
    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::Success);

    let cache = ws.cache_path();
    let code = ws
        .run(&["delete", path_str(&b), "--cache", path_str(&cache)])
        .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(!b.exists());

    let cache = ws.open_cache();
    assert!(cache.get_entry(&b).unwrap().is_none());
    assert!(cache.get_entry(&a).unwrap().is_some());
    drop(cache);

    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_rename_invalidates_configured_cache() {
    let ws = Workspace::new();
    let a = ws.write("a.jpg", b"same bytes");
    ws.write("b.jpg", b"same bytes");
    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::Success);

    let cache = ws.cache_path();
    let code = ws
        .run(&["rename", path_str(&a), "beach.jpg", "--cache", path_str(&cache)])
        .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(ws.photo("beach.jpg").exists());
    assert!(ws.open_cache().get_entry(&a).unwrap().is_none());
}

#[test]
fn test_delete_missing_file_is_an_error() {
    let ws = Workspace::new();
    let missing = ws.photo("gone.jpg");
    let cache = ws.cache_path();

    assert!(ws
        .run(&["delete", path_str(&missing), "--cache", path_str(&cache)])
        .is_err());
}

#[test]
fn test_cache_purge_and_clear_commands() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");
    let b = ws.write("b.jpg", b"same bytes");
    ws.write("c.jpg", b"other");
    assert_eq!(ws.scan(&[]).unwrap(), ExitCode::Success);
    fs::remove_file(&b).unwrap();

    let cache_path = ws.cache_path();
    let cache = path_str(&cache_path);
    assert_eq!(ws.run(&["cache", "stats", "--cache", cache]).unwrap(), ExitCode::Success);

    assert_eq!(ws.run(&["cache", "purge", "--cache", cache]).unwrap(), ExitCode::Success);
    assert_eq!(ws.open_cache().entry_count().unwrap(), 2);

    assert_eq!(ws.run(&["cache", "clear", "--cache", cache]).unwrap(), ExitCode::Success);
    assert_eq!(ws.open_cache().entry_count().unwrap(), 0);
}

#[test]
fn test_missing_root_is_an_error() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("no-such-dir");
    let cache = ws.cache_path();

    let err = ws
        .run(&["scan", path_str(&missing), "--cache", path_str(&cache)])
        .unwrap_err();
    assert!(format!("{err:#}").contains("no-such-dir"));
}

#[test]
fn test_unsupported_algorithm_is_rejected_before_scanning() {
    let ws = Workspace::new();
    ws.write("a.jpg", b"same bytes");

    assert!(ws.scan(&["-a", "crc32"]).is_err());
    assert!(!ws.cache_path().exists());
}
