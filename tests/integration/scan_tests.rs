use picdupe::scanner::{FileDescriptor, ScanError, Walker, WalkerConfig, SUPPORTED_FORMATS};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn collect(root: &Path, config: WalkerConfig) -> Vec<FileDescriptor> {
    Walker::new(root, config)
        .walk()
        .filter_map(Result::ok)
        .collect()
}

fn relative(root: &Path, files: &[FileDescriptor]) -> Vec<String> {
    files
        .iter()
        .map(|f| {
            f.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let walker = Walker::new(dir.path(), WalkerConfig::default());

    assert_eq!(walker.walk().count(), 0);
    assert_eq!(walker.stats().scanned, 0);
}

#[test]
fn test_every_supported_extension_is_found() {
    let dir = tempdir().unwrap();
    for ext in SUPPORTED_FORMATS {
        fs::write(dir.path().join(format!("img.{ext}")), ext.as_bytes()).unwrap();
    }
    fs::write(dir.path().join("clip.mp4"), b"video").unwrap();
    fs::write(dir.path().join("README"), b"readme").unwrap();

    let files = collect(dir.path(), WalkerConfig::default());
    assert_eq!(files.len(), SUPPORTED_FORMATS.len());
}

#[test]
fn test_scan_order_is_sorted_and_stable() {
    let dir = tempdir().unwrap();
    for name in ["z.jpg", "b/y.jpg", "a.jpg", "b/a.png", "c/d/e.gif"] {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, name.as_bytes()).unwrap();
    }

    let first = relative(dir.path(), &collect(dir.path(), WalkerConfig::default()));
    let second = relative(dir.path(), &collect(dir.path(), WalkerConfig::default()));

    assert_eq!(first, vec!["a.jpg", "b/a.png", "b/y.jpg", "c/d/e.gif", "z.jpg"]);
    assert_eq!(first, second);
}

#[test]
fn test_hidden_files_skipped_on_request() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("visible.jpg"), b"v").unwrap();
    fs::write(dir.path().join(".hidden.jpg"), b"h").unwrap();
    fs::create_dir(dir.path().join(".thumbs")).unwrap();
    fs::write(dir.path().join(".thumbs").join("t.jpg"), b"t").unwrap();

    assert_eq!(collect(dir.path(), WalkerConfig::default()).len(), 3);

    let config = WalkerConfig {
        skip_hidden: true,
        ..Default::default()
    };
    let files = collect(dir.path(), config);
    assert_eq!(relative(dir.path(), &files), vec!["visible.jpg"]);
}

#[test]
fn test_descriptor_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.JPEG");
    fs::write(&path, vec![7u8; 1234]).unwrap();

    let files = collect(dir.path(), WalkerConfig::default());
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, path);
    assert_eq!(files[0].size, 1234);
    assert_eq!(files[0].format, "jpeg");
    assert_eq!(files[0].modified, fs::metadata(&path).unwrap().modified().unwrap());
}

#[cfg(unix)]
#[test]
fn test_symlinks_not_followed_by_default() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("real.jpg");
    fs::write(&target, b"x").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link.jpg")).unwrap();

    let files = collect(dir.path(), WalkerConfig::default());
    assert_eq!(relative(dir.path(), &files), vec!["real.jpg"]);
}

#[test]
fn test_missing_root() {
    let dir = tempdir().unwrap();
    let walker = Walker::new(&dir.path().join("nope"), WalkerConfig::default());

    match walker.validate_root() {
        Err(ScanError::NotFound(path)) => assert!(path.ends_with("nope")),
        other => panic!("Expected NotFound, got {:?}", other),
    }
}
