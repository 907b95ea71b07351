use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use picdupe::config::{Config, ConfigError, ConfigOverrides};
use picdupe::scanner::HashAlgorithm;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
algorithm = "sha256"
threads = 3
cache_path = "/var/cache/picdupe.db"
use_cache = false
recursive = false
ignore_patterns = ["thumbs/"]
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path), &ConfigOverrides::default()).unwrap();

    assert_eq!(config.hash_algorithm().unwrap(), HashAlgorithm::Sha256);
    assert_eq!(config.worker_count(), 3);
    assert_eq!(config.cache_path, Some(PathBuf::from("/var/cache/picdupe.db")));
    assert!(!config.use_cache);

    let walker = config.walker_config();
    assert!(!walker.recursive);
    assert_eq!(walker.ignore_patterns, vec!["thumbs/".to_string()]);
}

#[test]
fn test_cli_overrides_beat_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"sha256\"\nthreads = 3\n").unwrap();

    let overrides = ConfigOverrides {
        algorithm: Some("md5".into()),
        threads: Some(5),
        ..Default::default()
    };
    let config = Config::load(Some(&config_path), &overrides).unwrap();

    assert_eq!(config.hash_algorithm().unwrap(), HashAlgorithm::Md5);
    assert_eq!(config.worker_count(), 5);
}

#[test]
fn test_unsupported_algorithm_in_file_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"blake3\"\n").unwrap();

    let err = Config::load(Some(&config_path), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedAlgorithm(_)));
    assert!(err.to_string().contains("blake3"));
}

#[test]
fn test_malformed_toml_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threads = \"many\"\n").unwrap();

    let err = Config::load(Some(&config_path), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)));
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("PICDUPE_PROGRESS_INTERVAL_MS", "250");

    let config: Config = Config::figment(None).extract().unwrap();
    assert_eq!(config.progress_interval(), Duration::from_millis(250));

    std::env::remove_var("PICDUPE_PROGRESS_INTERVAL_MS");
}

#[test]
fn test_save_and_reload() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("picdupe").join("config.toml");
    let config = Config {
        algorithm: "sha256".into(),
        skip_hidden: true,
        ..Default::default()
    };
    config.save(&config_path).unwrap();

    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}
