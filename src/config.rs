//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`<config dir>/config.toml`, or `--config <path>`)
//! 3. Environment variables prefixed `PICDUPE_` (e.g. `PICDUPE_ALGORITHM=sha256`)
//! 4. Command-line flags ([`ConfigOverrides`])
//!
//! The algorithm identifier is validated by [`Config::hash_algorithm`]
//! before any work is dispatched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::default_worker_count;
use crate::scanner::{HashAlgorithm, UnsupportedAlgorithm, WalkerConfig};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PICDUPE_";

/// Errors raised while loading or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// The configured digest algorithm is not supported.
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The config file could not be written.
    #[error("Failed to write config file {path}: {source}")]
    Io {
        /// Target file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized to TOML.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest algorithm identifier (`md5` or `sha256`).
    pub algorithm: String,
    /// Worker pool size; `None` means available cores capped at 8.
    pub threads: Option<usize>,
    /// Hash cache location; `None` means the platform cache directory.
    pub cache_path: Option<PathBuf>,
    /// Whether to use the persistent hash cache at all.
    pub use_cache: bool,
    /// Minimum milliseconds between progress updates.
    pub progress_interval_ms: u64,
    /// Scan subdirectories.
    pub recursive: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Follow symbolic links while scanning.
    pub follow_symlinks: bool,
    /// Gitignore-style patterns excluded from scans.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().as_str().to_string(),
            threads: None,
            cache_path: None,
            use_cache: true,
            progress_interval_ms: 100,
            recursive: true,
            skip_hidden: false,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Values supplied on the command line. `None` fields leave lower layers
/// untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    /// `--algorithm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// `--threads`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// `--cache`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    /// `--no-cache`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
    /// `--no-recursive`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
}

impl Config {
    /// Default config file location: `<user config dir>/picdupe/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "picdupe", "picdupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, file and environment layers, without CLI overrides.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the full layered configuration.
    ///
    /// `config_file` is an explicit `--config` path; when `None` the
    /// default location is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a layer cannot be
    /// parsed, or the algorithm is unsupported.
    pub fn load(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        if let Some(ref path) = file {
            log::debug!("Loading configuration from {}", path.display());
        }

        let config: Self = Self::figment(file.as_deref())
            .merge(Serialized::globals(overrides))
            .extract()?;

        config.hash_algorithm()?;
        Ok(config)
    }

    /// The validated digest algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] for anything other than
    /// `md5` or `sha256`.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm, ConfigError> {
        Ok(self.algorithm.parse::<HashAlgorithm>()?)
    }

    /// Worker pool size, at least 1.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.threads.map_or_else(default_worker_count, |n| n.max(1))
    }

    /// Progress notification spacing.
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Scanner settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            recursive: self.recursive,
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            ignore_patterns: self.ignore_patterns.clone(),
        }
    }

    /// Write this configuration as TOML to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;
        Ok(())
    }
}
