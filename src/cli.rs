//! Command-line interface definitions for picdupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file, error format) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Find duplicate images under ~/Pictures
//! picdupe scan ~/Pictures
//!
//! # SHA-256 digests, JSON output, report saved to a file
//! picdupe scan ~/Pictures -a sha256 --output json --export dupes.txt
//!
//! # Inspect or maintain the hash cache
//! picdupe cache stats
//! picdupe cache purge
//!
//! # Remove one copy and keep the cache consistent
//! picdupe delete ~/Pictures/copy.jpg --trash
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::output::OutputFormat;

/// Duplicate image finder with a persistent hash cache.
///
/// picdupe hashes every supported image under a directory (MD5 or SHA-256),
/// groups files with identical content, and remembers digests between runs
/// so unchanged files are never hashed twice.
#[derive(Debug, Parser)]
#[command(name = "picdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to <config dir>/picdupe/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate images
    Scan(ScanArgs),
    /// Inspect or maintain the hash cache
    Cache(CacheArgs),
    /// Delete a file and drop its cache entry
    Delete(DeleteArgs),
    /// Rename a file in place and drop its cache entry
    Rename(RenameArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Only scan the top level of PATH
    #[arg(long)]
    pub no_recursive: bool,

    /// Digest algorithm (md5 or sha256)
    #[arg(short, long, value_name = "NAME")]
    pub algorithm: Option<String>,

    /// Number of hashing threads (default: available cores, at most 8)
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Path to the hash cache database
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Disable hash caching
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Clear the hash cache before scanning
    #[arg(long, conflicts_with = "no_cache")]
    pub clear_cache: bool,

    /// Output format printed to stdout
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also write the text report to FILE
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

impl ScanArgs {
    /// CLI values that override lower configuration layers.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            algorithm: self.algorithm.clone(),
            threads: self.threads,
            cache_path: self.cache.clone(),
            use_cache: self.no_cache.then_some(false),
            recursive: self.no_recursive.then_some(false),
        }
    }
}

/// Arguments for the cache subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Maintenance action
    #[arg(value_enum)]
    pub action: CacheAction,

    /// Path to the hash cache database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,
}

impl CacheArgs {
    /// CLI values that override lower configuration layers.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cache_path: self.cache.clone(),
            ..Default::default()
        }
    }
}

/// Cache maintenance actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheAction {
    /// Show the cache location and entry count
    Stats,
    /// Remove entries for files that no longer exist
    Purge,
    /// Remove every entry
    Clear,
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// File to delete
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Move to the system trash instead of deleting permanently
    #[arg(long)]
    pub trash: bool,

    /// Path to the hash cache database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,
}

/// Arguments for the rename subcommand.
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// File to rename
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// New file name (no directory part)
    #[arg(value_name = "NEW_NAME")]
    pub new_name: String,

    /// Path to the hash cache database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,
}
