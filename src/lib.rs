//! picdupe - duplicate image finder
//!
//! Finds byte-identical images by content digest (MD5 or SHA-256). Digests
//! are remembered in a SQLite cache keyed by path, size and modification
//! time, so a rescan only hashes files that changed. Hashing runs on a
//! bounded rayon pool and can be cancelled cooperatively with Ctrl+C.
//!
//! Pipeline: [`scanner::Walker`] → [`duplicates::hash_all`] (with
//! [`cache::HashCache`]) → [`duplicates::group`] → [`output`].

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use yansi::Paint;

use crate::actions::{delete_file, rename_file, DeleteMode};
use crate::cache::HashCache;
use crate::cli::{CacheAction, CacheArgs, Cli, Commands, DeleteArgs, RenameArgs, ScanArgs};
use crate::config::{Config, ConfigOverrides};
use crate::duplicates::{group, hash_all, CoordinatorConfig};
use crate::error::ExitCode;
use crate::output::{JsonOutput, OutputFormat, TextReport};
use crate::progress::{Progress, ProgressCallback, PHASE_SCAN};
use crate::scanner::{FileDescriptor, Walker};

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
struct Globals<'a> {
    quiet: bool,
    config: Option<&'a Path>,
}

/// Run the application for parsed CLI arguments.
///
/// Returns the exit code for a completed command. Fatal errors (bad
/// configuration, unreadable scan root, failed file operation) are returned
/// as `Err` and map to [`ExitCode::GeneralError`].
///
/// # Errors
///
/// Returns an error if the command cannot be carried out.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let globals = Globals {
        quiet: cli.quiet,
        config: cli.config.as_deref(),
    };

    match &cli.command {
        Commands::Scan(args) => run_scan(args, globals),
        Commands::Cache(args) => run_cache(args, globals),
        Commands::Delete(args) => run_delete(args, globals),
        Commands::Rename(args) => run_rename(args, globals),
    }
}

fn run_scan(args: &ScanArgs, globals: Globals<'_>) -> anyhow::Result<ExitCode> {
    let config = Config::load(globals.config, &args.overrides())?;
    let algorithm = config.hash_algorithm()?;

    let handler = signal::install_handler();
    let progress = Arc::new(Progress::new(globals.quiet));

    let walker = Walker::new(&args.path, config.walker_config()).with_shutdown_flag(handler.flag());
    walker
        .validate_root()
        .with_context(|| format!("Cannot scan {}", args.path.display()))?;

    log::info!("Scanning {}", walker.root().display());
    progress.on_phase_start(PHASE_SCAN, 0);
    let mut descriptors: Vec<FileDescriptor> = Vec::new();
    for entry in walker.walk() {
        match entry {
            Ok(descriptor) => {
                descriptors.push(descriptor);
                progress.on_progress(descriptors.len(), 0);
            }
            Err(e) => log::warn!("Skipping entry: {}", e),
        }
    }
    progress.on_phase_end(PHASE_SCAN);
    let walk_stats = walker.stats();
    log::info!(
        "Found {} images among {} files",
        walk_stats.found,
        walk_stats.scanned
    );

    let (cache, cache_failed) = if config.use_cache {
        match open_cache(&config) {
            Ok(cache) => (Some(Arc::new(cache)), false),
            Err(e) => {
                log::warn!("Hash cache unavailable, continuing without it: {:#}", e);
                (None, true)
            }
        }
    } else {
        (None, false)
    };

    if args.clear_cache {
        if let Some(ref cache) = cache {
            match HashCache::clear(cache) {
                Ok(removed) => log::info!("Cleared {} cache entries", removed),
                Err(e) => log::warn!("Failed to clear hash cache: {}", e),
            }
        }
    }

    let mut coordinator = CoordinatorConfig::default()
        .with_algorithm(algorithm)
        .with_workers(config.worker_count())
        .with_shutdown_flag(handler.flag())
        .with_progress_callback(progress.clone())
        .with_progress_interval(config.progress_interval());
    if let Some(cache) = cache {
        coordinator = coordinator.with_cache(cache);
    }

    let stream = hash_all(descriptors, coordinator)?;
    let (outcomes, mut stats) = stream.into_results();
    stats.cache_degraded |= cache_failed;
    stats.cancelled |= handler.is_cancelled();

    let grouping = group(outcomes);
    let exit_code = ExitCode::for_scan(
        !grouping.result.is_empty(),
        !grouping.failures.is_empty() || stats.cache_degraded,
        stats.cancelled,
    );

    let report = TextReport::new(&grouping.result)
        .with_root(walker.root())
        .with_algorithm(algorithm);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => report.write_to(&mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(&grouping, &stats, exit_code).write_to(&mut out, true)?;
        }
    }
    out.flush()?;

    if let Some(ref export) = args.export {
        report
            .save(export)
            .with_context(|| format!("Failed to write report to {}", export.display()))?;
        log::info!("Report written to {}", export.display());
    }

    if !globals.quiet {
        let mut err = io::stderr().lock();
        if let Some(summary) = grouping.failure_summary() {
            writeln!(err, "{}", summary.yellow())?;
        }
        if stats.cache_degraded {
            writeln!(err, "{}", "Hash cache was unavailable; all files were hashed".yellow())?;
        }
        if stats.cancelled {
            writeln!(
                err,
                "{}",
                format!(
                    "Scan cancelled: {} of {} files processed, results are partial",
                    stats.completed(),
                    stats.total
                )
                .red()
                .bold()
            )?;
        }
    }

    log::info!(
        "Hashed {} files ({} from cache, {} computed, {} failed)",
        stats.total,
        stats.cache_hits,
        stats.computed,
        stats.failed
    );
    Ok(exit_code)
}

fn run_cache(args: &CacheArgs, globals: Globals<'_>) -> anyhow::Result<ExitCode> {
    let config = Config::load(globals.config, &args.overrides())?;
    let cache = open_cache(&config)?;
    let location = cache
        .path()
        .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());

    let mut out = io::stdout().lock();
    match args.action {
        CacheAction::Stats => {
            writeln!(out, "Cache: {}", location)?;
            writeln!(out, "Entries: {}", cache.entry_count()?)?;
        }
        CacheAction::Purge => {
            let removed = cache.purge_missing()?;
            writeln!(out, "Purged {} stale entries from {}", removed, location)?;
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            writeln!(out, "Cleared {} entries from {}", removed, location)?;
        }
    }
    Ok(ExitCode::Success)
}

fn run_delete(args: &DeleteArgs, globals: Globals<'_>) -> anyhow::Result<ExitCode> {
    let cache = cache_for_file_op(args.cache.as_deref(), globals)?;
    let mode = if args.trash {
        DeleteMode::Trash
    } else {
        DeleteMode::Permanent
    };

    let result = delete_file(&args.file, mode, cache.as_ref())?;
    if !globals.quiet {
        let verb = match result.mode {
            DeleteMode::Trash => "Moved to trash",
            DeleteMode::Permanent => "Deleted",
        };
        writeln!(
            io::stdout().lock(),
            "{}: {} ({})",
            verb.green(),
            result.path.display(),
            bytesize::ByteSize::b(result.size)
        )?;
    }
    Ok(ExitCode::Success)
}

fn run_rename(args: &RenameArgs, globals: Globals<'_>) -> anyhow::Result<ExitCode> {
    let cache = cache_for_file_op(args.cache.as_deref(), globals)?;
    let target = rename_file(&args.file, &args.new_name, cache.as_ref())?;
    if !globals.quiet {
        writeln!(
            io::stdout().lock(),
            "{}: {} -> {}",
            "Renamed".green(),
            args.file.display(),
            target.display()
        )?;
    }
    Ok(ExitCode::Success)
}

/// Open the cache configured for `config`.
fn open_cache(config: &Config) -> anyhow::Result<HashCache> {
    let path = match config.cache_path {
        Some(ref path) => path.clone(),
        None => HashCache::default_path()?,
    };
    log::debug!("Opening hash cache at {}", path.display());
    HashCache::new(&path).with_context(|| format!("Failed to open cache {}", path.display()))
}

/// Cache for delete/rename. The file operation still runs if the cache
/// cannot be opened.
fn cache_for_file_op(
    cache_path: Option<&Path>,
    globals: Globals<'_>,
) -> anyhow::Result<Option<HashCache>> {
    let overrides = ConfigOverrides {
        cache_path: cache_path.map(Path::to_path_buf),
        ..Default::default()
    };
    let config = Config::load(globals.config, &overrides)?;
    if !config.use_cache {
        return Ok(None);
    }
    match open_cache(&config) {
        Ok(cache) => Ok(Some(cache)),
        Err(e) => {
            log::warn!("Hash cache unavailable, entry not invalidated: {:#}", e);
            Ok(None)
        }
    }
}
