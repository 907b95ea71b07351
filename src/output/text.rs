//! Plain-text duplicate report.
//!
//! # Format
//!
//! ```text
//! # picdupe duplicate report
//! # generated: 2024-05-01 12:00:00
//! a.jpg
//!     /photos/a.jpg
//!     /photos/sub/b.jpg
//!
//! Summary: 1 groups, 1 duplicate files, 97.7 KiB wasted (100000 bytes)
//! ```
//!
//! Lines starting with `#` are header comments. Each group is its
//! representative file name, its member paths indented by four spaces, then
//! a blank line. The last line is the summary.
//!
//! Names and paths are written verbatim, so a reader must go by position
//! rather than by prefix: the header is the leading run of `#` lines that
//! is not directly followed by an indented line, every group has at least
//! two members so its name line is always followed by one, and only the
//! final line is the summary. That keeps names such as `# x.jpg` or
//! `Summary: x.jpg` unambiguous. A name containing a line break, or one
//! that starts with four spaces, cannot be read back.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use chrono::{DateTime, Local};

use crate::duplicates::{GroupStats, GroupedResult};
use crate::scanner::HashAlgorithm;

/// Indentation in front of each member path.
pub const MEMBER_INDENT: &str = "    ";

/// Prefix of the trailing summary line.
pub const SUMMARY_PREFIX: &str = "Summary: ";

/// Text report for a [`GroupedResult`].
#[derive(Debug, Clone)]
pub struct TextReport<'a> {
    result: &'a GroupedResult,
    generated_at: DateTime<Local>,
    root: Option<PathBuf>,
    algorithm: Option<HashAlgorithm>,
}

impl<'a> TextReport<'a> {
    /// Create a report stamped with the current local time.
    #[must_use]
    pub fn new(result: &'a GroupedResult) -> Self {
        Self {
            result,
            generated_at: Local::now(),
            root: None,
            algorithm: None,
        }
    }

    /// Record the scanned directory in the header.
    #[must_use]
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    /// Record the digest algorithm in the header.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Override the generation timestamp.
    #[must_use]
    pub fn with_generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = at;
        self
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "# picdupe duplicate report")?;
        writeln!(
            writer,
            "# generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(ref root) = self.root {
            writeln!(writer, "# root: {}", root.display())?;
        }
        if let Some(algorithm) = self.algorithm {
            writeln!(writer, "# algorithm: {algorithm}")?;
        }

        for group in self.result.groups() {
            writeln!(writer, "{}", group.name())?;
            for file in &group.files {
                writeln!(writer, "{MEMBER_INDENT}{}", file.path.display())?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "{}", format_summary(&self.result.stats()))
    }

    /// Render the report to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write the report to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        log::info!("Exported {} groups to {}", self.result.len(), path.display());
        Ok(())
    }
}

/// The summary line, e.g.
/// `Summary: 2 groups, 3 duplicate files, 1.2 MiB wasted (1258291 bytes)`.
#[must_use]
pub fn format_summary(stats: &GroupStats) -> String {
    format!(
        "{SUMMARY_PREFIX}{} groups, {} duplicate files, {} wasted ({} bytes)",
        stats.group_count,
        stats.duplicate_files,
        ByteSize::b(stats.wasted_bytes),
        stats.wasted_bytes
    )
}
