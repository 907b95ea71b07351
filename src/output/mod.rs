//! Output formatters for duplicate scan results.
//!
//! - [`text`]: the human-readable report (and export file format)
//! - [`json`]: machine-readable output for scripting
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::{group, hash_all, CoordinatorConfig};
//! use picdupe::output::TextReport;
//!
//! let stream = hash_all(Vec::new(), CoordinatorConfig::default()).unwrap();
//! let grouping = group(stream);
//! print!("{}", TextReport::new(&grouping.result).render());
//! ```

pub mod json;
pub mod text;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use json::{JsonOutput, JsonOutputError};
pub use text::{format_summary, TextReport};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text report
    #[default]
    Text,
    /// JSON document
    Json,
}
