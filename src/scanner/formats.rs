//! Supported image formats.

use std::path::Path;

/// Image extensions picked up by the scanner (lowercase, without dot).
pub const SUPPORTED_FORMATS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "heic", "heif", "webp", "tiff", "tif",
];

/// Lower-cased extension of `path` without the dot, or an empty string.
#[must_use]
pub fn format_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether `path` has one of the [`SUPPORTED_FORMATS`] extensions.
#[must_use]
pub fn is_supported_format(path: &Path) -> bool {
    let format = format_of(path);
    !format.is_empty() && SUPPORTED_FORMATS.contains(&format.as_str())
}
