//! Image format detection and handling

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResizeError};

/// Extensions picked up by the directory walker, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Formats the resizer reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Check if a file extension is one the walker accepts
pub fn is_supported_input_format(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|&fmt| fmt.eq_ignore_ascii_case(extension))
}

/// Check whether `path` names a file the walker should pick up
pub fn has_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_input_format)
}

/// Detect image format from file extension
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ImageFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ResizeError::decode(path, "file has no extension"))?;

    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        other => Err(ResizeError::decode(
            path,
            format!("unsupported extension '{}'", other),
        )),
    }
}
