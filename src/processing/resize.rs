//! Image resizing algorithms and utilities

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resampling filter applied when producing a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Gaussian blur
    Gaussian,
    /// Lanczos with radius 3 (high quality, recommended)
    #[default]
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Gaussian => image::imageops::FilterType::Gaussian,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Compute variant dimensions for `target` pixels along the longer side.
///
/// Landscape and square sources get `target` as their width; portrait sources
/// get `target` as their height. The other side is scaled proportionally,
/// rounded half-up, and never drops below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width >= height {
        (target, proportional(height, target, width))
    } else {
        (proportional(width, target, height), target)
    }
}

/// round(side * target / longest) in integer arithmetic
fn proportional(side: u32, target: u32, longest: u32) -> u32 {
    let longest = u64::from(longest.max(1));
    let numerator = u64::from(side) * u64::from(target);
    let rounded = (2 * numerator + longest) / (2 * longest);
    u32::try_from(rounded).unwrap_or(u32::MAX).max(1)
}

/// High-quality image resizer
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResizer {
    filter: FilterType,
}

impl ImageResizer {
    /// Create a new resizer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resizer with custom filter
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Resample `image` so that its longer side equals `target`
    pub fn resize_longest_side(&self, image: &DynamicImage, target: u32) -> DynamicImage {
        let (width, height) = scaled_dimensions(image.width(), image.height(), target);
        debug!(
            "Resizing {}x{} -> {}x{} ({:?})",
            image.width(),
            image.height(),
            width,
            height,
            self.filter
        );
        image.resize_exact(width, height, self.filter.into())
    }
}
