//! Core image processing functionality

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage};
use serde::Serialize;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{ErrorContext, Result, ResizeError};

pub mod discovery;
pub mod formats;
pub mod resize;
pub mod task;

pub use discovery::*;
pub use formats::*;
pub use resize::*;
pub use task::*;

/// A decoded source image.
///
/// Decoder resources are released as soon as `open` returns; the pixel buffer
/// is freed when the handle is dropped.
pub struct ImageHandle {
    path: PathBuf,
    format: ImageFormat,
    image: DynamicImage,
}

impl ImageHandle {
    /// Decode the image at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = detect_format_from_path(path)?;

        let reader = image::io::Reader::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResizeError::not_found(path)
            } else {
                ResizeError::decode(path, e)
            }
        })?;
        let image = reader
            .with_guessed_format()
            .map_err(|e| ResizeError::decode(path, e))?
            .decode()
            .map_err(|e| ResizeError::decode(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            image,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            path: self.path.clone(),
            width: self.width(),
            height: self.height(),
            format: self.format,
        }
    }
}

/// Information about an image file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// A variant written by a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantInfo {
    pub target: u32,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Everything a successful task wrote
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub original: ImageInfo,
    pub original_copy: PathBuf,
    pub variants: Vec<VariantInfo>,
}

impl TaskOutput {
    /// All files written, original copy first
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.original_copy.as_path())
            .chain(self.variants.iter().map(|v| v.path.as_path()))
    }

    pub fn files_written(&self) -> usize {
        1 + self.variants.len()
    }
}

/// Runs the resize routine for a single task
#[derive(Debug, Clone)]
pub struct ProcessingEngine {
    resizer: ImageResizer,
    jpeg_quality: u8,
}

impl ProcessingEngine {
    /// Create a new processing engine with default settings
    pub fn new() -> Self {
        Self::with_config(&ProcessingConfig::default())
    }

    pub fn with_config(config: &ProcessingConfig) -> Self {
        Self {
            resizer: ImageResizer::with_filter(config.filter),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Decode the source, copy it to the output tree, then write each variant.
    ///
    /// Nothing is written when decoding fails. A write failure stops the task
    /// but leaves files already written in place.
    pub fn process_task(&self, task: &ResizeTask) -> Result<TaskOutput> {
        debug!("Processing file: {:?} -> {:?}", task.source(), task.destination());

        let handle = ImageHandle::open(task.source())?;
        let original = handle.info();

        let original_copy = task.original_path().to_path_buf();
        if is_same_file(task.source(), &original_copy) {
            // fs::copy truncates the destination before reading the source
            return Err(ResizeError::io_write(
                &original_copy,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "destination is the source file",
                ),
            ));
        }
        ensure_parent_dir(&original_copy)?;
        fs::copy(task.source(), &original_copy).with_write_context(&original_copy)?;
        debug!("Copied original: {:?} -> {:?}", task.source(), original_copy);

        let mut variants = Vec::with_capacity(task.target_widths().len());
        for &target in task.target_widths() {
            let resized = self.resizer.resize_longest_side(handle.image(), target);
            let path = task.variant_path(target);

            ensure_parent_dir(&path)?;
            self.save_image(&resized, &path, handle.format())?;
            debug!("Wrote variant: {:?} -> {:?}", task.source(), path);

            variants.push(VariantInfo {
                target,
                path,
                width: resized.width(),
                height: resized.height(),
            });
        }

        Ok(TaskOutput {
            original,
            original_copy,
            variants,
        })
    }

    /// Encode `image` to `path` in `format`
    fn save_image(&self, image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<()> {
        let file = fs::File::create(path).with_write_context(path)?;
        let mut writer = BufWriter::new(file);

        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                let encoded = match image.color() {
                    ColorType::L8 | ColorType::Rgb8 => image.write_with_encoder(encoder),
                    // JPEG has no alpha channel or 16-bit samples
                    _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder),
                };
                encoded.map_err(|e| ResizeError::from_encode(path, e))?;
            }
            ImageFormat::Png => {
                let encoder = PngEncoder::new(&mut writer);
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| ResizeError::from_encode(path, e))?;
            }
        }

        writer.flush().with_write_context(path)
    }
}

impl Default for ProcessingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Create the parent directory of `path`.
///
/// `create_dir_all` treats a directory created concurrently by another worker
/// as success.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).with_write_context(parent)
        }
        _ => Ok(()),
    }
}
