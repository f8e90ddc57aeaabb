//! Units of work handed to the worker pool

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One source image and every output it should produce.
///
/// `destination` is the mirrored path of the original copy; variant paths are
/// derived from it by inserting `_{W}px` before the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeTask {
    source: PathBuf,
    destination: PathBuf,
    target_widths: Arc<[u32]>,
}

impl ResizeTask {
    pub fn new(source: PathBuf, destination: PathBuf, target_widths: Arc<[u32]>) -> Self {
        Self {
            source,
            destination,
            target_widths,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn target_widths(&self) -> &[u32] {
        &self.target_widths
    }

    /// Path of the unmodified copy
    pub fn original_path(&self) -> &Path {
        &self.destination
    }

    /// Path of the variant for `width`: `{stem}_{width}px.{ext}`
    pub fn variant_path(&self, width: u32) -> PathBuf {
        let mut name = self
            .destination
            .file_stem()
            .map(|stem| stem.to_os_string())
            .unwrap_or_default();
        name.push(format!("_{}px", width));
        if let Some(ext) = self.destination.extension() {
            name.push(".");
            name.push(ext);
        }
        self.destination.with_file_name(name)
    }

    /// Every path this task writes, original first
    pub fn output_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.destination.clone())
            .chain(self.target_widths.iter().map(|&w| self.variant_path(w)))
            .collect()
    }

    /// Number of files a successful run of this task writes
    pub fn expected_outputs(&self) -> usize {
        1 + self.target_widths.len()
    }
}
