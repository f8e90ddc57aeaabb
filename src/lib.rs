//! multiresize - Batch Image Resizer
//!
//! Walks an input directory tree and, for every PNG or JPEG it finds, writes
//! an unmodified copy plus one resized variant per target size into a
//! mirrored output tree. Files are processed in parallel on a fixed-size
//! worker pool.
//!
//! Target sizes apply to the *longer* side of each image: a 4000x2000 source
//! with target 500 becomes 500x250, a 2000x4000 source becomes 250x500.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use multiresize::{run_batch, Config};
//!
//! let mut config = Config::default();
//! config.input_folder = "photos".into();
//! config.output_folder = "photos_resized".into();
//! config.target_widths = vec![320, 1280];
//!
//! let report = run_batch(&config)?;
//! println!("{} resized, {} failed", report.successful, report.failed);
//! # Ok::<(), multiresize::ResizeError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

pub use config::{Config, LoggingConfig, Overrides, ProcessingConfig, WorkerCount};
pub use error::{ErrorKind, Result, ResizeError};
pub use parallel::{BatchProcessor, BatchReport, TaskOutcome, TaskReport};
pub use processing::{
    discover_tasks, scaled_dimensions, FilterType, ImageFormat, ProcessingEngine, ResizeTask,
    TaskWalker,
};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr logger honouring `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install_subscriber(filter, false);
}

/// Install a stderr logger configured from `config.logging`
pub fn init_with_config(config: &Config) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    install_subscriber(filter, config.logging.json_format);
}

fn install_subscriber(filter: EnvFilter, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        info!("multiresize v{} initialized", VERSION);
    }
}

/// Validate `config`, discover every task and run them to completion
pub fn run_batch(config: &Config) -> Result<BatchReport> {
    config.validate()?;

    let tasks = discover_tasks(
        &config.input_folder,
        &config.output_folder,
        &config.target_widths,
    )?;
    info!("Found {} files to process", tasks.len());

    let processor = BatchProcessor::new(
        ProcessingEngine::with_config(&config.processing),
        config.max_workers.resolve(),
    );
    processor.run(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        init();
        init_with_config(&Config::default());
    }

    #[test]
    fn test_run_batch_rejects_invalid_config() {
        let mut config = Config::default();
        config.target_widths = vec![0];
        assert!(matches!(run_batch(&config), Err(ResizeError::Config { .. })));
    }
}
