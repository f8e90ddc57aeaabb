//! Configuration management for multiresize

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResizeError};
use crate::processing::FilterType;

pub mod workers;
pub use workers::WorkerCount;

/// Default input directory
pub const DEFAULT_INPUT_FOLDER: &str = "Imgs";

/// Default output directory
pub const DEFAULT_OUTPUT_FOLDER: &str = "resized_images";

/// Default set of target sizes, in pixels along the longer side
pub const DEFAULT_TARGET_WIDTHS: [u32; 5] = [100, 300, 500, 2000, 5000];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the directory tree to read images from
    pub input_folder: PathBuf,

    /// Root of the mirrored output tree
    pub output_folder: PathBuf,

    /// Target sizes, one variant per entry, in output order
    pub target_widths: Vec<u32>,

    /// Worker thread count
    pub max_workers: WorkerCount,

    /// Resampling and encoding settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from(DEFAULT_INPUT_FOLDER),
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            target_widths: DEFAULT_TARGET_WIDTHS.to_vec(),
            max_workers: WorkerCount::Auto,
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Resampling and encoding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Resampling filter used for every variant
    pub filter: FilterType,

    /// JPEG encoder quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            jpeg_quality: 90,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Values supplied on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub target_widths: Option<Vec<u32>>,
    pub max_workers: Option<WorkerCount>,
    pub filter: Option<FilterType>,
    pub jpeg_quality: Option<u8>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from a `.toml`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ResizeError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ResizeError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Save configuration to file, format chosen by extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ResizeError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ResizeError::config(format!("YAML serialization failed: {}", e)))?,
            _ => {
                return Err(ResizeError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            ResizeError::config(format!(
                "Failed to write config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for &width in &self.target_widths {
            if width == 0 {
                return Err(ResizeError::config("Target widths must be greater than 0"));
            }
            // Two equal widths would map to the same output file
            if !seen.insert(width) {
                return Err(ResizeError::config(format!(
                    "Duplicate target width: {}",
                    width
                )));
            }
        }

        if !(1..=100).contains(&self.processing.jpeg_quality) {
            return Err(ResizeError::config("JPEG quality must be between 1 and 100"));
        }

        if self.input_folder.as_os_str().is_empty() || self.output_folder.as_os_str().is_empty() {
            return Err(ResizeError::config(
                "Input and output folders must not be empty",
            ));
        }

        Ok(())
    }

    /// Apply command-line overrides (overrides take precedence)
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(input) = overrides.input_folder {
            self.input_folder = input;
        }
        if let Some(output) = overrides.output_folder {
            self.output_folder = output;
        }
        if let Some(widths) = overrides.target_widths {
            self.target_widths = widths;
        }
        if let Some(workers) = overrides.max_workers {
            self.max_workers = workers;
        }
        if let Some(filter) = overrides.filter {
            self.processing.filter = filter;
        }
        if let Some(quality) = overrides.jpeg_quality {
            self.processing.jpeg_quality = quality;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input_folder, PathBuf::from("Imgs"));
        assert_eq!(config.output_folder, PathBuf::from("resized_images"));
        assert_eq!(config.target_widths, vec![100, 300, 500, 2000, 5000]);
        assert_eq!(config.max_workers, WorkerCount::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);

        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            target_widths = [64, 128]
            max_workers = 2

            [processing]
            filter = "catmullrom"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.target_widths, vec![64, 128]);
        assert_eq!(parsed.max_workers, WorkerCount::fixed(2).unwrap());
        assert_eq!(parsed.processing.filter, FilterType::CatmullRom);
        assert_eq!(parsed.processing.jpeg_quality, 90);
        assert_eq!(parsed.input_folder, PathBuf::from("Imgs"));
    }

    #[test]
    fn test_zero_workers_rejected_in_file() {
        assert!(toml::from_str::<Config>("max_workers = 0").is_err());
        assert!(serde_yaml::from_str::<Config>("max_workers: auto").is_ok());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();

        let toml_path = dir.path().join("multiresize.toml");
        config.to_file(&toml_path).unwrap();
        assert_eq!(Config::from_file(&toml_path).unwrap(), config);

        let yaml_path = dir.path().join("multiresize.yaml");
        config.to_file(&yaml_path).unwrap();
        assert_eq!(Config::from_file(&yaml_path).unwrap(), config);

        assert!(config.to_file(dir.path().join("multiresize.ini")).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_widths() {
        let mut config = Config::default();
        config.target_widths = vec![100, 0];
        assert!(config.validate().is_err());

        config.target_widths = vec![100, 300, 100];
        assert!(config.validate().is_err());

        config.target_widths = Vec::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_quality() {
        let mut config = Config::default();
        config.processing.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.processing.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_overrides() {
        let merged = Config::default().merge(Overrides {
            input_folder: Some(PathBuf::from("photos")),
            target_widths: Some(vec![640]),
            max_workers: Some(WorkerCount::fixed(1).unwrap()),
            ..Default::default()
        });

        assert_eq!(merged.input_folder, PathBuf::from("photos"));
        assert_eq!(merged.output_folder, PathBuf::from("resized_images"));
        assert_eq!(merged.target_widths, vec![640]);
        assert_eq!(merged.max_workers.resolve(), 1);
    }
}
