//! Error types and handling for multiresize

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for multiresize operations
pub type Result<T> = std::result::Result<T, ResizeError>;

/// Main error type for multiresize operations
#[derive(Debug, Error)]
pub enum ResizeError {
    /// Input root or source file does not exist
    #[error("File not found: {path:?}")]
    NotFound { path: PathBuf },

    /// File exists but could not be read or parsed as a supported image
    #[error("Failed to decode image {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Destination could not be created or written
    #[error("Failed to write {path:?}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoder rejected the resized image
    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Another task of the same batch already writes this output
    #[error("Output {path:?} is already produced from {claimed_by:?}")]
    OutputConflict { path: PathBuf, claimed_by: PathBuf },

    /// Directory traversal failed below the input root
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(String),

    /// Worker pool errors
    #[error("Parallel processing error: {message}")]
    Parallel { message: String },

    /// I/O errors without a more specific category
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used for reporting and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Decode,
    IoWrite,
    Config,
    Internal,
}

impl ResizeError {
    /// Create a new not found error
    pub fn not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a new decode error
    pub fn decode<P: Into<PathBuf>, S: ToString>(path: P, message: S) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a new write error
    pub fn io_write<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::IoWrite {
            path: path.into(),
            source,
        }
    }

    pub fn output_conflict<P: Into<PathBuf>, Q: Into<PathBuf>>(path: P, claimed_by: Q) -> Self {
        Self::OutputConflict {
            path: path.into(),
            claimed_by: claimed_by.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::Parallel {
            message: message.into(),
        }
    }

    /// Map an error raised while writing an encoded image to `path`
    pub fn from_encode<P: Into<PathBuf>>(path: P, err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(source) => Self::io_write(path, source),
            other => Self::Encode {
                path: path.into(),
                source: other,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::IoWrite { .. } | Self::Encode { .. } => ErrorKind::IoWrite,
            Self::Config { .. } | Self::Serde(_) | Self::OutputConflict { .. } => ErrorKind::Config,
            Self::Walk(_) | Self::Parallel { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error only affects a single task (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound { .. }
            | Self::Decode { .. }
            | Self::IoWrite { .. }
            | Self::Encode { .. }
            | Self::OutputConflict { .. }
            | Self::Walk(_) => true,

            Self::Config { .. } | Self::Serde(_) | Self::Parallel { .. } | Self::Io(_) => false,
        }
    }

    /// Get the associated file path if available
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::Decode { path, .. }
            | Self::IoWrite { path, .. }
            | Self::Encode { path, .. }
            | Self::OutputConflict { path, .. } => Some(path),
            Self::Walk(err) => err.path(),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { path } => format!("{} does not exist", path.display()),
            Self::Decode { path, message } => {
                format!("{} is not a readable PNG or JPEG image: {}", path.display(), message)
            }
            Self::IoWrite { path, source } => {
                format!("could not write {}: {}", path.display(), source)
            }
            Self::OutputConflict { path, claimed_by } => format!(
                "{} would overwrite the output of {}",
                path.display(),
                claimed_by.display()
            ),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for ResizeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serde(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ResizeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for attaching a destination path to I/O failures
pub trait ErrorContext<T> {
    /// Treat the error as a failed write to `file`
    fn with_write_context(self, file: &Path) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_write_context(self, file: &Path) -> Result<T> {
        self.map_err(|e| ResizeError::io_write(file, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ResizeError::config("test message");
        assert!(matches!(err, ResizeError::Config { .. }));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(ResizeError::decode("a.png", "bad header").is_recoverable());
        assert!(ResizeError::not_found("a.png").is_recoverable());
        assert!(!ResizeError::parallel("pool").is_recoverable());
        assert!(!ResizeError::config("bad").is_recoverable());
    }

    #[test]
    fn test_encode_io_errors_become_write_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ResizeError::from_encode("out.png", image::ImageError::IoError(io));
        assert!(matches!(err, ResizeError::IoWrite { .. }));
        assert_eq!(err.kind(), ErrorKind::IoWrite);
    }

    #[test]
    fn test_output_conflict_is_per_task() {
        let err = ResizeError::output_conflict("out/img_100px.png", "in/img.png");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.is_recoverable());
        assert_eq!(err.path(), Some(Path::new("out/img_100px.png")));
        assert!(err.user_message().contains("in/img.png"));
    }

    #[test]
    fn test_user_messages() {
        let err = ResizeError::decode("broken.jpg", "unexpected EOF");
        let msg = err.user_message();
        assert!(msg.contains("broken.jpg"));
        assert!(msg.contains("unexpected EOF"));
    }

    #[test]
    fn test_write_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        ));
        let err = result
            .with_write_context(Path::new("out/test.jpg"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoWrite);
        assert_eq!(err.path(), Some(Path::new("out/test.jpg")));
    }
}
