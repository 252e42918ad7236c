//! Error types and context management for analysis operations

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all analysis operations
#[derive(Debug)]
pub enum AnalysisError {
    /// Failed to read a CSV table from the filesystem
    TableLoad {
        /// Path to the table
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// Failed to write a CSV table
    TableExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// Failed to read or decode a stored mixture model
    ModelLoad {
        /// Path to the model document
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Failed to encode or write a mixture model
    ModelExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Failed to save a rendered map to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Input sample is too small or empty for the requested operation
    InsufficientData {
        /// Operation that needed more data
        operation: &'static str,
        /// Description of what was missing
        reason: String,
    },

    /// Numerical computation produced invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableLoad { path, source } => {
                write!(f, "Failed to read table '{}': {source}", path.display())
            }
            Self::TableExport { path, source } => {
                write!(f, "Failed to write table '{}': {source}", path.display())
            }
            Self::ModelLoad { path, source } => {
                write!(f, "Failed to load model '{}': {source}", path.display())
            }
            Self::ModelExport { path, source } => {
                write!(f, "Failed to save model '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::InsufficientData { operation, reason } => {
                write!(f, "Insufficient data for {operation}: {reason}")
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TableLoad { source, .. } | Self::TableExport { source, .. } => Some(source),
            Self::ModelLoad { source, .. } | Self::ModelExport { source, .. } => Some(source),
            Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for analysis results
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Attaches the file path to errors raised without one
pub trait WithContext<T> {
    /// Replace the placeholder path of file-related errors with `path`
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<AnalysisError>,
{
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            match &mut error {
                AnalysisError::TableLoad { path: p, .. }
                | AnalysisError::TableExport { path: p, .. }
                | AnalysisError::ModelLoad { path: p, .. }
                | AnalysisError::ModelExport { path: p, .. }
                | AnalysisError::ImageExport { path: p, .. }
                | AnalysisError::FileSystem { path: p, .. } => {
                    *p = path.to_path_buf();
                }
                _ => {}
            }
            error
        })
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        Self::TableLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        Self::ModelLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageExport {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> AnalysisError {
    AnalysisError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> AnalysisError {
    AnalysisError::Computation {
        operation,
        reason: reason.to_string(),
    }
}

/// Create an insufficient data error
pub fn insufficient_data(operation: &'static str, reason: &impl ToString) -> AnalysisError {
    AnalysisError::InsufficientData {
        operation,
        reason: reason.to_string(),
    }
}
