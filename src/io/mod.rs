//! Input/output, configuration and error handling

/// Command-line parsing and stage execution
pub mod cli;
/// Named defaults and rendering constants
pub mod configuration;
/// Crate-wide error type
pub mod error;
/// PNG rendering of maps
pub mod image;
/// Mixture model persistence
pub mod model;
/// Progress bars for long loops
pub mod progress;
/// CSV catalogues and result tables
pub mod table;
