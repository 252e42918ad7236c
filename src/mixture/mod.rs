//! Gaussian mixture models fitted by extreme deconvolution

/// Expectation-maximisation with per-star measurement noise
pub mod deconvolution;
/// K-means seeding of mixture parameters
pub mod kmeans;
/// Mixture parameters, sampling and likelihood
pub mod model;
/// Component tables for reporting
pub mod report;
/// Restarted fits and BIC scans
pub mod selection;

pub use deconvolution::{FitOutcome, VelocitySample, XdOptions};
pub use model::Gmm;
pub use selection::FittedMixture;
