//! Galactic kinematics of halo stars: Galactocentric velocities with Monte Carlo
//! uncertainties, Gaussian mixtures fitted by extreme deconvolution, and
//! injection tests for a hidden thick-disc component
//!
//! Stars are converted from astrometry to cylindrical `(v_R, v_phi, v_Z)`
//! velocities, the velocity distribution is deconvolved into a mixture, and
//! the fitted mixture is resampled to measure how much disc signal the data
//! could hide.

#![forbid(unsafe_code)]

/// Residual maps, disc injection tests and component ellipses
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Galactocentric frame, velocity transforms and Monte Carlo propagation
pub mod kinematics;
/// Linear algebra and probability helpers
pub mod math;
/// Gaussian mixtures and extreme deconvolution
pub mod mixture;
/// KD-tree and histogram utilities in velocity space
pub mod spatial;

pub use io::error::{AnalysisError, Result};
