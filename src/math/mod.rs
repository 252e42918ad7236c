//! Mathematical utilities for mixture fitting and sampling

/// Small dense linear algebra on 2x2 and 3x3 covariance matrices
pub mod linalg;
/// Probability helpers and random draws
pub mod probability;
