//! Astrometry to Galactocentric velocity transforms and Monte Carlo error propagation

/// Galactocentric reference frame parameters and the ICRS transform
pub mod frame;
/// Monte Carlo sampling of astrometric uncertainties
pub mod montecarlo;
/// Cylindrical velocity components from astrometry
pub mod velocity;

pub use frame::{FrameTransform, GalactocentricFrame};
pub use montecarlo::{AstrometricErrors, MonteCarloOptions, ObservedStar};
pub use velocity::{Astrometry, CylindricalVelocity, VelocityRecord};
