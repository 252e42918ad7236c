//! Analysis constants and runtime configuration defaults

// Monte Carlo propagation
/// Number of stars transformed per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
/// Monte Carlo draws per star
pub const DEFAULT_MC_SAMPLES: usize = 100;
/// Correlation coefficient between proper motion components
pub const DEFAULT_PM_CORRELATION: f64 = 0.0;
/// Multiplier on the parallax error used as positional scatter in degrees
pub const DEFAULT_POSITION_SCATTER_SCALE: f64 = 1.0;
/// Lower clip for sampled distances in parsecs
pub const MIN_SAMPLED_DISTANCE_PC: f64 = 1e-5;

// Mixture fitting
/// Independent k-means initialisations per fit
pub const DEFAULT_N_INIT: usize = 50;
/// Largest component count scanned by the BIC search
pub const DEFAULT_MAX_COMPONENTS: usize = 8;
/// Covariance regularisation added to every component in km²/s²
pub const DEFAULT_REGULARIZATION: f64 = 0.1;
/// Convergence threshold on the mean log-likelihood
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
/// Hard stop for expectation-maximisation
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Lloyd iterations used when seeding from k-means
pub const KMEANS_MAX_ITERATIONS: usize = 100;

// Residual analysis
/// Histogram bins per axis
pub const DEFAULT_BINS: usize = 100;
/// Velocity window for `v_R` in km/s
pub const DEFAULT_VR_LIMITS: (f64, f64) = (-400.0, 400.0);
/// Velocity window for `v_phi` in km/s
pub const DEFAULT_VPHI_LIMITS: (f64, f64) = (-400.0, 400.0);
/// Monte Carlo realisations per residual estimate
pub const DEFAULT_REALIZATIONS: usize = 200;
/// Keeps the normalised residual finite in empty bins
pub const RESIDUAL_EPSILON: f64 = 1e-5;

/// Thick disc mean velocity `(v_R, v_phi, v_Z)` in km/s
pub const DISC_MEAN: [f64; 3] = [0.0, 180.0, 0.0];
/// Thick disc velocity dispersion in km/s
pub const DISC_DISPERSION: [f64; 3] = [70.0, 50.0, 60.0];
/// Disc selection ellipse size in units of the dispersion
pub const DISC_SELECTION_SIGMA: f64 = 2.0;
/// Largest injected disc fraction, relative to the sample size
pub const MAX_DISC_FRACTION: f64 = 100.0;

// Map rendering
/// Output pixels per histogram bin along each axis
pub const MAP_PIXELS_PER_BIN: u32 = 4;
/// Points sampled along each drawn ellipse
pub const ELLIPSE_SEGMENTS: usize = 2048;
/// Consecutive ellipse points per dash
pub const DASH_LENGTH: usize = 24;
/// Confidence level of component ellipses in standard deviations
pub const COMPONENT_ELLIPSE_SIGMA: f64 = 2.0;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

// Default values for configurable parameters
/// Fixed seed for reproducible analysis
pub const DEFAULT_SEED: u64 = 42;
