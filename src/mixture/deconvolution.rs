//! Extreme deconvolution: EM for a Gaussian mixture observed through
//! heteroscedastic noise
//!
//! Every point carries its own diagonal error covariance `S_i`. The E-step
//! scores component `j` against `T_ij = V_j + S_i`; the M-step updates the
//! underlying (noise-free) parameters from the conditional expectations
//!
//! ```text
//! b_ij = μ_j + V_j T_ij⁻¹ (x_i − μ_j)
//! B_ij = V_j − V_j T_ij⁻¹ V_j
//! ```
//!
//! and regularises each covariance with `w·I`.

use crate::io::configuration::{DEFAULT_MAX_ITERATIONS, DEFAULT_REGULARIZATION, DEFAULT_TOLERANCE};
use crate::io::error::{Result, computation_error, insufficient_data, invalid_parameter};
use crate::kinematics::velocity::VelocityRecord;
use crate::math::linalg::{FactoredCovariance, diagonal_covariance};
use crate::math::probability::log_sum_exp;
use crate::mixture::model::Gmm;
use nalgebra::{Matrix3, Vector3};

// Responsibility mass below which a component is frozen for the iteration
const VANISHING_RESPONSIBILITY: f64 = 1e-10;

/// Velocities with per-component measurement uncertainties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocitySample {
    /// Observed `(v_R, v_phi, v_Z)` per star
    pub points: Vec<Vector3<f64>>,
    /// One-sigma uncertainties in the same order
    pub errors: Vec<Vector3<f64>>,
}

impl VelocitySample {
    /// Build a sample from matching point and uncertainty lists
    ///
    /// # Errors
    ///
    /// Returns an error if the lists differ in length
    pub fn new(points: Vec<Vector3<f64>>, errors: Vec<Vector3<f64>>) -> Result<Self> {
        if points.len() != errors.len() {
            return Err(invalid_parameter(
                "errors",
                &errors.len(),
                &format!("expected one uncertainty per point ({})", points.len()),
            ));
        }
        Ok(Self { points, errors })
    }

    /// Collect finite rows from velocity records
    ///
    /// Rows with any non-finite velocity or uncertainty are dropped.
    pub fn from_records(records: &[VelocityRecord]) -> Self {
        let (points, errors): (Vec<_>, Vec<_>) = records
            .iter()
            .filter(|r| r.is_finite())
            .map(|r| (r.velocity(), r.uncertainty()))
            .unzip();

        let dropped = records.len() - points.len();
        if dropped > 0 {
            log::warn!(
                "Dropped {dropped} of {} stars with non-finite velocities or uncertainties",
                records.len()
            );
        }

        Self { points, errors }
    }

    /// Number of stars
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the sample holds no stars
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Diagonal error covariance of every star
    pub fn covariances(&self) -> Vec<Matrix3<f64>> {
        self.errors.iter().map(diagonal_covariance).collect()
    }
}

/// Settings for the deconvolution EM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XdOptions {
    /// Covariance regularisation `w` added as `w·I`
    pub regularization: f64,
    /// Stop when the mean log-likelihood changes by less than this
    pub tolerance: f64,
    /// Iteration cap
    pub max_iterations: usize,
}

impl Default for XdOptions {
    fn default() -> Self {
        Self {
            regularization: DEFAULT_REGULARIZATION,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl XdOptions {
    /// Check all settings
    ///
    /// # Errors
    ///
    /// Returns an error for a negative regularisation, a non-positive
    /// tolerance or a zero iteration cap
    pub fn validate(&self) -> Result<()> {
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(invalid_parameter(
                "regularization",
                &self.regularization,
                &"must be finite and non-negative",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid_parameter(
                "tolerance",
                &self.tolerance,
                &"must be finite and positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(invalid_parameter(
                "max_iterations",
                &self.max_iterations,
                &"must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of one deconvolution run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOutcome {
    /// Log-likelihood averaged over stars
    pub mean_log_likelihood: f64,
    /// Total log-likelihood of the sample
    pub log_likelihood: f64,
    /// EM iterations performed
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration cap
    pub converged: bool,
}

#[derive(Debug, Clone)]
struct ComponentMoments {
    weight: f64,
    first: Vector3<f64>,
    second: Matrix3<f64>,
}

impl ComponentMoments {
    fn zero() -> Self {
        Self {
            weight: 0.0,
            first: Vector3::zeros(),
            second: Matrix3::zeros(),
        }
    }
}

/// Fit `gmm` in place to `sample`, starting from its current parameters
///
/// # Errors
///
/// Returns an error for invalid options, an empty sample, or when a
/// convolved covariance stops being positive definite
pub fn fit(gmm: &mut Gmm, sample: &VelocitySample, options: &XdOptions) -> Result<FitOutcome> {
    options.validate()?;
    if sample.is_empty() {
        return Err(insufficient_data("deconvolution", &"sample is empty"));
    }

    let n = sample.len() as f64;
    let noise = sample.covariances();
    let mut previous = f64::NEG_INFINITY;
    let mut outcome = FitOutcome {
        mean_log_likelihood: f64::NEG_INFINITY,
        log_likelihood: f64::NEG_INFINITY,
        iterations: 0,
        converged: false,
    };

    for iteration in 1..=options.max_iterations {
        let (log_likelihood, moments) = expectation(gmm, &sample.points, &noise)?;
        maximization(gmm, &moments, n, options.regularization);

        let mean = log_likelihood / n;
        outcome = FitOutcome {
            mean_log_likelihood: mean,
            log_likelihood,
            iterations: iteration,
            converged: (mean - previous).abs() < options.tolerance,
        };
        if outcome.converged {
            break;
        }
        previous = mean;
    }

    log::debug!(
        "Deconvolution with {} components: logL/N = {:.6} after {} iterations (converged: {})",
        gmm.k(),
        outcome.mean_log_likelihood,
        outcome.iterations,
        outcome.converged
    );

    Ok(outcome)
}

fn expectation(
    gmm: &Gmm,
    points: &[Vector3<f64>],
    noise: &[Matrix3<f64>],
) -> Result<(f64, Vec<ComponentMoments>)> {
    let k = gmm.k();
    let log_weights: Vec<f64> = gmm.weights().iter().map(|w| w.ln()).collect();
    let mut moments = vec![ComponentMoments::zero(); k];
    let mut log_q = vec![0.0; k];
    let mut factors = Vec::with_capacity(k);
    let mut total = 0.0;

    for (x, s) in points.iter().zip(noise) {
        factors.clear();
        for ((slot, log_w), (mu, v)) in log_q
            .iter_mut()
            .zip(&log_weights)
            .zip(gmm.mean.iter().zip(&gmm.covar))
        {
            let factored = FactoredCovariance::factor(&(v + s))?;
            *slot = log_w + factored.log_density(&(x - mu));
            factors.push(factored);
        }

        let normalizer = log_sum_exp(&log_q);
        if !normalizer.is_finite() {
            return Err(computation_error(
                "deconvolution E-step",
                &format!("point {x:?} has zero likelihood under every component"),
            ));
        }
        total += normalizer;

        for (((acc, lq), factored), (mu, v)) in moments
            .iter_mut()
            .zip(&log_q)
            .zip(&factors)
            .zip(gmm.mean.iter().zip(&gmm.covar))
        {
            let q = (lq - normalizer).exp();
            if q == 0.0 {
                continue;
            }
            let gain = v * factored.inverse;
            let b = mu + gain * (x - mu);
            let big_b = v - gain * v;

            acc.weight += q;
            acc.first += b * q;
            acc.second += (b * b.transpose() + big_b) * q;
        }
    }

    Ok((total, moments))
}

fn maximization(gmm: &mut Gmm, moments: &[ComponentMoments], n: f64, regularization: f64) {
    let floor = Matrix3::identity() * regularization;

    for (((amp, mean), covar), m) in gmm
        .amp
        .iter_mut()
        .zip(gmm.mean.iter_mut())
        .zip(gmm.covar.iter_mut())
        .zip(moments)
    {
        *amp = m.weight / n;
        if m.weight < VANISHING_RESPONSIBILITY {
            continue;
        }

        let mu = m.first / m.weight;
        let scatter = m.second - mu * mu.transpose() * m.weight;
        let updated = (scatter + floor) / (m.weight + 1.0);

        *mean = mu;
        *covar = (updated + updated.transpose()) * 0.5;
    }
}
