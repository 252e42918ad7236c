//! Gaussian mixture in three-dimensional velocity space

use crate::io::error::{Result, computation_error, invalid_parameter};
use crate::math::linalg::{FactoredCovariance, cholesky_lower};
use crate::math::probability::{log_sum_exp, standard_normal_vector};
use nalgebra::{Matrix3, Vector3};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Mixture of `K` full-covariance Gaussians
#[derive(Debug, Clone, PartialEq)]
pub struct Gmm {
    /// Component amplitudes (not necessarily normalised)
    pub amp: Vec<f64>,
    /// Component means
    pub mean: Vec<Vector3<f64>>,
    /// Component covariances
    pub covar: Vec<Matrix3<f64>>,
}

impl Gmm {
    /// Build a mixture after validating its parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the component lists differ in length, are empty,
    /// or the amplitudes are negative, non-finite or sum to zero
    pub fn new(amp: Vec<f64>, mean: Vec<Vector3<f64>>, covar: Vec<Matrix3<f64>>) -> Result<Self> {
        if amp.is_empty() {
            return Err(invalid_parameter("amp", &0, &"mixture needs a component"));
        }
        if mean.len() != amp.len() || covar.len() != amp.len() {
            return Err(invalid_parameter(
                "mean",
                &format!("{} means, {} covariances", mean.len(), covar.len()),
                &format!("expected {} of each", amp.len()),
            ));
        }
        if amp.iter().any(|a| !a.is_finite() || *a < 0.0) || amp.iter().sum::<f64>() <= 0.0 {
            return Err(invalid_parameter(
                "amp",
                &format!("{amp:?}"),
                &"amplitudes must be finite, non-negative and not all zero",
            ));
        }

        Ok(Self { amp, mean, covar })
    }

    /// Number of components
    pub const fn k(&self) -> usize {
        self.amp.len()
    }

    /// Amplitudes normalised to sum to one
    pub fn weights(&self) -> Vec<f64> {
        let total: f64 = self.amp.iter().sum();
        self.amp.iter().map(|a| a / total).collect()
    }

    /// Amplitudes as percentages of the total
    pub fn weight_percentages(&self) -> Vec<f64> {
        self.weights().into_iter().map(|w| w * 100.0).collect()
    }

    /// Draw `n` points from the mixture
    ///
    /// # Errors
    ///
    /// Returns an error if a covariance is not positive definite
    pub fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<Vector3<f64>>> {
        let factors = self
            .covar
            .iter()
            .map(cholesky_lower)
            .collect::<Result<Vec<_>>>()?;
        let chooser = WeightedIndex::new(&self.amp)
            .map_err(|e| computation_error("mixture draw", &e))?;

        let points = (0..n)
            .map(|_| {
                let component = chooser.sample(rng);
                let mean = self.mean.get(component).copied().unwrap_or_else(Vector3::zeros);
                let factor = factors.get(component).copied().unwrap_or_else(Matrix3::zeros);
                mean + factor * standard_normal_vector(rng)
            })
            .collect();

        Ok(points)
    }

    /// Per-point log-likelihood with each point's own error covariance
    ///
    /// The density of point `i` convolves every component with that point's
    /// error covariance `errors[i]`.
    ///
    /// # Errors
    ///
    /// Returns an error if lengths differ or a convolved covariance is not
    /// positive definite
    pub fn log_likelihood(
        &self,
        points: &[Vector3<f64>],
        errors: &[Matrix3<f64>],
    ) -> Result<Vec<f64>> {
        if points.len() != errors.len() {
            return Err(invalid_parameter(
                "errors",
                &errors.len(),
                &format!("expected one covariance per point ({})", points.len()),
            ));
        }

        let log_weights: Vec<f64> = self.weights().iter().map(|w| w.ln()).collect();
        let mut terms = vec![0.0; self.k()];

        points
            .iter()
            .zip(errors)
            .map(|(x, s)| -> Result<f64> {
                for (((term, log_w), mu), v) in terms
                    .iter_mut()
                    .zip(&log_weights)
                    .zip(&self.mean)
                    .zip(&self.covar)
                {
                    *term = log_w + FactoredCovariance::factor(&(v + s))?.log_density(&(x - mu));
                }
                Ok(log_sum_exp(&terms))
            })
            .collect()
    }
}
