//! Residual and injection-recovery tests for a thick-disc component
//!
//! A fitted mixture is resampled, convolved with the uncertainty of the
//! nearest observed star, and compared with the observations inside the
//! thick-disc selection ellipse. Injecting known fractions of disc stars into
//! the mocks calibrates how large a residual a real disc would leave.

use crate::io::configuration::{
    DEFAULT_BINS, DEFAULT_REALIZATIONS, DEFAULT_VPHI_LIMITS, DEFAULT_VR_LIMITS, DISC_DISPERSION,
    DISC_MEAN, DISC_SELECTION_SIGMA, MAX_DISC_FRACTION, RESIDUAL_EPSILON,
};
use crate::io::error::{Result, insufficient_data, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::math::probability::{population_mean, population_std, standard_normal_vector};
use crate::mixture::deconvolution::VelocitySample;
use crate::mixture::model::Gmm;
use crate::spatial::histogram::Histogram2d;
use crate::spatial::kdtree::KdTree;
use nalgebra::Vector3;
use ndarray::Array2;
use rand::Rng;

/// Gaussian velocity model of the thick disc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscModel {
    /// Mean `(v_R, v_phi, v_Z)` in km/s
    pub mean: Vector3<f64>,
    /// Dispersion per component in km/s
    pub dispersion: Vector3<f64>,
    /// Selection ellipse size in dispersions
    pub selection_sigma: f64,
}

impl Default for DiscModel {
    fn default() -> Self {
        Self {
            mean: Vector3::from(DISC_MEAN),
            dispersion: Vector3::from(DISC_DISPERSION),
            selection_sigma: DISC_SELECTION_SIGMA,
        }
    }
}

impl DiscModel {
    /// Ellipse centre in the `(v_R, v_phi)` plane
    pub fn center(&self) -> (f64, f64) {
        (self.mean.x, self.mean.y)
    }

    /// Ellipse half-axes along `v_R` and `v_phi`
    pub fn half_widths(&self) -> (f64, f64) {
        (
            self.selection_sigma * self.dispersion.x,
            self.selection_sigma * self.dispersion.y,
        )
    }

    /// Whether a velocity falls inside the selection ellipse
    pub fn contains(&self, velocity: &Vector3<f64>) -> bool {
        let (half_width, half_height) = self.half_widths();
        inside_ellipse(
            velocity.x,
            velocity.y,
            self.center(),
            half_width,
            half_height,
        )
    }

    /// Draw `n` disc stars
    pub fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vector3<f64>> {
        (0..n)
            .map(|_| {
                self.mean
                    + self
                        .dispersion
                        .component_mul(&standard_normal_vector(rng))
            })
            .collect()
    }
}

/// Whether `(x, y)` lies inside an axis-aligned ellipse (boundary included)
pub fn inside_ellipse(
    x: f64,
    y: f64,
    center: (f64, f64),
    half_width: f64,
    half_height: f64,
) -> bool {
    let u = (x - center.0) / half_width;
    let v = (y - center.1) / half_height;
    u.mul_add(u, v * v) <= 1.0
}

/// Number of velocities inside the disc selection ellipse
pub fn count_inside(points: &[Vector3<f64>], disc: &DiscModel) -> usize {
    points.iter().filter(|p| disc.contains(p)).count()
}

/// Assigns observational noise to mock stars by nearest observed neighbour
#[derive(Debug, Clone)]
pub struct NoiseModel<'a> {
    tree: KdTree<'a>,
    errors: &'a [Vector3<f64>],
}

impl<'a> NoiseModel<'a> {
    /// Index the observed stars and their uncertainties
    ///
    /// # Errors
    ///
    /// Returns an error if there are no observed stars or the lists differ
    /// in length
    pub fn new(obs_stars: &'a [Vector3<f64>], obs_errors: &'a [Vector3<f64>]) -> Result<Self> {
        if obs_stars.is_empty() {
            return Err(insufficient_data("noise assignment", &"no observed stars"));
        }
        if obs_stars.len() != obs_errors.len() {
            return Err(invalid_parameter(
                "obs_errors",
                &obs_errors.len(),
                &format!("expected one uncertainty per star ({})", obs_stars.len()),
            ));
        }
        Ok(Self {
            tree: KdTree::build(obs_stars),
            errors: obs_errors,
        })
    }

    /// Perturb every mock star by the uncertainty of its nearest observed star
    ///
    /// Mock stars with NaN coordinates pass through unchanged.
    pub fn apply<R: Rng + ?Sized>(&self, mock: &[Vector3<f64>], rng: &mut R) -> Vec<Vector3<f64>> {
        mock.iter()
            .map(|star| {
                let sigma = self
                    .tree
                    .nearest(star)
                    .and_then(|index| self.errors.get(index));
                match sigma {
                    Some(sigma) => star + sigma.component_mul(&standard_normal_vector(rng)),
                    None => *star,
                }
            })
            .collect()
    }
}

/// Perturb mock stars with the uncertainties of their nearest observed stars
///
/// # Errors
///
/// Returns an error if there are no observed stars or the lists differ in
/// length
pub fn assign_uncertainties<R: Rng + ?Sized>(
    mock_stars: &[Vector3<f64>],
    obs_stars: &[Vector3<f64>],
    obs_errors: &[Vector3<f64>],
    rng: &mut R,
) -> Result<Vec<Vector3<f64>>> {
    Ok(NoiseModel::new(obs_stars, obs_errors)?.apply(mock_stars, rng))
}

/// Draw as many stars as observed from `gmm` and add observational noise
///
/// # Errors
///
/// Returns an error for an empty sample or a degenerate mixture covariance
pub fn generate_mock_with_errors<R: Rng + ?Sized>(
    gmm: &Gmm,
    sample: &VelocitySample,
    rng: &mut R,
) -> Result<Vec<Vector3<f64>>> {
    let noise = NoiseModel::new(&sample.points, &sample.errors)?;
    let mock = gmm.draw(sample.len(), rng)?;
    Ok(noise.apply(&mock, rng))
}

/// Normalised difference between observed and mock `(v_R, v_phi)` histograms
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualMap {
    /// `(obs − mock) / (obs + mock + ε)` per cell, indexed `[v_R bin, v_phi bin]`
    pub values: Array2<f64>,
    /// Bin edges along `v_R`
    pub x_edges: Vec<f64>,
    /// Bin edges along `v_phi`
    pub y_edges: Vec<f64>,
}

fn plane(points: &[Vector3<f64>]) -> impl Iterator<Item = (f64, f64)> + '_ {
    points.iter().map(|p| (p.x, p.y))
}

/// Residual map between the observations and one noisy mock realisation
///
/// # Errors
///
/// Returns an error for an empty sample, an invalid window or a degenerate
/// mixture covariance
pub fn compute_residual_map<R: Rng + ?Sized>(
    sample: &VelocitySample,
    gmm: &Gmm,
    bins: usize,
    vr_limits: (f64, f64),
    vphi_limits: (f64, f64),
    rng: &mut R,
) -> Result<ResidualMap> {
    let mock = generate_mock_with_errors(gmm, sample, rng)?;

    let observed = Histogram2d::from_points(plane(&sample.points), vr_limits, vphi_limits, bins)?;
    let modelled = Histogram2d::from_points(plane(&mock), vr_limits, vphi_limits, bins)?;

    let values = (&observed.counts - &modelled.counts)
        / (&observed.counts + &modelled.counts + RESIDUAL_EPSILON);

    Ok(ResidualMap {
        values,
        x_edges: observed.x_edges,
        y_edges: observed.y_edges,
    })
}

/// Summary statistics of the residual and injection runs
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualResults {
    /// Mean of observed minus mock disc counts
    pub observed_mean: f64,
    /// Standard deviation of observed minus mock disc counts
    pub observed_std: f64,
    /// Mean injected residual for each disc fraction
    pub fraction_means: Vec<f64>,
    /// Standard deviation of the injected residual for each disc fraction
    pub fraction_stds: Vec<f64>,
}

impl ResidualResults {
    /// Smallest injected fraction whose residual band clears the observed band
    ///
    /// A fraction counts as detectable once `mean − std` of its injected
    /// residual exceeds `mean + std` of the observed residual.
    pub fn minimum_detectable_fraction(&self, disc_fractions: &[f64]) -> Option<f64> {
        let observed_upper = self.observed_mean + self.observed_std;
        disc_fractions
            .iter()
            .zip(self.fraction_means.iter().zip(&self.fraction_stds))
            .find(|(_, (mean, std))| *mean - *std > observed_upper)
            .map(|(fraction, _)| *fraction)
    }
}

/// Settings shared by residual maps and injection runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualOptions {
    /// Monte Carlo realisations per estimate
    pub n_realizations: usize,
    /// Histogram bins per axis
    pub bins: usize,
    /// `v_R` window in km/s
    pub vr_limits: (f64, f64),
    /// `v_phi` window in km/s
    pub vphi_limits: (f64, f64),
    /// Disc model used for selection and injection
    pub disc: DiscModel,
}

impl Default for ResidualOptions {
    fn default() -> Self {
        Self {
            n_realizations: DEFAULT_REALIZATIONS,
            bins: DEFAULT_BINS,
            vr_limits: DEFAULT_VR_LIMITS,
            vphi_limits: DEFAULT_VPHI_LIMITS,
            disc: DiscModel::default(),
        }
    }
}

impl ResidualOptions {
    /// Check the settings before a long run
    ///
    /// # Errors
    ///
    /// Returns an error for zero realisations or bins, an empty window, or a
    /// non-positive disc dispersion
    pub fn validate(&self) -> Result<()> {
        if self.n_realizations == 0 {
            return Err(invalid_parameter(
                "n_realizations",
                &self.n_realizations,
                &"must be at least 1",
            ));
        }
        if self.bins == 0 {
            return Err(invalid_parameter("bins", &self.bins, &"must be at least 1"));
        }
        for (name, (low, high)) in [("vr_limits", self.vr_limits), ("vphi_limits", self.vphi_limits)]
        {
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(invalid_parameter(
                    name,
                    &format!("({low}, {high})"),
                    &"must be a finite interval with lower < upper",
                ));
            }
        }
        if !(self.disc.dispersion.iter().all(|s| *s > 0.0) && self.disc.selection_sigma > 0.0) {
            return Err(invalid_parameter(
                "disc",
                &format!("{:?}", self.disc.dispersion.as_slice()),
                &"dispersion and selection size must be positive",
            ));
        }
        Ok(())
    }
}

/// Test how strongly a thick disc of each injected fraction would show up
///
/// For the observed residual, each realisation compares the observed disc
/// count with that of a noisy mock. For each fraction `f`, a mock with
/// `⌊f·N⌋` extra disc stars is compared with an independent baseline mock.
///
/// # Errors
///
/// Returns an error for an empty sample, zero realisations, a negative,
/// non-finite or oversized fraction, or a degenerate mixture covariance
pub fn run_residual_analysis<R: Rng + ?Sized>(
    sample: &VelocitySample,
    gmm: &Gmm,
    disc_fractions: &[f64],
    n_realizations: usize,
    disc: &DiscModel,
    rng: &mut R,
    progress: &ProgressManager,
) -> Result<ResidualResults> {
    if n_realizations == 0 {
        return Err(invalid_parameter(
            "n_realizations",
            &n_realizations,
            &"must be at least 1",
        ));
    }
    if let Some(bad) = disc_fractions.iter().find(|f| !(f.is_finite() && **f >= 0.0)) {
        return Err(invalid_parameter(
            "disc_fractions",
            bad,
            &"fractions must be finite and non-negative",
        ));
    }
    if let Some(bad) = disc_fractions.iter().find(|f| **f > MAX_DISC_FRACTION) {
        return Err(invalid_parameter(
            "disc_fractions",
            bad,
            &format!("fractions must not exceed {MAX_DISC_FRACTION}"),
        ));
    }

    let noise = NoiseModel::new(&sample.points, &sample.errors)?;
    let n = sample.len();
    let observed_in_disc = count_inside(&sample.points, disc) as f64;

    let bar = progress.stage("Observed residual MC", n_realizations);
    let mut observed = Vec::with_capacity(n_realizations);
    for _ in 0..n_realizations {
        let mock = noise.apply(&gmm.draw(n, rng)?, rng);
        observed.push(observed_in_disc - count_inside(&mock, disc) as f64);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let bar = progress.stage("Injected disc fractions", disc_fractions.len());
    let mut fraction_means = Vec::with_capacity(disc_fractions.len());
    let mut fraction_stds = Vec::with_capacity(disc_fractions.len());
    for &fraction in disc_fractions {
        let n_inject = (fraction * n as f64) as usize;
        let mut residuals = Vec::with_capacity(n_realizations);

        for _ in 0..n_realizations {
            let baseline = noise.apply(&gmm.draw(n, rng)?, rng);
            let baseline_in_disc = count_inside(&baseline, disc) as f64;

            let mut injected = gmm.draw(n, rng)?;
            injected.extend(disc.draw(n_inject, rng));
            let injected = noise.apply(&injected, rng);

            residuals.push(count_inside(&injected, disc) as f64 - baseline_in_disc);
        }

        fraction_means.push(population_mean(&residuals));
        fraction_stds.push(population_std(&residuals));
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok(ResidualResults {
        observed_mean: population_mean(&observed),
        observed_std: population_std(&observed),
        fraction_means,
        fraction_stds,
    })
}
