//! Monte Carlo propagation of astrometric uncertainties into velocities
//!
//! Every star is resampled `n_samples` times from its measurement errors, each
//! realisation is pushed through the Galactocentric transform, and the spread
//! of the resulting velocities is reported as the uncertainty.

use crate::io::configuration::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MC_SAMPLES, DEFAULT_PM_CORRELATION,
    DEFAULT_POSITION_SCATTER_SCALE, MIN_SAMPLED_DISTANCE_PC,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::kinematics::frame::FrameTransform;
use crate::kinematics::velocity::{
    Astrometry, VelocityColumns, VelocityRecord, compute_velocity_components,
};
use crate::math::probability::{normal_draw, sample_correlated_pair};
use ndarray::{Array1, Array2, Axis, aview1};
use rand::Rng;

/// One-sigma measurement errors of a star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AstrometricErrors {
    /// Parallax error, used as the positional scatter in degrees
    pub parallax_error: f64,
    /// Proper motion error in right ascension in mas/yr
    pub pmra_error: f64,
    /// Proper motion error in declination in mas/yr
    pub pmdec_error: f64,
    /// Distance error in parsecs
    pub distance_error: f64,
    /// Line-of-sight velocity error in km/s
    pub vlos_error: f64,
}

impl AstrometricErrors {
    fn validate(&self, row: usize) -> Result<()> {
        let fields = [
            ("parallax_error", self.parallax_error),
            ("pmra_error", self.pmra_error),
            ("pmdec_error", self.pmdec_error),
            ("rpgeo_error", self.distance_error),
            ("radial_velocity_error", self.vlos_error),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid_parameter(
                    name,
                    &value,
                    &format!("standard deviation must be finite and non-negative (row {row})"),
                ));
            }
        }
        Ok(())
    }
}

/// A star with its central astrometry and measurement errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedStar {
    /// Central values
    pub astrometry: Astrometry,
    /// One-sigma errors
    pub errors: AstrometricErrors,
}

/// Monte Carlo propagation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloOptions {
    /// Stars transformed per chunk
    pub chunk_size: usize,
    /// Draws per star
    pub n_samples: usize,
    /// Correlation between the two proper motion errors
    pub correlation_pmra_pmdec: f64,
    /// Multiplier on the positional scatter; zero keeps positions fixed
    pub position_scatter_scale: f64,
}

impl Default for MonteCarloOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            n_samples: DEFAULT_MC_SAMPLES,
            correlation_pmra_pmdec: DEFAULT_PM_CORRELATION,
            position_scatter_scale: DEFAULT_POSITION_SCATTER_SCALE,
        }
    }
}

impl MonteCarloOptions {
    /// Check all settings
    ///
    /// # Errors
    ///
    /// Returns an error for a zero chunk size or sample count, a correlation
    /// outside `[-1, 1]` or a negative scatter scale
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(invalid_parameter(
                "chunk_size",
                &self.chunk_size,
                &"must be at least 1",
            ));
        }
        validate_sampling(
            self.n_samples,
            self.correlation_pmra_pmdec,
            self.position_scatter_scale,
        )
    }
}

fn validate_sampling(n_samples: usize, correlation: f64, position_scale: f64) -> Result<()> {
    if n_samples == 0 {
        return Err(invalid_parameter(
            "n_samples",
            &n_samples,
            &"must be at least 1",
        ));
    }
    if !(-1.0..=1.0).contains(&correlation) {
        return Err(invalid_parameter(
            "correlation_pmra_pmdec",
            &correlation,
            &"must lie in [-1, 1]",
        ));
    }
    if !(position_scale.is_finite() && position_scale >= 0.0) {
        return Err(invalid_parameter(
            "position_scatter_scale",
            &position_scale,
            &"must be finite and non-negative",
        ));
    }
    Ok(())
}

/// Resampled astrometry with shape `(num_stars, n_samples)` per quantity
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloSamples {
    /// Right ascension in degrees, wrapped to `[0, 360)`
    pub ra: Array2<f64>,
    /// Declination in degrees, clipped to `[-90, 90]`
    pub dec: Array2<f64>,
    /// Distance in parsecs, clipped away from zero
    pub distance: Array2<f64>,
    /// Proper motion in right ascension in mas/yr
    pub pmra: Array2<f64>,
    /// Proper motion in declination in mas/yr
    pub pmdec: Array2<f64>,
    /// Line-of-sight velocity in km/s
    pub vlos: Array2<f64>,
}

impl MonteCarloSamples {
    fn zeros(shape: (usize, usize)) -> Self {
        Self {
            ra: Array2::zeros(shape),
            dec: Array2::zeros(shape),
            distance: Array2::zeros(shape),
            pmra: Array2::zeros(shape),
            pmdec: Array2::zeros(shape),
            vlos: Array2::zeros(shape),
        }
    }

    /// `(num_stars, n_samples)`
    pub fn dim(&self) -> (usize, usize) {
        self.ra.dim()
    }

    /// Astrometry of every star in sample column `sample`
    pub fn column(&self, sample: usize) -> Vec<Astrometry> {
        let column = |a: &Array2<f64>| a.column(sample).to_vec();
        let ra = column(&self.ra);
        let dec = column(&self.dec);
        let distance = column(&self.distance);
        let pmra = column(&self.pmra);
        let pmdec = column(&self.pmdec);
        let vlos = column(&self.vlos);

        (0..ra.len())
            .map(|i| Astrometry {
                ra_deg: ra.get(i).copied().unwrap_or(f64::NAN),
                dec_deg: dec.get(i).copied().unwrap_or(f64::NAN),
                distance_pc: distance.get(i).copied().unwrap_or(f64::NAN),
                pmra_masyr: pmra.get(i).copied().unwrap_or(f64::NAN),
                pmdec_masyr: pmdec.get(i).copied().unwrap_or(f64::NAN),
                vlos_kms: vlos.get(i).copied().unwrap_or(f64::NAN),
            })
            .collect()
    }
}

/// Velocity components for every Monte Carlo sample
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySamples {
    /// Radial components, `(num_stars, n_samples)`
    pub v_r: Array2<f64>,
    /// Azimuthal components
    pub v_phi: Array2<f64>,
    /// Vertical components
    pub v_z: Array2<f64>,
}

impl VelocitySamples {
    /// Per-star standard deviation across samples for each component
    ///
    /// A star with any NaN sample gets a NaN uncertainty.
    pub fn standard_deviations(&self) -> [Array1<f64>; 3] {
        [
            self.v_r.std_axis(Axis(1), 0.0),
            self.v_phi.std_axis(Axis(1), 0.0),
            self.v_z.std_axis(Axis(1), 0.0),
        ]
    }
}

// Keeps NaN, unlike f64::max
fn clip_lower(value: f64, lower: f64) -> f64 {
    if value < lower { lower } else { value }
}

fn store(array: &mut Array2<f64>, index: [usize; 2], value: f64) {
    if let Some(slot) = array.get_mut(index) {
        *slot = value;
    }
}

/// Draw `n_samples` realisations of every star from its errors
///
/// Positions scatter by the parallax error (in degrees) times
/// `position_scale`; proper motions are drawn jointly with correlation
/// `correlation`.
///
/// # Errors
///
/// Returns an error for a zero sample count, a correlation outside
/// `[-1, 1]`, a negative scale or a negative or non-finite measurement
/// error
pub fn generate_monte_carlo_samples<R: Rng + ?Sized>(
    stars: &[ObservedStar],
    n_samples: usize,
    correlation: f64,
    position_scale: f64,
    rng: &mut R,
    progress: &ProgressManager,
) -> Result<MonteCarloSamples> {
    validate_sampling(n_samples, correlation, position_scale)?;

    let mut samples = MonteCarloSamples::zeros((stars.len(), n_samples));
    let bar = progress.stage("Generating Monte Carlo samples", stars.len());

    for (i, star) in stars.iter().enumerate() {
        star.errors.validate(i)?;
        let a = &star.astrometry;
        let e = &star.errors;
        let position_sigma = e.parallax_error * position_scale;

        for j in 0..n_samples {
            let ra = normal_draw(a.ra_deg, position_sigma, rng).rem_euclid(360.0);
            let dec = normal_draw(a.dec_deg, position_sigma, rng).clamp(-90.0, 90.0);
            let distance = clip_lower(
                normal_draw(a.distance_pc, e.distance_error, rng),
                MIN_SAMPLED_DISTANCE_PC,
            );
            let vlos = normal_draw(a.vlos_kms, e.vlos_error, rng);
            let [pmra, pmdec] = sample_correlated_pair(
                [a.pmra_masyr, a.pmdec_masyr],
                [e.pmra_error, e.pmdec_error],
                correlation,
                rng,
            );

            store(&mut samples.ra, [i, j], ra);
            store(&mut samples.dec, [i, j], dec);
            store(&mut samples.distance, [i, j], distance);
            store(&mut samples.pmra, [i, j], pmra);
            store(&mut samples.pmdec, [i, j], pmdec);
            store(&mut samples.vlos, [i, j], vlos);
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    Ok(samples)
}

/// Transform every sample column into cylindrical velocities
pub fn compute_velocity_components_for_samples(
    samples: &MonteCarloSamples,
    transform: &FrameTransform,
    progress: &ProgressManager,
) -> VelocitySamples {
    let shape = samples.dim();
    let mut velocities = VelocitySamples {
        v_r: Array2::zeros(shape),
        v_phi: Array2::zeros(shape),
        v_z: Array2::zeros(shape),
    };
    let bar = progress.stage("Computing velocities for samples", shape.1);

    for j in 0..shape.1 {
        let VelocityColumns { v_r, v_phi, v_z } =
            compute_velocity_components(&samples.column(j), transform);
        velocities.v_r.column_mut(j).assign(&aview1(&v_r));
        velocities.v_phi.column_mut(j).assign(&aview1(&v_phi));
        velocities.v_z.column_mut(j).assign(&aview1(&v_z));
        bar.inc(1);
    }

    bar.finish_and_clear();
    velocities
}

/// Propagate uncertainties for a whole catalogue, chunk by chunk
///
/// Each output row holds the velocity of the central astrometry and the
/// population standard deviation of the sampled velocities. Rows keep the
/// input order.
///
/// # Errors
///
/// Returns an error if the options are invalid or a star has a negative or
/// non-finite measurement error
pub fn process_data_monte_carlo<R: Rng + ?Sized>(
    stars: &[ObservedStar],
    transform: &FrameTransform,
    options: &MonteCarloOptions,
    rng: &mut R,
    progress: &ProgressManager,
) -> Result<Vec<VelocityRecord>> {
    options.validate()?;

    let num_chunks = stars.len().div_ceil(options.chunk_size);
    let mut records = Vec::with_capacity(stars.len());

    for (chunk_index, chunk) in stars.chunks(options.chunk_size).enumerate() {
        let samples = generate_monte_carlo_samples(
            chunk,
            options.n_samples,
            options.correlation_pmra_pmdec,
            options.position_scatter_scale,
            rng,
            progress,
        )?;
        let sampled = compute_velocity_components_for_samples(&samples, transform, progress);
        let [sigma_r, sigma_phi, sigma_z] = sampled.standard_deviations();

        let central: Vec<Astrometry> = chunk.iter().map(|s| s.astrometry).collect();
        let nominal = compute_velocity_components(&central, transform);

        for i in 0..chunk.len() {
            let Some(velocity) = nominal.get(i) else {
                continue;
            };
            records.push(VelocityRecord {
                v_r: velocity.v_r,
                v_phi: velocity.v_phi,
                v_z: velocity.v_z,
                v_r_uncertainty: sigma_r.get(i).copied().unwrap_or(f64::NAN),
                v_phi_uncertainty: sigma_phi.get(i).copied().unwrap_or(f64::NAN),
                v_z_uncertainty: sigma_z.get(i).copied().unwrap_or(f64::NAN),
            });
        }

        log::info!("Processed chunk {}/{num_chunks}", chunk_index + 1);
    }

    Ok(records)
}
