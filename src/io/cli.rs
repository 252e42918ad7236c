//! Command-line interface for the velocity, BIC, fitting and residual stages

use crate::analysis::ellipse::{component_ellipses, resolve_colors};
use crate::analysis::residual::{
    ResidualOptions, compute_residual_map, run_residual_analysis,
};
use crate::io::configuration::{
    COMPONENT_ELLIPSE_SIGMA, DEFAULT_BINS, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_COMPONENTS,
    DEFAULT_MC_SAMPLES, DEFAULT_N_INIT, DEFAULT_PM_CORRELATION, DEFAULT_POSITION_SCATTER_SCALE,
    DEFAULT_REALIZATIONS, DEFAULT_REGULARIZATION, DEFAULT_SEED,
};
use crate::io::error::Result;
use crate::io::image::{export_gmm_density, export_residual_map};
use crate::io::model::{load_gmm, save_gmm};
use crate::io::progress::ProgressManager;
use crate::io::table::{
    read_stars, read_velocities, write_bic_table, write_disc_fraction_curve, write_velocities,
};
use crate::kinematics::frame::GalactocentricFrame;
use crate::kinematics::montecarlo::{MonteCarloOptions, process_data_monte_carlo};
use crate::mixture::deconvolution::{VelocitySample, XdOptions};
use crate::mixture::report::extract_gmm_parameters;
use crate::mixture::selection::{
    compute_bic_vs_n_components, fit_gmm_fixed_components, preferred_component_count,
};
use crate::spatial::histogram::Histogram2d;
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "galkin")]
#[command(
    author,
    version,
    about = "Galactocentric velocities, extreme deconvolution fits and thick-disc residual tests"
)]
/// Command-line arguments for the analysis tool
pub struct Cli {
    /// Random seed for reproducible sampling and fitting
    #[arg(short, long, global = true, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stage to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Galactocentric frame parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FramePreset {
    /// Current solar position and motion
    #[value(name = "v4.0")]
    V4_0,
    /// Parameters used before the v4.0 update
    #[value(name = "pre-v4.0")]
    PreV4_0,
}

impl FramePreset {
    /// Frame parameters of the preset
    pub const fn frame(self) -> GalactocentricFrame {
        match self {
            Self::V4_0 => GalactocentricFrame::v4_0(),
            Self::PreV4_0 => GalactocentricFrame::pre_v4_0(),
        }
    }
}

/// Analysis stages
#[derive(Subcommand)]
pub enum Command {
    /// Convert a star catalogue to cylindrical velocities with Monte Carlo uncertainties
    Velocities {
        /// Star catalogue CSV
        input: PathBuf,
        /// Velocity table CSV to write
        output: PathBuf,
        /// Monte Carlo draws per star
        #[arg(long, default_value_t = DEFAULT_MC_SAMPLES)]
        samples: usize,
        /// Stars transformed per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Correlation between the proper motion errors
        #[arg(long, default_value_t = DEFAULT_PM_CORRELATION, allow_negative_numbers = true)]
        pm_correlation: f64,
        /// Multiplier on the positional scatter (0 disables it)
        #[arg(long, default_value_t = DEFAULT_POSITION_SCATTER_SCALE)]
        position_scatter_scale: f64,
        /// Galactocentric frame parameters
        #[arg(long, value_enum, default_value_t = FramePreset::V4_0)]
        frame: FramePreset,
    },

    /// Scan BIC against the number of mixture components
    Bic {
        /// Velocity table CSV
        input: PathBuf,
        /// Largest component count to fit
        #[arg(long, default_value_t = DEFAULT_MAX_COMPONENTS)]
        max_components: usize,
        /// Fits per component count
        #[arg(long, default_value_t = DEFAULT_N_INIT)]
        n_init: usize,
        /// Covariance regularisation in km²/s²
        #[arg(long, default_value_t = DEFAULT_REGULARIZATION)]
        regularization: f64,
        /// Optional CSV with every BIC value
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fit a mixture with a fixed number of components
    Fit {
        /// Velocity table CSV
        input: PathBuf,
        /// Mixture JSON to write
        output: PathBuf,
        /// Number of components
        #[arg(short = 'k', long)]
        components: usize,
        /// Independent initialisations
        #[arg(long, default_value_t = DEFAULT_N_INIT)]
        n_init: usize,
        /// Covariance regularisation in km²/s²
        #[arg(long, default_value_t = DEFAULT_REGULARIZATION)]
        regularization: f64,
        /// Heading of the component table
        #[arg(long, default_value = "GMM components")]
        label: String,
        /// Optional PNG of the density with component ellipses
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Compare a fitted mixture with the data inside the thick-disc ellipse
    Residual {
        /// Velocity table CSV
        input: PathBuf,
        /// Mixture JSON written by `fit`
        model: PathBuf,
        /// Disc fractions to inject
        #[arg(long, value_delimiter = ',', default_value = "0,0.01,0.02,0.05,0.1")]
        fractions: Vec<f64>,
        /// Realisations per estimate
        #[arg(long, default_value_t = DEFAULT_REALIZATIONS)]
        realizations: usize,
        /// Histogram bins per axis for the residual map
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
        /// Optional PNG of one residual map realisation
        #[arg(long)]
        map: Option<PathBuf>,
        /// Optional CSV of the injected residual curve
        #[arg(long)]
        curve: Option<PathBuf>,
    },
}

/// Runs the selected stage and writes its report to stdout
pub struct CommandRunner {
    cli: Cli,
    progress: ProgressManager,
    rng: StdRng,
}

impl CommandRunner {
    /// Create a runner seeded from the command line
    pub fn new(cli: Cli) -> Self {
        let progress = ProgressManager::new(cli.should_show_progress());
        let rng = StdRng::seed_from_u64(cli.seed);
        Self { cli, progress, rng }
    }

    /// Execute the selected stage
    ///
    /// # Errors
    ///
    /// Returns an error if reading the inputs, the analysis itself or writing
    /// any output fails
    pub fn run(&mut self) -> Result<()> {
        let start_time = Instant::now();
        let mut out = std::io::stdout().lock();

        match &self.cli.command {
            Command::Velocities {
                input,
                output,
                samples,
                chunk_size,
                pm_correlation,
                position_scatter_scale,
                frame,
            } => {
                let options = MonteCarloOptions {
                    chunk_size: *chunk_size,
                    n_samples: *samples,
                    correlation_pmra_pmdec: *pm_correlation,
                    position_scatter_scale: *position_scatter_scale,
                };
                let stars = read_stars(input)?;
                let transform = frame.frame().transform()?;
                let records = process_data_monte_carlo(
                    &stars,
                    &transform,
                    &options,
                    &mut self.rng,
                    &self.progress,
                )?;
                write_velocities(output, &records)?;

                let valid = records.iter().filter(|r| r.is_finite()).count();
                writeln!(
                    out,
                    "Wrote {} velocities ({valid} finite) to {}",
                    records.len(),
                    output.display()
                )?;
            }

            Command::Bic {
                input,
                max_components,
                n_init,
                regularization,
                output,
            } => {
                let sample = load_sample(input)?;
                let options = xd_options(*regularization);
                let values = compute_bic_vs_n_components(
                    &sample,
                    *max_components,
                    *n_init,
                    &options,
                    &mut self.rng,
                    &self.progress,
                )?;

                writeln!(out, "{:>12} {:>14} {:>14}", "Components", "Best BIC", "Mean BIC")?;
                for (k, scores) in &values {
                    // Failed runs are NaN
                    let finite: Vec<f64> = scores.iter().copied().filter(|v| v.is_finite()).collect();
                    let best = finite.iter().copied().fold(f64::NAN, f64::min);
                    let mean = crate::math::probability::population_mean(&finite);
                    writeln!(out, "{k:>12} {best:>14.2} {mean:>14.2}")?;
                }
                if let Some(k) = preferred_component_count(&values) {
                    writeln!(out, "Lowest BIC at {k} components")?;
                }
                if let Some(path) = output {
                    write_bic_table(path, &values)?;
                }
            }

            Command::Fit {
                input,
                output,
                components,
                n_init,
                regularization,
                label,
                plot,
            } => {
                let sample = load_sample(input)?;
                let fitted = fit_gmm_fixed_components(
                    &sample,
                    *components,
                    *n_init,
                    &xd_options(*regularization),
                    &mut self.rng,
                    &self.progress,
                )?;
                save_gmm(&fitted.gmm, output)?;

                let table = extract_gmm_parameters(&fitted.gmm, sample.len(), label, None)?;
                writeln!(out, "{table}")?;
                writeln!(
                    out,
                    "Mean log-likelihood {:.4} after {} iterations{}",
                    fitted.outcome.mean_log_likelihood,
                    fitted.outcome.iterations,
                    if fitted.outcome.converged {
                        ""
                    } else {
                        " (not converged)"
                    }
                )?;

                if let Some(path) = plot {
                    let defaults = ResidualOptions::default();
                    let histogram = Histogram2d::from_points(
                        sample.points.iter().map(|p| (p.x, p.y)),
                        defaults.vr_limits,
                        defaults.vphi_limits,
                        defaults.bins,
                    )?;
                    let ellipses = component_ellipses(&fitted.gmm, COMPONENT_ELLIPSE_SIGMA);
                    let colors = resolve_colors(None, fitted.gmm.k())?;
                    export_gmm_density(&histogram, &ellipses, &colors, path)?;
                }
            }

            Command::Residual {
                input,
                model,
                fractions,
                realizations,
                bins,
                map,
                curve,
            } => {
                let options = ResidualOptions {
                    n_realizations: *realizations,
                    bins: *bins,
                    ..ResidualOptions::default()
                };
                options.validate()?;

                let sample = load_sample(input)?;
                let gmm = load_gmm(model)?;
                let results = run_residual_analysis(
                    &sample,
                    &gmm,
                    fractions,
                    options.n_realizations,
                    &options.disc,
                    &mut self.rng,
                    &self.progress,
                )?;

                writeln!(
                    out,
                    "Observed residual: {:.2} ± {:.2}",
                    results.observed_mean, results.observed_std
                )?;
                writeln!(out, "{:>10} {:>12} {:>12}", "Fraction", "Mean", "Std")?;
                for ((fraction, mean), std) in fractions
                    .iter()
                    .zip(&results.fraction_means)
                    .zip(&results.fraction_stds)
                {
                    writeln!(out, "{fraction:>10.3} {mean:>12.2} {std:>12.2}")?;
                }
                match results.minimum_detectable_fraction(fractions) {
                    Some(f) => writeln!(out, "Smallest detectable disc fraction: {f}")?,
                    None => writeln!(out, "No injected fraction is detectable")?,
                }

                if let Some(path) = curve {
                    write_disc_fraction_curve(
                        path,
                        fractions,
                        &results.fraction_means,
                        &results.fraction_stds,
                    )?;
                }
                if let Some(path) = map {
                    let residual = compute_residual_map(
                        &sample,
                        &gmm,
                        options.bins,
                        options.vr_limits,
                        options.vphi_limits,
                        &mut self.rng,
                    )?;
                    export_residual_map(&residual, &options.disc, path)?;
                }
            }
        }

        self.progress.finish();
        log::info!("Finished in {:.2?}", start_time.elapsed());
        Ok(())
    }
}

fn xd_options(regularization: f64) -> XdOptions {
    XdOptions {
        regularization,
        ..XdOptions::default()
    }
}

fn load_sample(path: &Path) -> Result<VelocitySample> {
    let records = read_velocities(path)?;
    let sample = VelocitySample::from_records(&records);
    log::info!(
        "Loaded {} of {} velocity rows from {}",
        sample.len(),
        records.len(),
        path.display()
    );
    Ok(sample)
}
