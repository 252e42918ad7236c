//! Restarted fits and model-complexity selection by BIC

use crate::io::error::{AnalysisError, Result, insufficient_data, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::mixture::deconvolution::{FitOutcome, VelocitySample, XdOptions, fit};
use crate::mixture::kmeans::init_from_kmeans;
use crate::mixture::model::Gmm;
use rand::Rng;
use std::collections::BTreeMap;

/// Free parameters per component in three dimensions: weight, mean, covariance
const PARAMETERS_PER_COMPONENT: usize = 1 + 3 + 6;

/// A deconvolved mixture and the statistics of its best run
#[derive(Debug, Clone, PartialEq)]
pub struct FittedMixture {
    /// Fitted mixture
    pub gmm: Gmm,
    /// Likelihood and convergence of the selected run
    pub outcome: FitOutcome,
}

fn single_fit<R: Rng + ?Sized>(
    sample: &VelocitySample,
    n_components: usize,
    options: &XdOptions,
    rng: &mut R,
) -> Result<FittedMixture> {
    let mut gmm = init_from_kmeans(&sample.points, n_components, options.regularization, rng)?;
    let outcome = fit(&mut gmm, sample, options)?;
    Ok(FittedMixture { gmm, outcome })
}

fn validate_restarts(n_init: usize) -> Result<()> {
    if n_init == 0 {
        return Err(invalid_parameter("n_init", &n_init, &"must be at least 1"));
    }
    Ok(())
}

/// Fit `n_components` Gaussians `n_init` times and keep the most likely run
///
/// # Errors
///
/// Returns an error if `n_init` is zero, the sample has fewer stars than
/// components, or every run fails numerically
pub fn fit_gmm_fixed_components<R: Rng + ?Sized>(
    sample: &VelocitySample,
    n_components: usize,
    n_init: usize,
    options: &XdOptions,
    rng: &mut R,
    progress: &ProgressManager,
) -> Result<FittedMixture> {
    validate_restarts(n_init)?;
    options.validate()?;

    let bar = progress.stage(
        &format!("Fitting GMM with {n_components} components"),
        n_init,
    );
    let mut best: Option<FittedMixture> = None;
    let mut last_error = None;

    for _ in 0..n_init {
        match single_fit(sample, n_components, options, rng) {
            Ok(candidate) => {
                let better = best.as_ref().is_none_or(|b| {
                    candidate.outcome.log_likelihood > b.outcome.log_likelihood
                });
                if better {
                    best = Some(candidate);
                }
            }
            Err(error @ AnalysisError::InsufficientData { .. }) => {
                return Err(error);
            }
            Err(error) => {
                log::warn!("Discarding failed initialisation: {error}");
                last_error = Some(error);
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    best.ok_or_else(|| {
        last_error.unwrap_or_else(|| insufficient_data("mixture fit", &"no run completed"))
    })
}

/// Number of free parameters of a `k`-component mixture
pub const fn parameter_count(n_components: usize) -> usize {
    (PARAMETERS_PER_COMPONENT * n_components).saturating_sub(1)
}

/// Bayesian Information Criterion `p·ln(n) − 2·ln L`
///
/// `log_likelihood` is taken as given; the component scan passes the mean
/// log-likelihood per star.
pub fn bic(log_likelihood: f64, n_points: usize, n_components: usize) -> f64 {
    (parameter_count(n_components) as f64).mul_add((n_points as f64).ln(), -2.0 * log_likelihood)
}

/// BIC of `n_init` independent fits for every component count up to
/// `max_components`
///
/// Each value is `bic` of the run's mean log-likelihood per star. A run
/// that fails numerically is logged and recorded as `NaN`, so every list
/// holds exactly `n_init` values.
///
/// # Errors
///
/// Returns an error for zero `max_components` or `n_init`, or a sample with
/// fewer stars than `max_components`
pub fn compute_bic_vs_n_components<R: Rng + ?Sized>(
    sample: &VelocitySample,
    max_components: usize,
    n_init: usize,
    options: &XdOptions,
    rng: &mut R,
    progress: &ProgressManager,
) -> Result<BTreeMap<usize, Vec<f64>>> {
    validate_restarts(n_init)?;
    options.validate()?;
    if max_components == 0 {
        return Err(invalid_parameter(
            "max_components",
            &max_components,
            &"must be at least 1",
        ));
    }
    if sample.len() < max_components {
        return Err(insufficient_data(
            "BIC scan",
            &format!(
                "{} stars cannot support {max_components} components",
                sample.len()
            ),
        ));
    }

    log::info!("Computing BIC for 1..={max_components} components");
    let bar = progress.stage("Fitting GMMs", max_components);
    let mut values = BTreeMap::new();

    for n_components in 1..=max_components {
        let mut scores = Vec::with_capacity(n_init);
        for _ in 0..n_init {
            match single_fit(sample, n_components, options, rng) {
                Ok(run) => scores.push(bic(
                    run.outcome.mean_log_likelihood,
                    sample.len(),
                    n_components,
                )),
                Err(error) => {
                    log::warn!("BIC run with {n_components} components failed: {error}");
                    scores.push(f64::NAN);
                }
            }
        }
        values.insert(n_components, scores);
        bar.inc(1);
    }

    bar.finish_and_clear();
    Ok(values)
}

/// Component count whose best run has the lowest BIC
pub fn preferred_component_count(bic_values: &BTreeMap<usize, Vec<f64>>) -> Option<usize> {
    bic_values
        .iter()
        .filter_map(|(&k, scores)| {
            scores
                .iter()
                .copied()
                .filter(|s| s.is_finite())
                .min_by(f64::total_cmp)
                .map(|best| (k, best))
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(k, _)| k)
}
