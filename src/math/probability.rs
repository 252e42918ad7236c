//! Probability helpers and random draws used by the Monte Carlo stages

use nalgebra::Vector3;
use num_traits::{Float, NumCast};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Numerically stable `ln(Σ exp(vᵢ))`
///
/// Returns negative infinity for an empty slice or when every value is
/// negative infinity.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() && max.is_sign_negative() {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Arithmetic mean; NaN for an empty slice or when any value is NaN
pub fn population_mean<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::nan();
    }
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    sum / <T as NumCast>::from(values.len()).unwrap_or_else(T::nan)
}

/// Standard deviation normalised by the count (zero degrees of freedom)
pub fn population_std<T: Float>(values: &[T]) -> T {
    let mean = population_mean(values);
    if mean.is_nan() {
        return T::nan();
    }
    let sum_sq = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - mean) * (v - mean));
    (sum_sq / <T as NumCast>::from(values.len()).unwrap_or_else(T::nan)).sqrt()
}

/// One draw from `N(mean, sigma²)`
pub fn normal_draw<R: Rng + ?Sized>(mean: f64, sigma: f64, rng: &mut R) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    sigma.mul_add(z, mean)
}

/// One draw from a bivariate normal with correlation `rho`
///
/// Uses the closed-form Cholesky factor of
/// `[[σ₁², ρσ₁σ₂], [ρσ₁σ₂, σ₂²]]`.
pub fn sample_correlated_pair<R: Rng + ?Sized>(
    mean: [f64; 2],
    sigma: [f64; 2],
    rho: f64,
    rng: &mut R,
) -> [f64; 2] {
    let z1: f64 = StandardNormal.sample(rng);
    let z2: f64 = StandardNormal.sample(rng);
    let orthogonal = rho.mul_add(-rho, 1.0).max(0.0).sqrt();

    [
        sigma[0].mul_add(z1, mean[0]),
        sigma[1].mul_add(rho.mul_add(z1, orthogonal * z2), mean[1]),
    ]
}

/// Vector of three independent standard normal draws
pub fn standard_normal_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    Vector3::new(
        StandardNormal.sample(rng),
        StandardNormal.sample(rng),
        StandardNormal.sample(rng),
    )
}
