//! K-means seeding for mixture fits
//!
//! Centroids start from k-means++ and are refined with Lloyd iterations; the
//! resulting partition supplies the starting amplitudes, means and
//! covariances of the mixture.

use crate::io::configuration::KMEANS_MAX_ITERATIONS;
use crate::io::error::{Result, insufficient_data};
use crate::math::linalg::scatter_matrix;
use crate::mixture::model::Gmm;
use nalgebra::{Matrix3, Vector3};
use rand::Rng;

/// Index of the centroid closest to `point`
pub fn nearest_centroid(point: &Vector3<f64>, centroids: &[Vector3<f64>]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, (point - c).norm_squared()))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(i, _)| i)
}

/// Choose `k` initial centroids with distance-squared weighting
pub fn kmeans_plusplus_init<R: Rng + ?Sized>(
    points: &[Vector3<f64>],
    k: usize,
    rng: &mut R,
) -> Vec<Vector3<f64>> {
    let mut centroids = Vec::with_capacity(k);
    if points.is_empty() || k == 0 {
        return centroids;
    }

    if let Some(first) = points.get(rng.random_range(0..points.len())) {
        centroids.push(*first);
    }

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| (p - c).norm_squared())
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            distances
                .iter()
                .position(|&d| {
                    target -= d;
                    target <= 0.0
                })
                .unwrap_or(points.len() - 1)
        } else {
            // Every point coincides with a centroid
            rng.random_range(0..points.len())
        };

        if let Some(point) = points.get(chosen) {
            centroids.push(*point);
        }
    }

    centroids
}

/// Lloyd refinement; returns the final centroids and assignment of each point
pub fn lloyd<R: Rng + ?Sized>(
    points: &[Vector3<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> (Vec<Vector3<f64>>, Vec<usize>) {
    let mut centroids = kmeans_plusplus_init(points, k, rng);
    let mut labels: Vec<usize> = points
        .iter()
        .map(|p| nearest_centroid(p, &centroids))
        .collect();

    for _ in 0..max_iterations {
        let mut sums = vec![Vector3::<f64>::zeros(); centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (p, &label) in points.iter().zip(&labels) {
            if let (Some(sum), Some(count)) = (sums.get_mut(label), counts.get_mut(label)) {
                *sum += p;
                *count += 1;
            }
        }
        for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                *centroid = *sum / count as f64;
            }
        }

        let next: Vec<usize> = points
            .iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();
        if next == labels {
            break;
        }
        labels = next;
    }

    (centroids, labels)
}

/// Initialise a `k`-component mixture from a k-means partition
///
/// Clusters with fewer than two members take the covariance of the whole
/// sample. `regularization` is added to every covariance diagonal.
///
/// # Errors
///
/// Returns an error if there are fewer points than components
pub fn init_from_kmeans<R: Rng + ?Sized>(
    points: &[Vector3<f64>],
    k: usize,
    regularization: f64,
    rng: &mut R,
) -> Result<Gmm> {
    if k == 0 || points.len() < k {
        return Err(insufficient_data(
            "k-means initialisation",
            &format!("{} points for {k} components", points.len()),
        ));
    }

    let (centroids, labels) = lloyd(points, k, KMEANS_MAX_ITERATIONS, rng);
    let global_mean = points.iter().sum::<Vector3<f64>>() / points.len() as f64;
    let floor = Matrix3::identity() * regularization;
    let global_covar = scatter_matrix(points, &global_mean) + floor;

    let mut amp = Vec::with_capacity(k);
    let mut covar = Vec::with_capacity(k);
    for (j, centroid) in centroids.iter().enumerate() {
        let members: Vec<Vector3<f64>> = points
            .iter()
            .zip(&labels)
            .filter(|&(_, &label)| label == j)
            .map(|(p, _)| *p)
            .collect();

        // Empty clusters keep a small share so the EM step can revive them
        amp.push((members.len() as f64).max(0.5) / points.len() as f64);
        covar.push(if members.len() < 2 {
            global_covar
        } else {
            scatter_matrix(&members, centroid) + floor
        });
    }

    Gmm::new(amp, centroids, covar)
}
