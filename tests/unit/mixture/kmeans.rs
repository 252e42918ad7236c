//! Tests for k-means seeding and mixture initialisation

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use galkin::AnalysisError;
    use galkin::mixture::kmeans::{
        init_from_kmeans, kmeans_plusplus_init, lloyd, nearest_centroid,
    };
    use nalgebra::Vector3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_clusters() -> Vec<Vector3<f64>> {
        let mut points = Vec::new();
        for i in 0..20 {
            let jitter = f64::from(i % 5) - 2.0;
            points.push(Vector3::new(-50.0 + jitter, jitter, 0.0));
            points.push(Vector3::new(50.0 + jitter, -jitter, 1.0));
        }
        points
    }

    // Tests the nearest centroid is picked by Euclidean distance
    // Verified by returning the farthest centroid
    #[test]
    fn test_nearest_centroid() {
        let centroids = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)];
        assert_eq!(nearest_centroid(&Vector3::new(7.0, 1.0, 0.0), &centroids), 1);
        assert_eq!(nearest_centroid(&Vector3::new(2.0, 1.0, 0.0), &centroids), 0);
    }

    // Tests k-means++ picks k input points and spreads them across clusters
    // Verified by choosing every centroid uniformly
    #[test]
    fn test_kmeans_plusplus_init() {
        let points = two_clusters();
        let mut rng = StdRng::seed_from_u64(31);
        let centroids = kmeans_plusplus_init(&points, 2, &mut rng);

        assert_eq!(centroids.len(), 2);
        assert!(centroids.iter().all(|c| points.contains(c)));
        assert!(centroids[0].x.signum() != centroids[1].x.signum());
        assert!(kmeans_plusplus_init(&[], 3, &mut rng).is_empty());
    }

    // Tests Lloyd iterations recover two separated clusters
    // Verified by never updating the centroids
    #[test]
    fn test_lloyd_separates_clusters() {
        let points = two_clusters();
        let mut rng = StdRng::seed_from_u64(32);
        let (centroids, labels) = lloyd(&points, 2, 100, &mut rng);

        let mut xs: Vec<f64> = centroids.iter().map(|c| c.x).collect();
        xs.sort_by(f64::total_cmp);
        assert_relative_eq!(xs[0], -50.0, epsilon = 1e-9);
        assert_relative_eq!(xs[1], 50.0, epsilon = 1e-9);
        assert_eq!(labels.len(), points.len());
        assert_ne!(labels[0], labels[1]);
    }

    // Tests the seeded mixture has normalised amplitudes and regularised covariances
    // Verified by dropping the regularisation floor
    #[test]
    fn test_init_from_kmeans() {
        let points = two_clusters();
        let mut rng = StdRng::seed_from_u64(33);
        let gmm = init_from_kmeans(&points, 2, 0.1, &mut rng).unwrap();

        assert_eq!(gmm.k(), 2);
        assert_relative_eq!(gmm.amp.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        for covar in &gmm.covar {
            // The z spread inside each cluster is zero
            assert_relative_eq!(covar.m33, 0.1, epsilon = 1e-12);
        }
    }

    // Tests too few points or zero components are insufficient data
    // Verified by clamping k to the number of points
    #[test]
    fn test_init_from_kmeans_rejects_small_samples() {
        let mut rng = StdRng::seed_from_u64(34);
        let points = [Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0)];

        assert!(matches!(
            init_from_kmeans(&points, 3, 0.1, &mut rng),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(init_from_kmeans(&points, 0, 0.1, &mut rng).is_err());
    }

    // Tests singleton clusters fall back to the global covariance
    // Verified by using a zero covariance for singletons
    #[test]
    fn test_init_from_kmeans_singleton_cluster() {
        let mut rng = StdRng::seed_from_u64(35);
        let points = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(1000.0, 0.0, 0.0),
        ];
        let gmm = init_from_kmeans(&points, 2, 0.0, &mut rng).unwrap();

        let singleton = gmm
            .mean
            .iter()
            .position(|m| m.x > 500.0)
            .unwrap();
        assert!(gmm.covar[singleton].m11 > 1000.0);
    }
}
