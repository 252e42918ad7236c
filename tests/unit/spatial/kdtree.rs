//! Tests for nearest-neighbour queries on the velocity KD-tree

#[cfg(test)]
mod tests {
    use galkin::spatial::kdtree::KdTree;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(points: &[Vector3<f64>], query: &Vector3<f64>) -> usize {
        points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - query).norm().total_cmp(&(*b - query).norm()))
            .map(|(i, _)| i)
            .unwrap()
    }

    // Tests empty trees and NaN queries return nothing
    // Verified by returning index zero for an empty tree
    #[test]
    fn test_nearest_degenerate_inputs() {
        let empty = KdTree::build(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.nearest(&Vector3::zeros()), None);

        let points = [Vector3::new(1.0, 2.0, 3.0)];
        let tree = KdTree::build(&points);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.nearest(&Vector3::new(f64::NAN, 0.0, 0.0)), None);
        assert_eq!(tree.nearest(&Vector3::new(100.0, -5.0, 0.0)), Some(0));
    }

    // Tests exact matches return their own index
    // Verified by returning the median point for every query
    #[test]
    fn test_nearest_exact_match() {
        let points: Vec<Vector3<f64>> = (0..10)
            .map(|i| Vector3::new(f64::from(i), f64::from(i * i), -f64::from(i)))
            .collect();
        let tree = KdTree::build(&points);

        for (i, point) in points.iter().enumerate() {
            assert_eq!(tree.nearest(point), Some(i));
        }
    }

    // Tests random queries agree with a linear scan
    // Verified by never descending into the far branch
    #[test]
    fn test_nearest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(61);
        let points: Vec<Vector3<f64>> = (0..500)
            .map(|_| {
                Vector3::new(
                    rng.random_range(-300.0..300.0),
                    rng.random_range(-300.0..300.0),
                    rng.random_range(-300.0..300.0),
                )
            })
            .collect();
        let tree = KdTree::build(&points);

        for _ in 0..200 {
            let query = Vector3::new(
                rng.random_range(-400.0..400.0),
                rng.random_range(-400.0..400.0),
                rng.random_range(-400.0..400.0),
            );
            let found = tree.nearest(&query).unwrap();
            let expected = brute_force(&points, &query);
            assert_eq!(
                (points[found] - query).norm(),
                (points[expected] - query).norm()
            );
        }
    }
}
