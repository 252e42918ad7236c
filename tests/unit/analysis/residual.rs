//! Tests for mock catalogues, residual maps and disc injection

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use galkin::AnalysisError;
    use galkin::analysis::residual::{
        DiscModel, ResidualOptions, ResidualResults, assign_uncertainties, compute_residual_map,
        count_inside, generate_mock_with_errors, inside_ellipse, run_residual_analysis,
    };
    use galkin::io::configuration::MAX_DISC_FRACTION;
    use galkin::io::progress::ProgressManager;
    use galkin::mixture::deconvolution::VelocitySample;
    use galkin::mixture::model::Gmm;
    use nalgebra::{Matrix3, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn halo() -> Gmm {
        Gmm::new(
            vec![1.0],
            vec![Vector3::new(0.0, 0.0, 0.0)],
            vec![Matrix3::identity() * 150.0_f64.powi(2)],
        )
        .unwrap()
    }

    fn observed(n: usize, rng: &mut StdRng) -> VelocitySample {
        let points = halo().draw(n, rng).unwrap();
        VelocitySample::new(points, vec![Vector3::repeat(5.0); n]).unwrap()
    }

    // Tests the default disc model and its selection ellipse
    // Verified by using one sigma half-widths
    #[test]
    fn test_disc_model_defaults() {
        let disc = DiscModel::default();
        assert_eq!(disc.center(), (0.0, 180.0));
        assert_eq!(disc.half_widths(), (140.0, 100.0));
        assert!(disc.contains(&Vector3::new(0.0, 180.0, 500.0)));
        assert!(!disc.contains(&Vector3::new(0.0, 0.0, 0.0)));
    }

    // Tests ellipse membership includes the boundary
    // Verified by using a strict inequality
    #[test]
    fn test_inside_ellipse_boundary() {
        assert!(inside_ellipse(140.0, 180.0, (0.0, 180.0), 140.0, 100.0));
        assert!(inside_ellipse(0.0, 80.0, (0.0, 180.0), 140.0, 100.0));
        assert!(!inside_ellipse(100.0, 260.0, (0.0, 180.0), 140.0, 100.0));
        assert!(!inside_ellipse(f64::NAN, 180.0, (0.0, 180.0), 140.0, 100.0));
    }

    // Tests counting inside the selection ellipse
    // Verified by counting on v_Z instead of v_phi
    #[test]
    fn test_count_inside() {
        let points = [
            Vector3::new(0.0, 180.0, 0.0),
            Vector3::new(50.0, 150.0, 300.0),
            Vector3::new(0.0, -180.0, 0.0),
        ];
        assert_eq!(count_inside(&points, &DiscModel::default()), 2);
    }

    // Tests disc draws follow the disc mean and dispersion
    // Verified by swapping the v_R and v_phi dispersions
    #[test]
    fn test_disc_draw_moments() {
        let mut rng = StdRng::seed_from_u64(71);
        let draws = DiscModel::default().draw(20_000, &mut rng);
        let n = draws.len() as f64;
        let mean = draws.iter().sum::<Vector3<f64>>() / n;
        let var_phi = draws.iter().map(|d| (d.y - mean.y).powi(2)).sum::<f64>() / n;

        assert_relative_eq!(mean.y, 180.0, epsilon = 1.5);
        assert_relative_eq!(var_phi.sqrt(), 50.0, epsilon = 1.5);
    }

    // Tests each mock star takes the uncertainty of its nearest observed star
    // Verified by using the uncertainty of the first observed star for all
    #[test]
    fn test_assign_uncertainties_uses_nearest_star() {
        let mut rng = StdRng::seed_from_u64(72);
        let observed = [Vector3::new(-100.0, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0)];
        let errors = [Vector3::zeros(), Vector3::repeat(10.0)];
        let mock = vec![Vector3::new(-90.0, 5.0, 0.0); 200]
            .into_iter()
            .chain(vec![Vector3::new(90.0, 5.0, 0.0); 200])
            .collect::<Vec<_>>();

        let noisy = assign_uncertainties(&mock, &observed, &errors, &mut rng).unwrap();

        assert!(noisy[..200].iter().zip(&mock).all(|(a, b)| a == b));
        let spread: f64 = noisy[200..]
            .iter()
            .map(|p| (p.x - 90.0).powi(2))
            .sum::<f64>()
            / 200.0;
        assert_relative_eq!(spread.sqrt(), 10.0, epsilon = 1.5);
    }

    // Tests mismatched or empty observations are rejected
    // Verified by building a tree over an empty sample
    #[test]
    fn test_assign_uncertainties_errors() {
        let mut rng = StdRng::seed_from_u64(73);
        let mock = [Vector3::zeros()];
        assert!(matches!(
            assign_uncertainties(&mock, &[], &[], &mut rng),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(assign_uncertainties(&mock, &[Vector3::zeros()], &[], &mut rng).is_err());
    }

    // Tests the mock has as many stars as observed
    // Verified by drawing a fixed number of stars
    #[test]
    fn test_generate_mock_with_errors_size() {
        let mut rng = StdRng::seed_from_u64(74);
        let sample = observed(321, &mut rng);
        let mock = generate_mock_with_errors(&halo(), &sample, &mut rng).unwrap();
        assert_eq!(mock.len(), 321);
    }

    // Tests residual values are bounded and the grid matches the bins
    // Verified by omitting the normalising denominator
    #[test]
    fn test_compute_residual_map_bounds() {
        let mut rng = StdRng::seed_from_u64(75);
        let sample = observed(2000, &mut rng);
        let map = compute_residual_map(&sample, &halo(), 20, (-400.0, 400.0), (-400.0, 400.0), &mut rng)
            .unwrap();

        assert_eq!(map.values.dim(), (20, 20));
        assert_eq!(map.x_edges.len(), 21);
        assert_eq!(map.y_edges.len(), 21);
        assert!(map.values.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(map.values.iter().any(|v| v.abs() > 0.0));
    }

    // Tests injected disc stars raise the residual with the fraction
    // Verified by injecting into the baseline mock as well
    #[test]
    fn test_run_residual_analysis_injection_grows() {
        let mut rng = StdRng::seed_from_u64(76);
        let sample = observed(1000, &mut rng);
        let fractions = [0.0, 0.2];
        let results = run_residual_analysis(
            &sample,
            &halo(),
            &fractions,
            20,
            &DiscModel::default(),
            &mut rng,
            &ProgressManager::hidden(),
        )
        .unwrap();

        assert_eq!(results.fraction_means.len(), 2);
        assert_eq!(results.fraction_stds.len(), 2);
        assert!(results.observed_std >= 0.0);
        // 200 injected stars, about 86% of which land in the 2-sigma ellipse
        assert!(results.fraction_means[1] > 150.0);
        assert!(results.fraction_means[0].abs() < 30.0);
        assert!(matches!(
            results.minimum_detectable_fraction(&fractions),
            Some(f) if f <= 0.2
        ));
    }

    // Tests invalid realisation counts and fractions are rejected
    // Verified by accepting negative fractions
    #[test]
    fn test_run_residual_analysis_validation() {
        let mut rng = StdRng::seed_from_u64(77);
        let sample = observed(50, &mut rng);
        let disc = DiscModel::default();
        let progress = ProgressManager::hidden();

        assert!(run_residual_analysis(&sample, &halo(), &[0.1], 0, &disc, &mut rng, &progress).is_err());
        assert!(run_residual_analysis(&sample, &halo(), &[-0.1], 5, &disc, &mut rng, &progress).is_err());
        assert!(
            run_residual_analysis(&sample, &halo(), &[f64::NAN], 5, &disc, &mut rng, &progress)
                .is_err()
        );
        assert!(matches!(
            run_residual_analysis(&sample, &halo(), &[1e300], 5, &disc, &mut rng, &progress),
            Err(AnalysisError::InvalidParameter {
                parameter: "disc_fractions",
                ..
            })
        ));
        assert!(matches!(
            run_residual_analysis(
                &VelocitySample::default(),
                &halo(),
                &[0.1],
                5,
                &disc,
                &mut rng,
                &progress
            ),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    // Tests the largest allowed disc fraction is still injected
    // Verified by rejecting fractions equal to the bound
    #[test]
    fn test_run_residual_analysis_accepts_fraction_bound() {
        let mut rng = StdRng::seed_from_u64(78);
        let sample = observed(20, &mut rng);
        let progress = ProgressManager::hidden();

        let results = run_residual_analysis(
            &sample,
            &halo(),
            &[MAX_DISC_FRACTION],
            2,
            &DiscModel::default(),
            &mut rng,
            &progress,
        )
        .unwrap();
        assert_eq!(results.fraction_means.len(), 1);
        assert!(results.fraction_means[0].is_finite());
    }

    // Tests the detection threshold compares one-sigma bands
    // Verified by comparing means without the spreads
    #[test]
    fn test_minimum_detectable_fraction() {
        let results = ResidualResults {
            observed_mean: 10.0,
            observed_std: 5.0,
            fraction_means: vec![12.0, 20.0, 30.0],
            fraction_stds: vec![1.0, 6.0, 4.0],
        };
        assert_eq!(results.minimum_detectable_fraction(&[0.01, 0.02, 0.05]), Some(0.05));

        let none = ResidualResults {
            fraction_means: vec![12.0],
            fraction_stds: vec![1.0],
            ..results
        };
        assert_eq!(none.minimum_detectable_fraction(&[0.01]), None);
    }

    // Tests option defaults and validation
    // Verified by accepting zero bins
    #[test]
    fn test_residual_options_validate() {
        let defaults = ResidualOptions::default();
        assert_eq!(defaults.n_realizations, 200);
        assert_eq!(defaults.bins, 100);
        assert!(defaults.validate().is_ok());
        assert!(ResidualOptions { bins: 0, ..defaults }.validate().is_err());
        assert!(
            ResidualOptions {
                vr_limits: (10.0, -10.0),
                ..defaults
            }
            .validate()
            .is_err()
        );
    }
}
