//! Tests for PNG rendering of residual maps and density views

#[cfg(test)]
mod tests {
    use galkin::AnalysisError;
    use galkin::analysis::ellipse::ComponentEllipse;
    use galkin::analysis::residual::{DiscModel, ResidualMap};
    use galkin::io::configuration::MAP_PIXELS_PER_BIN;
    use galkin::io::image::{export_gmm_density, export_residual_map};
    use galkin::spatial::histogram::Histogram2d;
    use ndarray::Array2;

    fn residual_map() -> ResidualMap {
        let mut values = Array2::zeros((4, 4));
        values[[0, 0]] = -1.0;
        values[[3, 3]] = 1.0;
        ResidualMap {
            values,
            x_edges: vec![-400.0, -200.0, 0.0, 200.0, 400.0],
            y_edges: vec![-400.0, -200.0, 0.0, 200.0, 400.0],
        }
    }

    // Tests map cells are coloured with a diverging scale and v_phi increases upwards
    // Verified by flipping the vertical axis
    #[test]
    fn test_export_residual_map_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("residual.png");

        export_residual_map(&residual_map(), &DiscModel::default(), &path).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        let side = 4 * MAP_PIXELS_PER_BIN;
        assert_eq!(image.dimensions(), (side, side));
        // Lowest v_R, lowest v_phi cell is bottom left
        assert_eq!(image.get_pixel(0, side - 1).0, [0, 0, 255]);
        assert_eq!(image.get_pixel(side - 1, 0).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(MAP_PIXELS_PER_BIN, side - 1).0, [255, 255, 255]);
    }

    // Tests component outlines are drawn in their colours
    // Verified by skipping the outline pass
    #[test]
    fn test_export_gmm_density_draws_ellipses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density.png");
        let histogram =
            Histogram2d::from_points([(0.0, 0.0), (10.0, 10.0)], (-100.0, 100.0), (-100.0, 100.0), 10)
                .unwrap();
        let ellipse = ComponentEllipse {
            center: [0.0, 0.0],
            width: 100.0,
            height: 100.0,
            angle_deg: 0.0,
            weight_percent: 100.0,
        };

        export_gmm_density(&histogram, &[ellipse], &[[0, 200, 0]], &path).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        assert!(image.pixels().any(|p| p.0 == [0, 200, 0]));
    }

    // Tests a missing colour is rejected before rendering
    // Verified by cycling colours for extra ellipses
    #[test]
    fn test_export_gmm_density_needs_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density.png");
        let histogram = Histogram2d::new((-1.0, 1.0), (-1.0, 1.0), 2).unwrap();
        let ellipse = ComponentEllipse {
            center: [0.0, 0.0],
            width: 1.0,
            height: 1.0,
            angle_deg: 0.0,
            weight_percent: 100.0,
        };

        let result = export_gmm_density(&histogram, &[ellipse], &[], &path);
        assert!(matches!(result, Err(AnalysisError::InvalidParameter { .. })));
        assert!(!path.exists());
    }

    // Tests empty maps are rejected
    // Verified by rendering a zero-sized image
    #[test]
    fn test_export_empty_map_fails() {
        let dir = tempfile::tempdir().unwrap();
        let map = ResidualMap {
            values: Array2::zeros((0, 0)),
            x_edges: vec![],
            y_edges: vec![],
        };
        let result = export_residual_map(&map, &DiscModel::default(), &dir.path().join("x.png"));
        assert!(result.is_err());
    }
}
