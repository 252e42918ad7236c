//! Projected component ellipses and their colours for density plots

use crate::io::error::{Result, invalid_parameter};
use crate::math::linalg::symmetric_eigen_2x2;
use crate::mixture::model::Gmm;
use nalgebra::Matrix2;

/// Palette used when no custom colours are given
pub const DEFAULT_COMPONENT_COLORS: [[u8; 3]; 8] = [
    [0, 0, 255],     // blue
    [255, 0, 0],     // red
    [0, 255, 255],   // aqua
    [255, 215, 0],   // gold
    [0, 128, 0],     // green
    [128, 0, 128],   // purple
    [255, 165, 0],   // orange
    [255, 192, 203], // pink
];

/// Outline of one mixture component in the `(v_R, v_phi)` plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentEllipse {
    /// Component mean `(v_R, v_phi)`
    pub center: [f64; 2],
    /// Full length of the major axis
    pub width: f64,
    /// Full length of the minor axis
    pub height: f64,
    /// Counter-clockwise angle of the major axis from the `v_R` axis, in degrees
    pub angle_deg: f64,
    /// Share of the total amplitude in percent
    pub weight_percent: f64,
}

impl ComponentEllipse {
    /// Points along the outline, starting on the major axis
    pub fn outline(&self, segments: usize) -> Vec<[f64; 2]> {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let (a, b) = (self.width / 2.0, self.height / 2.0);

        (0..segments)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / segments as f64;
                let (u, v) = (a * t.cos(), b * t.sin());
                [
                    self.center[0] + u * cos - v * sin,
                    self.center[1] + u * sin + v * cos,
                ]
            })
            .collect()
    }
}

/// `n_sigma` ellipses from the `(v_R, v_phi)` block of each covariance
///
/// Negative eigenvalues from round-off collapse that axis to zero length.
pub fn component_ellipses(gmm: &Gmm, n_sigma: f64) -> Vec<ComponentEllipse> {
    let weights = gmm.weight_percentages();

    gmm.mean
        .iter()
        .zip(&gmm.covar)
        .zip(weights)
        .map(|((mean, covar), weight_percent)| {
            let block = Matrix2::new(covar.m11, covar.m12, covar.m21, covar.m22);
            let (values, vectors) = symmetric_eigen_2x2(&block);
            let [major, _] = vectors;

            ComponentEllipse {
                center: [mean.x, mean.y],
                width: 2.0 * n_sigma * values[0].max(0.0).sqrt(),
                height: 2.0 * n_sigma * values[1].max(0.0).sqrt(),
                angle_deg: major.y.atan2(major.x).to_degrees(),
                weight_percent,
            }
        })
        .collect()
}

/// Colours for `n_components` components
///
/// Without a custom palette the default palette repeats as needed.
///
/// # Errors
///
/// Returns an error if a custom palette has fewer than `n_components` colours
pub fn resolve_colors(custom: Option<&[[u8; 3]]>, n_components: usize) -> Result<Vec<[u8; 3]>> {
    match custom {
        Some(colors) if colors.len() < n_components => Err(invalid_parameter(
            "colors",
            &colors.len(),
            &format!("need at least {n_components} colours"),
        )),
        Some(colors) => Ok(colors.iter().take(n_components).copied().collect()),
        None => Ok(DEFAULT_COMPONENT_COLORS
            .iter()
            .cycle()
            .take(n_components)
            .copied()
            .collect()),
    }
}
