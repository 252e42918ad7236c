//! Two-dimensional histograms over a fixed velocity window

use crate::io::error::{Result, invalid_parameter};
use ndarray::Array2;

/// Counts on a regular grid of `bins × bins` cells
///
/// The first index runs along x, the second along y. Every bin is half open
/// except the last one on each axis, which includes its upper edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2d {
    /// Per-cell counts (or densities after [`Histogram2d::density`])
    pub counts: Array2<f64>,
    /// `bins + 1` edges along x
    pub x_edges: Vec<f64>,
    /// `bins + 1` edges along y
    pub y_edges: Vec<f64>,
}

fn linspace(range: (f64, f64), bins: usize) -> Vec<f64> {
    let step = (range.1 - range.0) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { range.1 } else { (i as f64).mul_add(step, range.0) })
        .collect()
}

fn bin_index(value: f64, range: (f64, f64), bins: usize) -> Option<usize> {
    if !(value >= range.0 && value <= range.1) {
        return None;
    }
    let scaled = (value - range.0) / (range.1 - range.0) * bins as f64;
    Some((scaled as usize).min(bins - 1))
}

impl Histogram2d {
    /// Empty histogram with `bins` cells per axis
    ///
    /// # Errors
    ///
    /// Returns an error for zero bins or an empty or non-finite range
    pub fn new(x_range: (f64, f64), y_range: (f64, f64), bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(invalid_parameter("bins", &bins, &"must be at least 1"));
        }
        for (name, range) in [("x_range", x_range), ("y_range", y_range)] {
            if !(range.0.is_finite() && range.1.is_finite() && range.0 < range.1) {
                return Err(invalid_parameter(
                    name,
                    &format!("{range:?}"),
                    &"must be a finite interval with lower < upper",
                ));
            }
        }

        Ok(Self {
            counts: Array2::zeros((bins, bins)),
            x_edges: linspace(x_range, bins),
            y_edges: linspace(y_range, bins),
        })
    }

    /// Histogram of `(x, y)` pairs
    ///
    /// # Errors
    ///
    /// Returns an error for zero bins or an invalid range
    pub fn from_points(
        points: impl IntoIterator<Item = (f64, f64)>,
        x_range: (f64, f64),
        y_range: (f64, f64),
        bins: usize,
    ) -> Result<Self> {
        let mut histogram = Self::new(x_range, y_range, bins)?;
        histogram.fill(points);
        Ok(histogram)
    }

    /// Number of bins per axis
    pub fn bins(&self) -> usize {
        self.counts.nrows()
    }

    fn x_range(&self) -> (f64, f64) {
        (
            self.x_edges.first().copied().unwrap_or(0.0),
            self.x_edges.last().copied().unwrap_or(0.0),
        )
    }

    fn y_range(&self) -> (f64, f64) {
        (
            self.y_edges.first().copied().unwrap_or(0.0),
            self.y_edges.last().copied().unwrap_or(0.0),
        )
    }

    /// Add points; values outside the window or NaN are ignored
    pub fn fill(&mut self, points: impl IntoIterator<Item = (f64, f64)>) {
        let bins = self.bins();
        let (x_range, y_range) = (self.x_range(), self.y_range());

        for (x, y) in points {
            let (Some(i), Some(j)) = (bin_index(x, x_range, bins), bin_index(y, y_range, bins))
            else {
                continue;
            };
            if let Some(cell) = self.counts.get_mut([i, j]) {
                *cell += 1.0;
            }
        }
    }

    /// Sum of all cells
    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Probability density: counts divided by total count and cell area
    ///
    /// An empty histogram yields all zeros.
    pub fn density(&self) -> Array2<f64> {
        let total = self.total();
        if total <= 0.0 {
            return Array2::zeros(self.counts.dim());
        }
        let (x_range, y_range) = (self.x_range(), self.y_range());
        let bins = self.bins() as f64;
        let area = (x_range.1 - x_range.0) / bins * ((y_range.1 - y_range.0) / bins);
        &self.counts / (total * area)
    }

    /// Density rescaled to `[0, 1]` between its smallest positive and largest value
    pub fn normalized_for_display(&self) -> Array2<f64> {
        let density = self.density();
        let min_positive = density
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        let (low, high) = if min_positive.is_finite() {
            (min_positive, density.iter().copied().fold(0.0, f64::max))
        } else {
            (1e-5, 1.0)
        };
        let span = if high > low { high - low } else { 1.0 };

        density.mapv(|v| ((v - low) / span).clamp(0.0, 1.0))
    }
}
