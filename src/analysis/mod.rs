//! Residual testing of fitted mixtures and plot geometry

/// Component ellipses and colour palettes
pub mod ellipse;
/// Mock catalogues, residual maps and disc injection tests
pub mod residual;

pub use ellipse::ComponentEllipse;
pub use residual::{DiscModel, ResidualMap, ResidualResults};
