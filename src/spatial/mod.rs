//! Spatial indexing and binning in velocity space

/// Regular two-dimensional histograms
pub mod histogram;
/// Nearest-neighbour search over velocity vectors
pub mod kdtree;

pub use histogram::Histogram2d;
pub use kdtree::KdTree;
