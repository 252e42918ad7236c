//! Covariance algebra for three-dimensional velocity space

use crate::io::error::{Result, computation_error};
use nalgebra::{Matrix2, Matrix3, SymmetricEigen, Vector2, Vector3};

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Lower-triangular Cholesky factor `L` with `L Lᵀ = m`
///
/// # Errors
///
/// Returns a computation error if `m` is not positive definite
pub fn cholesky_lower(m: &Matrix3<f64>) -> Result<Matrix3<f64>> {
    m.cholesky()
        .map(|c| c.l())
        .ok_or_else(|| computation_error("cholesky", &"matrix is not positive definite"))
}

/// Inverse and log-determinant of a positive definite covariance
///
/// Factoring once lets the E-step and M-step of deconvolution share the work.
#[derive(Debug, Clone)]
pub struct FactoredCovariance {
    /// Inverse of the covariance
    pub inverse: Matrix3<f64>,
    /// Natural logarithm of the determinant
    pub log_det: f64,
}

impl FactoredCovariance {
    /// Factor `covariance` through its Cholesky decomposition
    ///
    /// # Errors
    ///
    /// Returns a computation error if `covariance` is not positive definite
    pub fn factor(covariance: &Matrix3<f64>) -> Result<Self> {
        let chol = covariance.cholesky().ok_or_else(|| {
            computation_error("covariance factorisation", &"matrix is not positive definite")
        })?;
        let log_det = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();

        Ok(Self {
            inverse: chol.inverse(),
            log_det,
        })
    }

    /// Log-density of a zero-mean normal at `residual`
    pub fn log_density(&self, residual: &Vector3<f64>) -> f64 {
        let mahalanobis = residual.dot(&(self.inverse * residual));
        -0.5 * (3.0f64.mul_add(LN_2PI, self.log_det) + mahalanobis)
    }
}

/// Log-density of `N(0, covariance)` evaluated at `residual`
///
/// # Errors
///
/// Returns a computation error if `covariance` is not positive definite
pub fn gaussian_log_density(residual: &Vector3<f64>, covariance: &Matrix3<f64>) -> Result<f64> {
    Ok(FactoredCovariance::factor(covariance)?.log_density(residual))
}

/// Eigen-decomposition of a symmetric 2x2 matrix, largest eigenvalue first
pub fn symmetric_eigen_2x2(m: &Matrix2<f64>) -> ([f64; 2], [Vector2<f64>; 2]) {
    let eigen = SymmetricEigen::new(*m);
    let first = (eigen.eigenvalues.x, eigen.eigenvectors.column(0).into_owned());
    let second = (eigen.eigenvalues.y, eigen.eigenvectors.column(1).into_owned());

    if first.0 >= second.0 {
        ([first.0, second.0], [first.1, second.1])
    } else {
        ([second.0, first.0], [second.1, first.1])
    }
}

/// Diagonal covariance with the squared standard deviations on the diagonal
pub fn diagonal_covariance(sigmas: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::from_diagonal(&sigmas.component_mul(sigmas))
}

/// Sample covariance (normalised by the count) of points around `center`
pub fn scatter_matrix(points: &[Vector3<f64>], center: &Vector3<f64>) -> Matrix3<f64> {
    if points.is_empty() {
        return Matrix3::zeros();
    }
    let sum = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - center;
        acc + d * d.transpose()
    });
    sum / points.len() as f64
}
