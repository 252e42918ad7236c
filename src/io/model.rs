//! JSON persistence of fitted mixtures

use crate::io::error::{AnalysisError, Result, WithContext};
use crate::mixture::model::Gmm;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// On-disk layout of a mixture; covariances are stored row by row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmmDocument {
    /// Component amplitudes
    pub amp: Vec<f64>,
    /// Component means
    pub mean: Vec<[f64; 3]>,
    /// Component covariances
    pub covar: Vec<[[f64; 3]; 3]>,
}

impl From<&Gmm> for GmmDocument {
    fn from(gmm: &Gmm) -> Self {
        Self {
            amp: gmm.amp.clone(),
            mean: gmm.mean.iter().map(|m| [m.x, m.y, m.z]).collect(),
            covar: gmm
                .covar
                .iter()
                .map(|c| {
                    [
                        [c.m11, c.m12, c.m13],
                        [c.m21, c.m22, c.m23],
                        [c.m31, c.m32, c.m33],
                    ]
                })
                .collect(),
        }
    }
}

impl TryFrom<GmmDocument> for Gmm {
    type Error = AnalysisError;

    fn try_from(document: GmmDocument) -> Result<Self> {
        let mean = document.mean.into_iter().map(Vector3::from).collect();
        let covar = document
            .covar
            .iter()
            .map(|rows| Matrix3::from_row_iterator(rows.iter().flatten().copied()))
            .collect();
        Self::new(document.amp, mean, covar)
    }
}

/// Write `gmm` as pretty-printed JSON
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn save_gmm(gmm: &Gmm, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_path(parent)?;
    }
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path).with_path(path)?);
    serde_json::to_writer_pretty(&mut writer, &GmmDocument::from(gmm)).map_err(|source| {
        AnalysisError::ModelExport {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().with_path(path)
}

/// Read a mixture written by [`save_gmm`]
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid document, or
/// describes an invalid mixture
pub fn load_gmm(path: &Path) -> Result<Gmm> {
    let file = std::fs::File::open(path).with_path(path)?;
    let document: GmmDocument =
        serde_json::from_reader(std::io::BufReader::new(file)).with_path(path)?;
    Gmm::try_from(document)
}
