//! CSV star catalogues and result tables

use crate::io::error::{AnalysisError, Result, WithContext};
use crate::kinematics::montecarlo::{AstrometricErrors, ObservedStar};
use crate::kinematics::velocity::{Astrometry, VelocityRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One catalogue row with astrometry and one-sigma errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
    /// Photogeometric distance in parsecs
    pub rpgeo: f64,
    /// Proper motion in right ascension (mas/yr)
    pub pmra: f64,
    /// Proper motion in declination (mas/yr)
    pub pmdec: f64,
    /// Line-of-sight velocity in km/s
    pub radial_velocity: f64,
    /// Parallax error
    pub parallax_error: f64,
    /// Error of `pmra`
    pub pmra_error: f64,
    /// Error of `pmdec`
    pub pmdec_error: f64,
    /// Error of `rpgeo`
    pub rpgeo_error: f64,
    /// Error of `radial_velocity`
    pub radial_velocity_error: f64,
}

impl From<StarRecord> for ObservedStar {
    fn from(row: StarRecord) -> Self {
        Self {
            astrometry: Astrometry {
                ra_deg: row.ra,
                dec_deg: row.dec,
                distance_pc: row.rpgeo,
                pmra_masyr: row.pmra,
                pmdec_masyr: row.pmdec,
                vlos_kms: row.radial_velocity,
            },
            errors: AstrometricErrors {
                parallax_error: row.parallax_error,
                pmra_error: row.pmra_error,
                pmdec_error: row.pmdec_error,
                distance_error: row.rpgeo_error,
                vlos_error: row.radial_velocity_error,
            },
        }
    }
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).with_path(path)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .with_path(path)
}

fn export_error(path: &Path) -> impl FnOnce(csv::Error) -> AnalysisError + '_ {
    move |source| AnalysisError::TableExport {
        path: path.to_path_buf(),
        source,
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| AnalysisError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create output directory",
            source,
        })?;
    }
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(export_error(path))?;
    for row in rows {
        writer.serialize(row).map_err(export_error(path))?;
    }
    writer.flush().map_err(|source| AnalysisError::FileSystem {
        path: path.to_path_buf(),
        operation: "flush table",
        source,
    })
}

/// Read a star catalogue
///
/// Empty cells are rejected; missing measurements should be written as `NaN`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row does not parse
pub fn read_stars(path: &Path) -> Result<Vec<ObservedStar>> {
    let rows: Vec<StarRecord> = read_rows(path)?;
    log::info!("Read {} stars from {}", rows.len(), path.display());
    Ok(rows.into_iter().map(ObservedStar::from).collect())
}

/// Read a velocity table written by [`write_velocities`]
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row does not parse
pub fn read_velocities(path: &Path) -> Result<Vec<VelocityRecord>> {
    read_rows(path)
}

/// Write velocities and uncertainties, one row per star
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn write_velocities(path: &Path, records: &[VelocityRecord]) -> Result<()> {
    write_rows(path, records)
}

#[derive(Serialize)]
struct BicRow {
    n_components: usize,
    run: usize,
    bic: f64,
}

/// Write every BIC value with its component count and run index
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn write_bic_table(path: &Path, bic_values: &BTreeMap<usize, Vec<f64>>) -> Result<()> {
    write_rows(
        path,
        bic_values.iter().flat_map(|(&n_components, values)| {
            values.iter().enumerate().map(move |(run, &bic)| BicRow {
                n_components,
                run,
                bic,
            })
        }),
    )
}

#[derive(Serialize)]
struct DiscFractionRow {
    disc_fraction: f64,
    residual_mean: f64,
    residual_std: f64,
}

/// Write the injected residual mean and spread per disc fraction
///
/// # Errors
///
/// Returns an error if the columns differ in length or the file cannot be
/// written
pub fn write_disc_fraction_curve(
    path: &Path,
    disc_fractions: &[f64],
    means: &[f64],
    stds: &[f64],
) -> Result<()> {
    if means.len() != disc_fractions.len() || stds.len() != disc_fractions.len() {
        return Err(crate::io::error::invalid_parameter(
            "disc_fractions",
            &disc_fractions.len(),
            &format!(
                "expected matching means ({}) and stds ({})",
                means.len(),
                stds.len()
            ),
        ));
    }
    write_rows(
        path,
        disc_fractions
            .iter()
            .zip(means.iter().zip(stds))
            .map(|(&disc_fraction, (&residual_mean, &residual_std))| DiscFractionRow {
                disc_fraction,
                residual_mean,
                residual_std,
            }),
    )
}
