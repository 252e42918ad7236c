//! Cylindrical Galactocentric velocities from heliocentric astrometry

use crate::kinematics::frame::FrameTransform;
use bitvec::vec::BitVec;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Tangential speed in km/s of 1 mas/yr at 1 kpc
pub const KMS_PER_MASYR_KPC: f64 = 4.740_470_463_533_348;

/// Heliocentric position and motion of a single star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Astrometry {
    /// Right ascension in degrees
    pub ra_deg: f64,
    /// Declination in degrees
    pub dec_deg: f64,
    /// Distance in parsecs
    pub distance_pc: f64,
    /// Proper motion in right ascension (times cos dec) in mas/yr
    pub pmra_masyr: f64,
    /// Proper motion in declination in mas/yr
    pub pmdec_masyr: f64,
    /// Line-of-sight velocity in km/s
    pub vlos_kms: f64,
}

impl Astrometry {
    /// True when every field is finite
    pub const fn is_finite(&self) -> bool {
        self.ra_deg.is_finite()
            && self.dec_deg.is_finite()
            && self.distance_pc.is_finite()
            && self.pmra_masyr.is_finite()
            && self.pmdec_masyr.is_finite()
            && self.vlos_kms.is_finite()
    }

    /// Heliocentric ICRS Cartesian position (pc) and velocity (km/s)
    pub fn icrs_cartesian(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (sin_ra, cos_ra) = self.ra_deg.to_radians().sin_cos();
        let (sin_dec, cos_dec) = self.dec_deg.to_radians().sin_cos();

        let radial = Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec);
        let east = Vector3::new(-sin_ra, cos_ra, 0.0);
        let north = Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec);

        let scale = KMS_PER_MASYR_KPC * self.distance_pc / 1000.0;
        let velocity = radial * self.vlos_kms
            + east * (self.pmra_masyr * scale)
            + north * (self.pmdec_masyr * scale);

        (radial * self.distance_pc, velocity)
    }
}

/// Galactocentric cylindrical velocity components in km/s
///
/// `v_phi` is positive in the direction of Galactic rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylindricalVelocity {
    /// Radial velocity away from the Galactic centre
    pub v_r: f64,
    /// Azimuthal velocity
    pub v_phi: f64,
    /// Vertical velocity towards the north Galactic pole
    pub v_z: f64,
}

impl CylindricalVelocity {
    /// Placeholder for rows that cannot be transformed
    pub const NAN: Self = Self {
        v_r: f64::NAN,
        v_phi: f64::NAN,
        v_z: f64::NAN,
    };
}

/// Transform one star into cylindrical Galactocentric velocities
///
/// Returns `None` for non-finite input or a star on the rotation axis.
pub fn cylindrical_velocity(
    star: &Astrometry,
    transform: &FrameTransform,
) -> Option<CylindricalVelocity> {
    if !star.is_finite() {
        return None;
    }

    let (position, velocity) = star.icrs_cartesian();
    let (p, v) = transform.apply(&position, &velocity);
    let rho = p.x.hypot(p.y);
    if rho <= 0.0 || !rho.is_finite() {
        return None;
    }

    Some(CylindricalVelocity {
        v_r: p.x.mul_add(v.x, p.y * v.y) / rho,
        v_phi: -p.x.mul_add(v.y, -(p.y * v.x)) / rho,
        v_z: v.z,
    })
}

/// Column-oriented velocity components for a batch of stars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityColumns {
    /// Radial components
    pub v_r: Vec<f64>,
    /// Azimuthal components
    pub v_phi: Vec<f64>,
    /// Vertical components
    pub v_z: Vec<f64>,
}

impl VelocityColumns {
    /// All-NaN columns of length `len`
    pub fn nan(len: usize) -> Self {
        Self {
            v_r: vec![f64::NAN; len],
            v_phi: vec![f64::NAN; len],
            v_z: vec![f64::NAN; len],
        }
    }

    /// Number of rows
    pub const fn len(&self) -> usize {
        self.v_r.len()
    }

    /// True when there are no rows
    pub const fn is_empty(&self) -> bool {
        self.v_r.is_empty()
    }

    /// Velocity of row `index`
    pub fn get(&self, index: usize) -> Option<CylindricalVelocity> {
        Some(CylindricalVelocity {
            v_r: *self.v_r.get(index)?,
            v_phi: *self.v_phi.get(index)?,
            v_z: *self.v_z.get(index)?,
        })
    }
}

/// Transform a batch of stars, leaving NaN in rows with invalid input
///
/// The output always has one row per input star.
pub fn compute_velocity_components(
    stars: &[Astrometry],
    transform: &FrameTransform,
) -> VelocityColumns {
    let mut columns = VelocityColumns::nan(stars.len());
    let valid: BitVec = stars.iter().map(Astrometry::is_finite).collect();

    if valid.not_any() {
        return columns;
    }

    for index in valid.iter_ones() {
        let Some(velocity) = stars
            .get(index)
            .and_then(|star| cylindrical_velocity(star, transform))
        else {
            continue;
        };
        if let Some(slot) = columns.v_r.get_mut(index) {
            *slot = velocity.v_r;
        }
        if let Some(slot) = columns.v_phi.get_mut(index) {
            *slot = velocity.v_phi;
        }
        if let Some(slot) = columns.v_z.get_mut(index) {
            *slot = velocity.v_z;
        }
    }

    let invalid = valid.count_zeros();
    if invalid > 0 {
        log::debug!("{invalid} of {} stars had non-finite astrometry", stars.len());
    }

    columns
}

/// Velocities and their propagated uncertainties for one star
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityRecord {
    /// Radial velocity in km/s
    #[serde(rename = "v_R")]
    pub v_r: f64,
    /// Azimuthal velocity in km/s
    pub v_phi: f64,
    /// Vertical velocity in km/s
    #[serde(rename = "v_Z")]
    pub v_z: f64,
    /// Standard deviation of `v_R`
    #[serde(rename = "v_R_uncertainty")]
    pub v_r_uncertainty: f64,
    /// Standard deviation of `v_phi`
    pub v_phi_uncertainty: f64,
    /// Standard deviation of `v_Z`
    #[serde(rename = "v_Z_uncertainty")]
    pub v_z_uncertainty: f64,
}

impl VelocityRecord {
    /// Velocity vector `(v_R, v_phi, v_Z)`
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.v_r, self.v_phi, self.v_z)
    }

    /// Uncertainty vector in the same component order
    pub fn uncertainty(&self) -> Vector3<f64> {
        Vector3::new(
            self.v_r_uncertainty,
            self.v_phi_uncertainty,
            self.v_z_uncertainty,
        )
    }

    /// True when all six values are finite
    pub const fn is_finite(&self) -> bool {
        self.v_r.is_finite()
            && self.v_phi.is_finite()
            && self.v_z.is_finite()
            && self.v_r_uncertainty.is_finite()
            && self.v_phi_uncertainty.is_finite()
            && self.v_z_uncertainty.is_finite()
    }
}
