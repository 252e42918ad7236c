//! Galactocentric reference frame
//!
//! The frame places the Galactic centre at the origin with the Sun on the
//! negative x axis, z towards the north Galactic pole and the Sun's peculiar
//! plus circular motion as the velocity offset. Rotations follow the passive
//! (frame-rotating) convention.

use crate::io::error::{Result, invalid_parameter};
use nalgebra::{Matrix3, Vector3};

/// Roll angle that aligns the rotated frame with the Galactic plane
const ROLL0_DEG: f64 = 58.598_632_030_6;

/// Parameters defining a Galactocentric frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalactocentricFrame {
    /// Right ascension of the Galactic centre in degrees
    pub galcen_ra_deg: f64,
    /// Declination of the Galactic centre in degrees
    pub galcen_dec_deg: f64,
    /// Sun to Galactic centre distance in parsecs
    pub galcen_distance_pc: f64,
    /// Height of the Sun above the midplane in parsecs
    pub z_sun_pc: f64,
    /// Solar velocity relative to the Galactic centre in km/s
    pub galcen_v_sun_kms: [f64; 3],
    /// Additional roll about the Sun–centre axis in degrees
    pub roll_deg: f64,
}

impl Default for GalactocentricFrame {
    fn default() -> Self {
        Self::v4_0()
    }
}

impl GalactocentricFrame {
    /// Current parameter set (GRAVITY distance, Reid & Brunthaler proper motion)
    pub const fn v4_0() -> Self {
        Self {
            galcen_ra_deg: 266.4051,
            galcen_dec_deg: -28.936_175,
            galcen_distance_pc: 8122.0,
            z_sun_pc: 20.8,
            galcen_v_sun_kms: [12.9, 245.6, 7.78],
            roll_deg: 0.0,
        }
    }

    /// Earlier parameter set with an 8.3 kpc solar radius
    pub const fn pre_v4_0() -> Self {
        Self {
            galcen_ra_deg: 266.4051,
            galcen_dec_deg: -28.936_175,
            galcen_distance_pc: 8300.0,
            z_sun_pc: 27.0,
            galcen_v_sun_kms: [11.1, 232.24, 7.25],
            roll_deg: 0.0,
        }
    }

    /// Build the affine transform from ICRS Cartesian coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the distance is not positive or the solar height
    /// exceeds the distance
    pub fn transform(&self) -> Result<FrameTransform> {
        let d = self.galcen_distance_pc;
        if !(d.is_finite() && d > 0.0) {
            return Err(invalid_parameter(
                "galcen_distance_pc",
                &d,
                &"must be positive and finite",
            ));
        }
        if !self.z_sun_pc.is_finite() || self.z_sun_pc.abs() >= d {
            return Err(invalid_parameter(
                "z_sun_pc",
                &self.z_sun_pc,
                &"must be finite and smaller than the Galactic centre distance",
            ));
        }

        let align = rotation_x((ROLL0_DEG - self.roll_deg).to_radians())
            * rotation_y(-self.galcen_dec_deg.to_radians())
            * rotation_z(self.galcen_ra_deg.to_radians());
        let tilt = rotation_y(-(self.z_sun_pc / d).asin());

        Ok(FrameTransform {
            rotation: tilt * align,
            position_offset: -(tilt * Vector3::new(d, 0.0, 0.0)),
            velocity_offset: Vector3::from(self.galcen_v_sun_kms),
        })
    }
}

/// Affine map from ICRS Cartesian phase space to the Galactocentric frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    /// Orthonormal rotation applied to positions and velocities
    pub rotation: Matrix3<f64>,
    /// Translation applied to rotated positions in parsecs
    pub position_offset: Vector3<f64>,
    /// Translation applied to rotated velocities in km/s
    pub velocity_offset: Vector3<f64>,
}

impl FrameTransform {
    /// Map a heliocentric position (pc) and velocity (km/s)
    pub fn apply(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        (
            self.rotation * position + self.position_offset,
            self.rotation * velocity + self.velocity_offset,
        )
    }
}

fn rotation_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

fn rotation_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}
