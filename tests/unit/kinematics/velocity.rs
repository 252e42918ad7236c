//! Tests for astrometry to cylindrical velocity conversion

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use galkin::kinematics::frame::GalactocentricFrame;
    use galkin::kinematics::velocity::{
        Astrometry, KMS_PER_MASYR_KPC, VelocityColumns, VelocityRecord,
        compute_velocity_components, cylindrical_velocity,
    };

    fn at_rest(distance_pc: f64) -> Astrometry {
        Astrometry {
            ra_deg: 120.0,
            dec_deg: 30.0,
            distance_pc,
            pmra_masyr: 0.0,
            pmdec_masyr: 0.0,
            vlos_kms: 0.0,
        }
    }

    // Tests a star co-moving with the Sun has the solar velocity
    // Verified by flipping the sign of v_phi
    #[test]
    fn test_star_at_sun_has_solar_motion() {
        let transform = GalactocentricFrame::v4_0().transform().unwrap();
        let velocity = cylindrical_velocity(&at_rest(0.0), &transform).unwrap();

        assert_relative_eq!(velocity.v_r, -12.9, epsilon = 1e-6);
        assert_relative_eq!(velocity.v_phi, 245.6, epsilon = 1e-6);
        assert_relative_eq!(velocity.v_z, 7.78, epsilon = 1e-6);
    }

    // Tests a distant star against a reference transform of the same frame
    // Verified by dropping the tilt for the solar height
    #[test]
    fn test_reference_star_velocity() {
        let transform = GalactocentricFrame::v4_0().transform().unwrap();
        let star = Astrometry {
            ra_deg: 150.0,
            dec_deg: 20.0,
            distance_pc: 3000.0,
            pmra_masyr: 5.0,
            pmdec_masyr: -3.0,
            vlos_kms: 50.0,
        };
        let velocity = cylindrical_velocity(&star, &transform).unwrap();

        assert_relative_eq!(velocity.v_r, -77.295_156_96, epsilon = 1e-6);
        assert_relative_eq!(velocity.v_phi, 190.907_043_87, epsilon = 1e-6);
        assert_relative_eq!(velocity.v_z, 80.404_499_52, epsilon = 1e-6);
    }

    // Tests proper motion scales with distance through the km/s conversion
    // Verified by using distance in parsecs without the kpc factor
    #[test]
    fn test_icrs_cartesian_tangential_speed() {
        let star = Astrometry {
            ra_deg: 0.0,
            dec_deg: 0.0,
            distance_pc: 2000.0,
            pmra_masyr: 3.0,
            pmdec_masyr: 4.0,
            vlos_kms: 10.0,
        };
        let (position, velocity) = star.icrs_cartesian();

        assert_relative_eq!(position.x, 2000.0, epsilon = 1e-9);
        assert_relative_eq!(velocity.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(velocity.y, 3.0 * 2.0 * KMS_PER_MASYR_KPC, epsilon = 1e-9);
        assert_relative_eq!(velocity.z, 4.0 * 2.0 * KMS_PER_MASYR_KPC, epsilon = 1e-9);
    }

    // Tests non-finite astrometry yields no velocity
    // Verified by removing the finiteness check
    #[test]
    fn test_non_finite_input_rejected() {
        let transform = GalactocentricFrame::v4_0().transform().unwrap();
        let star = Astrometry {
            vlos_kms: f64::NAN,
            ..at_rest(100.0)
        };
        assert!(cylindrical_velocity(&star, &transform).is_none());
    }

    // Tests batch conversion keeps row order and marks invalid rows with NaN
    // Verified by compacting the output to valid rows only
    #[test]
    fn test_compute_velocity_components_preserves_rows() {
        let transform = GalactocentricFrame::v4_0().transform().unwrap();
        let stars = [
            at_rest(0.0),
            Astrometry {
                distance_pc: f64::NAN,
                ..at_rest(1.0)
            },
            at_rest(500.0),
        ];
        let columns = compute_velocity_components(&stars, &transform);

        assert_eq!(columns.len(), 3);
        assert_relative_eq!(columns.v_phi[0], 245.6, epsilon = 1e-6);
        assert!(columns.v_r[1].is_nan());
        assert!(columns.v_phi[1].is_nan());
        assert!(columns.v_z[1].is_nan());
        assert!(columns.v_phi[2].is_finite());

        let single = cylindrical_velocity(&stars[2], &transform).unwrap();
        assert_eq!(columns.get(2), Some(single));
        assert_eq!(columns.get(3), None);
    }

    // Tests an empty batch and an all-invalid batch
    // Verified by returning empty columns for invalid rows
    #[test]
    fn test_compute_velocity_components_degenerate() {
        let transform = GalactocentricFrame::v4_0().transform().unwrap();
        assert!(compute_velocity_components(&[], &transform).is_empty());

        let nan = Astrometry {
            ra_deg: f64::NAN,
            ..at_rest(1.0)
        };
        let columns = compute_velocity_components(&[nan, nan], &transform);
        assert_eq!(columns.len(), VelocityColumns::nan(2).len());
        assert!(columns.v_r.iter().all(|v| v.is_nan()));
        assert!(columns.v_z.iter().all(|v| v.is_nan()));
    }

    // Tests record accessors and finiteness
    // Verified by swapping velocity and uncertainty order
    #[test]
    fn test_velocity_record_accessors() {
        let record = VelocityRecord {
            v_r: 1.0,
            v_phi: 2.0,
            v_z: 3.0,
            v_r_uncertainty: 0.1,
            v_phi_uncertainty: 0.2,
            v_z_uncertainty: 0.3,
        };
        assert_eq!(record.velocity().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(record.uncertainty().as_slice(), &[0.1, 0.2, 0.3]);
        assert!(record.is_finite());

        let broken = VelocityRecord {
            v_z_uncertainty: f64::INFINITY,
            ..record
        };
        assert!(!broken.is_finite());
    }
}
