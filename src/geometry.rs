/// Angle and coordinate helpers shared by the motion model and the sensor models.
/// Every heading or bearing residual in the filter goes through `normalize_angle`.
use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Wrap an angle into (-π, π]
///
/// Idempotent: a value already in range is returned unchanged.
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = angle.rem_euclid(TWO_PI); // [0, 2π)
    if wrapped > PI {
        wrapped - TWO_PI
    } else {
        wrapped
    }
}

/// Convert a range/bearing pair to Cartesian position
pub fn polar_to_cartesian(rho: f64, phi: f64) -> (f64, f64) {
    (rho * phi.cos(), rho * phi.sin())
}

/// Velocity components for a scalar speed along a heading
pub fn heading_velocity(speed: f64, yaw: f64) -> (f64, f64) {
    (speed * yaw.cos(), speed * yaw.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_in_range_unchanged() {
        for &a in &[0.0, 1.0, -1.0, PI, -PI + 1e-9, 3.0] {
            assert_eq!(normalize_angle(a), a);
        }
    }

    #[test]
    fn test_wraps_into_range() {
        for k in -20..=20 {
            let a = 0.3 + k as f64 * 0.77;
            let n = normalize_angle(a);
            assert!(n > -PI && n <= PI, "angle {} normalized to {}", a, n);
            // Same direction on the unit circle
            assert_abs_diff_eq!(n.sin(), a.sin(), epsilon = 1e-9);
            assert_abs_diff_eq!(n.cos(), a.cos(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_minus_pi_maps_to_pi() {
        assert_abs_diff_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(PI + 2.0), -PI + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_idempotent() {
        for &a in &[7.5, -7.5, 100.0, -0.5, 4.0 * PI + 0.1] {
            let once = normalize_angle(a);
            assert_eq!(normalize_angle(once), once);
        }
    }

    #[test]
    fn test_polar_to_cartesian() {
        let (x, y) = polar_to_cartesian(5.0, 0.0);
        assert_abs_diff_eq!(x, 5.0);
        assert_abs_diff_eq!(y, 0.0);

        let (x, y) = polar_to_cartesian(2.0, PI / 2.0);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 2.0, epsilon = 1e-12);
    }
}
