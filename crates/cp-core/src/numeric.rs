use crate::CpError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute and relative tolerance pair used by comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Element-wise [`nearly_equal`] over two slices of equal length.
pub fn all_nearly_equal(a: &[Real], b: &[Real], tol: Tolerances) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| nearly_equal(*x, *y, tol))
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CpError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CpError::NonFinite { what, value: v })
    }
}

/// Angle in `(-pi, pi]` whose sine and cosine are proportional to `sin`
/// and `cos`.
pub fn angle_from_sin_cos(sin: Real, cos: Real) -> Real {
    let theta = sin.atan2(cos);
    // atan2 returns -pi for (-0.0, -1.0); the canonical range excludes it.
    if theta <= -core::f64::consts::PI {
        core::f64::consts::PI
    } else {
        theta
    }
}

/// Wrap an angle into `(-pi, pi]`.
pub fn wrap_angle(theta: Real) -> Real {
    angle_from_sin_cos(theta.sin(), theta.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn all_nearly_equal_checks_length() {
        let tol = Tolerances::default();
        assert!(all_nearly_equal(&[1.0, 2.0], &[1.0, 2.0], tol));
        assert!(!all_nearly_equal(&[1.0, 2.0], &[1.0], tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-15);
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn negative_zero_sine_maps_to_pi() {
        assert_eq!((-0.0_f64).atan2(-1.0), -PI);
        assert_eq!(angle_from_sin_cos(-0.0, -1.0), PI);
        assert_eq!(angle_from_sin_cos(0.0, -1.0), PI);
        assert_eq!(angle_from_sin_cos(0.0, 2.0), 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6_f64..1e6, b in -1e6_f64..1e6) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn wrapped_angle_is_canonical(theta in -50.0_f64..50.0) {
            let w = wrap_angle(theta);
            prop_assert!(w > -core::f64::consts::PI && w <= core::f64::consts::PI);
            prop_assert!((w.sin() - theta.sin()).abs() < 1e-9);
            prop_assert!((w.cos() - theta.cos()).abs() < 1e-9);
        }
    }
}
