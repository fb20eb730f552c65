//! Smooth control saturation.
//!
//! Optimizers work on an unbounded control; the dynamics squash it into the
//! actuator range with a scaled `tanh`, which keeps gradients informative
//! near the bounds where a hard clip would zero them.

use cp_expr::Scalar;

/// Squash `u` into `(min_bounds, max_bounds)`.
///
/// `constrain(u) = (max - min) / 2 * tanh(u) + (max + min) / 2`
///
/// Monotonic and smooth; `u = 0` maps to the midpoint. The result is
/// strictly inside the bounds only while `tanh(u)` is below 1 in f64; for
/// `|u|` past about 19 it rounds to 1 and the bound itself is returned.
pub fn constrain<S: Scalar>(u: S, min_bounds: f64, max_bounds: f64) -> S {
    let half_range = (max_bounds - min_bounds) / 2.0;
    let mid = (max_bounds + min_bounds) / 2.0;
    u.tanh() * half_range + mid
}

/// Per-dimension [`constrain`].
pub fn constrain_each<S: Scalar, const N: usize>(
    u: [S; N],
    min_bounds: &[f64; N],
    max_bounds: &[f64; N],
) -> [S; N] {
    std::array::from_fn(|i| constrain(u[i], min_bounds[i], max_bounds[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_expr::Dual;

    #[test]
    fn midpoint_at_zero() {
        assert_eq!(constrain(0.0, -1.0, 1.0), 0.0);
        assert!((constrain(0.0, 2.0, 6.0) - 4.0).abs() < 1e-15);
    }

    #[test]
    fn saturates_inside_bounds() {
        for u in [-10.0, -3.0, -0.5, 0.5, 3.0, 10.0] {
            let f = constrain(u, -2.0, 5.0);
            assert!(f > -2.0 && f < 5.0, "u={u} -> {f}");
        }
        assert!((constrain(50.0, -2.0, 5.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn reaches_bounds_once_tanh_rounds_to_one() {
        assert_eq!(40.0_f64.tanh(), 1.0);
        assert_eq!(constrain(40.0, -2.0, 3.0), 3.0);
        assert_eq!(constrain(-40.0, -2.0, 3.0), -2.0);
        assert!(constrain(10.0, -2.0, 3.0) < 3.0);
    }

    #[test]
    fn monotonic_with_positive_slope() {
        let mut prev = f64::NEG_INFINITY;
        for k in -40..=40 {
            let u = k as f64 * 0.1;
            let f = constrain(u, -1.0, 1.0);
            assert!(f > prev);
            prev = f;

            let slope = constrain(Dual::variable(u), -1.0, 1.0).du;
            assert!(slope > 0.0);
        }
    }

    #[test]
    fn per_dimension_bounds() {
        let out = constrain_each([0.0, 0.0], &[-1.0, 10.0], &[1.0, 20.0]);
        assert_eq!(out, [0.0, 15.0]);
    }
}
