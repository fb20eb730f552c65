//! Numeric abstraction shared by plain, dual and symbolic evaluation.

use core::ops::{Add, Div, Mul, Neg, Sub};

/// Scalar type a transition function can be written against.
///
/// Every operation here is differentiable almost everywhere and has a
/// counterpart node in [`crate::Graph`]. Code generic over `Scalar` must not
/// branch on values, otherwise the traced graph would only capture one path.
pub trait Scalar:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tanh(self) -> Self;
    /// Four-quadrant arctangent of `self / x`, in `[-pi, pi]`.
    fn atan2(self, x: Self) -> Self;
    fn powi(self, n: i32) -> Self;
}

impl Scalar for f64 {
    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn tanh(self) -> Self {
        f64::tanh(self)
    }

    #[inline]
    fn atan2(self, x: Self) -> Self {
        f64::atan2(self, x)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly<S: Scalar>(x: S) -> S {
        x.powi(2) * 3.0 - x / 2.0 + 1.0
    }

    #[test]
    fn f64_generic_matches_direct() {
        let x = 1.7_f64;
        let direct = 3.0 * x * x - x / 2.0 + 1.0;
        assert!((poly(x) - direct).abs() < 1e-12);
    }

    #[test]
    fn atan2_quadrants() {
        assert!((Scalar::atan2(1.0_f64, 0.0) - core::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert!((Scalar::atan2(0.0_f64, -1.0) - core::f64::consts::PI).abs() < 1e-15);
    }
}
