//! Forward-mode dual numbers.

use crate::scalar::Scalar;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Dual number `re + du * eps` with `eps^2 = 0`.
///
/// Seeding one input with `du = 1` and evaluating a function yields the
/// directional derivative along that input in `du`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual {
    pub re: f64,
    pub du: f64,
}

impl Dual {
    pub fn new(re: f64, du: f64) -> Self {
        Self { re, du }
    }

    /// A value that does not vary with the seeded direction.
    pub fn constant(re: f64) -> Self {
        Self { re, du: 0.0 }
    }

    /// A seeded input.
    pub fn variable(re: f64) -> Self {
        Self { re, du: 1.0 }
    }
}

impl Add for Dual {
    type Output = Dual;

    fn add(self, rhs: Dual) -> Dual {
        Dual::new(self.re + rhs.re, self.du + rhs.du)
    }
}

impl Sub for Dual {
    type Output = Dual;

    fn sub(self, rhs: Dual) -> Dual {
        Dual::new(self.re - rhs.re, self.du - rhs.du)
    }
}

impl Mul for Dual {
    type Output = Dual;

    fn mul(self, rhs: Dual) -> Dual {
        Dual::new(self.re * rhs.re, self.du * rhs.re + self.re * rhs.du)
    }
}

impl Div for Dual {
    type Output = Dual;

    fn div(self, rhs: Dual) -> Dual {
        Dual::new(
            self.re / rhs.re,
            (self.du * rhs.re - self.re * rhs.du) / (rhs.re * rhs.re),
        )
    }
}

impl Neg for Dual {
    type Output = Dual;

    fn neg(self) -> Dual {
        Dual::new(-self.re, -self.du)
    }
}

impl Add<f64> for Dual {
    type Output = Dual;

    fn add(self, rhs: f64) -> Dual {
        Dual::new(self.re + rhs, self.du)
    }
}

impl Sub<f64> for Dual {
    type Output = Dual;

    fn sub(self, rhs: f64) -> Dual {
        Dual::new(self.re - rhs, self.du)
    }
}

impl Mul<f64> for Dual {
    type Output = Dual;

    fn mul(self, rhs: f64) -> Dual {
        Dual::new(self.re * rhs, self.du * rhs)
    }
}

impl Div<f64> for Dual {
    type Output = Dual;

    fn div(self, rhs: f64) -> Dual {
        Dual::new(self.re / rhs, self.du / rhs)
    }
}

impl Scalar for Dual {
    fn sin(self) -> Self {
        Dual::new(self.re.sin(), self.re.cos() * self.du)
    }

    fn cos(self) -> Self {
        Dual::new(self.re.cos(), -self.re.sin() * self.du)
    }

    fn tanh(self) -> Self {
        let t = self.re.tanh();
        Dual::new(t, (1.0 - t * t) * self.du)
    }

    fn atan2(self, x: Self) -> Self {
        let r2 = x.re * x.re + self.re * self.re;
        Dual::new(
            self.re.atan2(x.re),
            (x.re * self.du - self.re * x.du) / r2,
        )
    }

    fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Dual::constant(1.0);
        }
        Dual::new(
            self.re.powi(n),
            n as f64 * self.re.powi(n - 1) * self.du,
        )
    }
}
