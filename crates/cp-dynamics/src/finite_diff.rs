//! Finite difference Jacobian computation.

use nalgebra::{SMatrix, SVector};

use crate::model::{Dynamics, StepJacobians, TransitionFn, eval_f64};

/// Difference scheme used by [`FiniteDiffDynamics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FiniteDiffScheme {
    /// `(f(x+h) - f(x)) / h`, one extra evaluation per column.
    Forward,
    /// `(f(x+h) - f(x-h)) / 2h`, more accurate but 2x cost.
    #[default]
    Central,
}

impl FiniteDiffScheme {
    /// Jacobian of `f` at `x` with this scheme.
    pub fn jacobian<const N: usize, const M: usize, F>(
        self,
        x: &SVector<f64, N>,
        f: F,
        epsilon: f64,
    ) -> SMatrix<f64, M, N>
    where
        F: Fn(&SVector<f64, N>) -> SVector<f64, M>,
    {
        match self {
            FiniteDiffScheme::Forward => forward_difference_jacobian(x, f, epsilon),
            FiniteDiffScheme::Central => central_difference_jacobian(x, f, epsilon),
        }
    }
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by `epsilon * max(|x[j]|, 1)` and computes
/// (f(x+e) - f(x))/e.
pub fn forward_difference_jacobian<const N: usize, const M: usize, F>(
    x: &SVector<f64, N>,
    f: F,
    epsilon: f64,
) -> SMatrix<f64, M, N>
where
    F: Fn(&SVector<f64, N>) -> SVector<f64, M>,
{
    let f_x = f(x);
    let mut jac = SMatrix::<f64, M, N>::zeros();

    for j in 0..N {
        let mut x_perturbed = *x;
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let df = (f(&x_perturbed) - f_x) / dx;
        jac.set_column(j, &df);
    }

    jac
}

/// Compute Jacobian using central finite differences.
pub fn central_difference_jacobian<const N: usize, const M: usize, F>(
    x: &SVector<f64, N>,
    f: F,
    epsilon: f64,
) -> SMatrix<f64, M, N>
where
    F: Fn(&SVector<f64, N>) -> SVector<f64, M>,
{
    let mut jac = SMatrix::<f64, M, N>::zeros();

    for j in 0..N {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = *x;
        x_plus[j] += dx;

        let mut x_minus = *x;
        x_minus[j] -= dx;

        let df = (f(&x_plus) - f(&x_minus)) / (2.0 * dx);
        jac.set_column(j, &df);
    }

    jac
}

/// Dynamics differentiated numerically.
///
/// Useful as a reference for the exact strategies and for transition
/// functions that only exist as black-box `f64` code paths.
#[derive(Clone, Debug)]
pub struct FiniteDiffDynamics<T> {
    f: T,
    epsilon: f64,
    scheme: FiniteDiffScheme,
}

impl<T> FiniteDiffDynamics<T> {
    /// Central differences with `epsilon = 1e-6`.
    pub fn new(f: T) -> Self {
        Self {
            f,
            epsilon: 1e-6,
            scheme: FiniteDiffScheme::default(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_scheme(mut self, scheme: FiniteDiffScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn scheme(&self) -> FiniteDiffScheme {
        self.scheme
    }
}

impl<T, const NX: usize, const NU: usize> Dynamics<NX, NU> for FiniteDiffDynamics<T>
where
    T: TransitionFn<NX, NU>,
{
    fn step(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> SVector<f64, NX> {
        eval_f64(&self.f, x, u)
    }

    fn jacobians(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> StepJacobians<NX, NU> {
        let (scheme, eps) = (self.scheme, self.epsilon);
        StepJacobians {
            f_x: scheme.jacobian(x, |xp| eval_f64(&self.f, xp, u), eps),
            f_u: scheme.jacobian(u, |up| eval_f64(&self.f, x, up), eps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_expr::Scalar;

    #[test]
    fn jacobian_linear() {
        // f(x) = 2*x, J = 2
        let f = |x: &SVector<f64, 1>| x * 2.0;
        let x = SVector::<f64, 1>::new(3.0);
        let jac = forward_difference_jacobian(&x, f, 1e-7);

        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn jacobian_quadratic() {
        // f(x) = x^2, J = 2*x
        let f = |x: &SVector<f64, 1>| x.map(|v| v * v);
        let x = SVector::<f64, 1>::new(3.0);

        let fwd = forward_difference_jacobian(&x, f, 1e-7);
        let ctr = central_difference_jacobian(&x, f, 1e-6);

        assert!((fwd[(0, 0)] - 6.0).abs() < 1e-5);
        assert!((ctr[(0, 0)] - 6.0).abs() < 1e-8);
    }

    struct Rotation;

    impl TransitionFn<2, 1> for Rotation {
        fn transition<S: Scalar>(&self, x: &[S; 2], u: &[S; 1]) -> [S; 2] {
            let (s, c) = (u[0].sin(), u[0].cos());
            [x[0] * c - x[1] * s, x[0] * s + x[1] * c]
        }
    }

    #[test]
    fn dynamics_jacobians_for_both_schemes() {
        let x = SVector::<f64, 2>::new(1.0, 0.5);
        let u = SVector::<f64, 1>::new(0.3);
        let (s, c) = (0.3_f64.sin(), 0.3_f64.cos());

        for scheme in [FiniteDiffScheme::Forward, FiniteDiffScheme::Central] {
            let m = FiniteDiffDynamics::new(Rotation).with_scheme(scheme);
            let tol = match scheme {
                FiniteDiffScheme::Forward => 1e-5,
                FiniteDiffScheme::Central => 1e-8,
            };
            let jac = m.jacobians(&x, &u);

            assert!((jac.f_x[(0, 0)] - c).abs() < tol);
            assert!((jac.f_x[(0, 1)] + s).abs() < tol);
            assert!((jac.f_u[(0, 0)] - (-x[0] * s - x[1] * c)).abs() < tol);
            assert!((jac.f_u[(1, 0)] - (x[0] * c - x[1] * s)).abs() < tol);
        }
    }

    #[test]
    fn builder_settings() {
        let m = FiniteDiffDynamics::new(Rotation)
            .with_epsilon(1e-4)
            .with_scheme(FiniteDiffScheme::Forward);
        assert_eq!(m.epsilon(), 1e-4);
        assert_eq!(m.scheme(), FiniteDiffScheme::Forward);
    }
}
