//! Forward-mode (dual number) differentiation of a transition function.

use cp_expr::Dual;
use nalgebra::{SMatrix, SVector};

use crate::model::{Dynamics, StepJacobians, TransitionFn, eval_f64, lift};

/// Dynamics differentiated with dual numbers.
///
/// Each Jacobian column costs one evaluation of the transition, so a full
/// linearization takes `NX + NU` passes. No build step is needed, which
/// makes this the cheapest strategy for one-off linearizations.
#[derive(Clone, Debug)]
pub struct DualDynamics<T> {
    f: T,
}

impl<T> DualDynamics<T> {
    pub fn new(f: T) -> Self {
        Self { f }
    }

    pub fn inner(&self) -> &T {
        &self.f
    }
}

impl<T, const NX: usize, const NU: usize> Dynamics<NX, NU> for DualDynamics<T>
where
    T: TransitionFn<NX, NU>,
{
    fn step(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> SVector<f64, NX> {
        eval_f64(&self.f, x, u)
    }

    fn jacobians(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> StepJacobians<NX, NU> {
        let mut f_x = SMatrix::<f64, NX, NX>::zeros();
        let mut f_u = SMatrix::<f64, NX, NU>::zeros();

        for j in 0..NX + NU {
            let seed = |i: usize, v: f64| {
                if i == j {
                    Dual::variable(v)
                } else {
                    Dual::constant(v)
                }
            };
            let xs = lift(x, seed);
            let us = lift(u, |i, v| seed(NX + i, v));
            let next = self.f.transition(&xs, &us);

            for (i, d) in next.iter().enumerate() {
                if j < NX {
                    f_x[(i, j)] = d.du;
                } else {
                    f_u[(i, j - NX)] = d.du;
                }
            }
        }

        StepJacobians { f_x, f_u }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_expr::Scalar;

    struct Quadratic;

    impl TransitionFn<2, 1> for Quadratic {
        fn transition<S: Scalar>(&self, x: &[S; 2], u: &[S; 1]) -> [S; 2] {
            [x[0] * x[1], x[1].powi(2) + u[0] * x[0]]
        }
    }

    #[test]
    fn columns_follow_seeded_inputs() {
        let m = DualDynamics::new(Quadratic);
        let x = SVector::<f64, 2>::new(2.0, 3.0);
        let u = SVector::<f64, 1>::new(-1.0);

        assert_eq!(m.step(&x, &u), SVector::<f64, 2>::new(6.0, 7.0));

        let jac = m.jacobians(&x, &u);
        assert_eq!(jac.f_x, SMatrix::<f64, 2, 2>::new(3.0, 2.0, -1.0, 6.0));
        assert_eq!(jac.f_u, SMatrix::<f64, 2, 1>::new(0.0, 2.0));
    }
}
