//! Dynamics model interface consumed by trajectory optimizers.

use cp_expr::Scalar;
use nalgebra::{SMatrix, SVector};

/// Discrete transition `x' = f(x, u)` written once, generic over the scalar.
///
/// Implementations must be pure and must not branch on input values, so the
/// same code can be evaluated on `f64`, differentiated with dual numbers, or
/// traced into an expression graph.
pub trait TransitionFn<const NX: usize, const NU: usize>: Send + Sync {
    fn transition<S: Scalar>(&self, x: &[S; NX], u: &[S; NU]) -> [S; NX];
}

/// First derivatives of one transition step.
///
/// - `f_x`: ∂x'/∂x
/// - `f_u`: ∂x'/∂u
#[derive(Debug, Clone, PartialEq)]
pub struct StepJacobians<const NX: usize, const NU: usize> {
    pub f_x: SMatrix<f64, NX, NX>,
    pub f_u: SMatrix<f64, NX, NU>,
}

/// Second derivatives of one transition step, one matrix per output.
///
/// For output component `i`:
/// - `f_xx[i]`: ∂²x'_i/∂x²
/// - `f_ux[i]`: ∂²x'_i/∂u∂x (rows = control, columns = state)
/// - `f_uu[i]`: ∂²x'_i/∂u²
#[derive(Debug, Clone, PartialEq)]
pub struct StepHessians<const NX: usize, const NU: usize> {
    pub f_xx: [SMatrix<f64, NX, NX>; NX],
    pub f_ux: [SMatrix<f64, NU, NX>; NX],
    pub f_uu: [SMatrix<f64, NU, NU>; NX],
}

/// Differentiable discrete-time dynamics.
///
/// One implementation exists per differentiation strategy; the optimizer
/// only sees this trait.
pub trait Dynamics<const NX: usize, const NU: usize>: Send + Sync {
    /// Next state after one step from `x` under control `u`.
    fn step(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> SVector<f64, NX>;

    /// Jacobians of [`Dynamics::step`] at `(x, u)`.
    fn jacobians(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> StepJacobians<NX, NU>;

    fn jacobian_wrt_state(
        &self,
        x: &SVector<f64, NX>,
        u: &SVector<f64, NU>,
    ) -> SMatrix<f64, NX, NX> {
        self.jacobians(x, u).f_x
    }

    fn jacobian_wrt_control(
        &self,
        x: &SVector<f64, NX>,
        u: &SVector<f64, NU>,
    ) -> SMatrix<f64, NX, NU> {
        self.jacobians(x, u).f_u
    }

    /// Whether [`Dynamics::hessians`] returns second derivatives.
    fn has_hessians(&self) -> bool {
        false
    }

    fn hessians(
        &self,
        _x: &SVector<f64, NX>,
        _u: &SVector<f64, NU>,
    ) -> Option<StepHessians<NX, NU>> {
        None
    }

    fn state_size(&self) -> usize {
        NX
    }

    fn control_size(&self) -> usize {
        NU
    }
}

/// Copy a static vector into a fixed array of any scalar.
pub(crate) fn lift<S: Copy, const N: usize>(
    v: &SVector<f64, N>,
    f: impl Fn(usize, f64) -> S,
) -> [S; N] {
    std::array::from_fn(|i| f(i, v[i]))
}

/// Plain `f64` evaluation of a transition.
pub(crate) fn eval_f64<T, const NX: usize, const NU: usize>(
    f: &T,
    x: &SVector<f64, NX>,
    u: &SVector<f64, NU>,
) -> SVector<f64, NX>
where
    T: TransitionFn<NX, NU>,
{
    SVector::from(f.transition(&lift(x, |_, v| v), &lift(u, |_, v| v)))
}
