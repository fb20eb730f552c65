//! Symbolic transition functions and compiled derivatives.
//!
//! A [`TransitionFn`] is traced once into an expression graph whose input
//! variables are laid out as:
//!
//! ```text
//! vars [0..NX)        = state
//! vars [NX..NX+NU)    = control
//! ```
//!
//! [`SymbolicDynamics`] differentiates every output with respect to every
//! input, optionally twice, and compiles the results to tapes. The tapes are
//! immutable, so a model can be shared between threads once built.

use core::cell::RefCell;

use cp_expr::{ExprId, Graph, Sym, Tape};
use nalgebra::{SMatrix, SVector};
use tracing::debug;

use crate::model::{Dynamics, StepHessians, StepJacobians, TransitionFn};

/// A transition function traced into an expression graph.
#[derive(Clone, Debug)]
pub struct SymbolicTransition<const NX: usize, const NU: usize> {
    graph: Graph,
    outputs: [ExprId; NX],
}

impl<const NX: usize, const NU: usize> SymbolicTransition<NX, NU> {
    /// Trace `f` with symbolic state and control inputs.
    pub fn trace<T: TransitionFn<NX, NU>>(f: &T) -> Self {
        let cell = RefCell::new(Graph::new());
        let outputs = {
            let x: [Sym<'_>; NX] = std::array::from_fn(|i| Sym::var(&cell, i as u16));
            let u: [Sym<'_>; NU] = std::array::from_fn(|j| Sym::var(&cell, (NX + j) as u16));
            f.transition(&x, &u).map(Sym::id)
        };
        Self {
            graph: cell.into_inner(),
            outputs,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Output expressions, one per next-state component.
    pub fn outputs(&self) -> &[ExprId; NX] {
        &self.outputs
    }

    /// Evaluate the traced expressions directly.
    ///
    /// Compiles a throwaway tape; use [`SymbolicDynamics`] for repeated
    /// evaluation.
    pub fn eval(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> SVector<f64, NX> {
        let tape = Tape::new(&self.graph, &self.outputs);
        let mut out = SVector::<f64, NX>::zeros();
        tape.eval_into(&pack(x, u), out.as_mut_slice());
        out
    }
}

/// Dynamics backed by symbolically differentiated, compiled expressions.
#[derive(Clone, Debug)]
pub struct SymbolicDynamics<const NX: usize, const NU: usize> {
    f: Tape,
    /// Row-major `[NX x (NX + NU)]` first derivatives.
    jac: Tape,
    /// Per output, row-major `[(NX + NU) x (NX + NU)]` second derivatives.
    hess: Option<Tape>,
}

impl<const NX: usize, const NU: usize> SymbolicDynamics<NX, NU> {
    /// Differentiate and compile `transition`.
    ///
    /// With `hessians` set, second derivatives are compiled as well; this
    /// roughly squares the build cost, so leave it off for Gauss-Newton
    /// style optimizers that only use Jacobians.
    pub fn new(transition: SymbolicTransition<NX, NU>, hessians: bool) -> Self {
        let SymbolicTransition { mut graph, outputs } = transition;
        let n = NX + NU;
        let traced_nodes = graph.len();

        let mut jac_exprs = Vec::with_capacity(NX * n);
        for &out in &outputs {
            for j in 0..n {
                let d = graph.diff(out, j as u16);
                jac_exprs.push(d);
            }
        }

        let hess_exprs = hessians.then(|| {
            let mut exprs = Vec::with_capacity(NX * n * n);
            for &d in &jac_exprs {
                for k in 0..n {
                    exprs.push(graph.diff(d, k as u16));
                }
            }
            exprs
        });

        let f = Tape::new(&graph, &outputs);
        let jac = Tape::new(&graph, &jac_exprs);
        let hess = hess_exprs.map(|exprs| Tape::new(&graph, &exprs));

        debug!(
            state_size = NX,
            control_size = NU,
            traced_nodes,
            total_nodes = graph.len(),
            f_ops = f.len(),
            jac_ops = jac.len(),
            hess_ops = hess.as_ref().map_or(0, Tape::len),
            "compiled symbolic dynamics"
        );

        Self { f, jac, hess }
    }

    /// Trace `f` and compile it in one go.
    pub fn from_transition<T: TransitionFn<NX, NU>>(f: &T, hessians: bool) -> Self {
        Self::new(SymbolicTransition::trace(f), hessians)
    }
}

impl<const NX: usize, const NU: usize> Dynamics<NX, NU> for SymbolicDynamics<NX, NU> {
    fn step(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> SVector<f64, NX> {
        let mut out = SVector::<f64, NX>::zeros();
        self.f.eval_into(&pack(x, u), out.as_mut_slice());
        out
    }

    fn jacobians(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> StepJacobians<NX, NU> {
        let n = NX + NU;
        let mut flat = vec![0.0; NX * n];
        self.jac.eval_into(&pack(x, u), &mut flat);

        StepJacobians {
            f_x: SMatrix::from_fn(|i, j| flat[i * n + j]),
            f_u: SMatrix::from_fn(|i, j| flat[i * n + NX + j]),
        }
    }

    fn has_hessians(&self) -> bool {
        self.hess.is_some()
    }

    fn hessians(&self, x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> Option<StepHessians<NX, NU>> {
        let tape = self.hess.as_ref()?;
        let n = NX + NU;
        let mut flat = vec![0.0; NX * n * n];
        tape.eval_into(&pack(x, u), &mut flat);

        let h = |i: usize, r: usize, c: usize| flat[i * n * n + r * n + c];
        Some(StepHessians {
            f_xx: std::array::from_fn(|i| SMatrix::from_fn(|r, c| h(i, r, c))),
            f_ux: std::array::from_fn(|i| SMatrix::from_fn(|r, c| h(i, NX + r, c))),
            f_uu: std::array::from_fn(|i| SMatrix::from_fn(|r, c| h(i, NX + r, NX + c))),
        })
    }
}

/// Input layout shared by every tape: state then control.
fn pack<const NX: usize, const NU: usize>(x: &SVector<f64, NX>, u: &SVector<f64, NU>) -> Vec<f64> {
    let mut inputs = Vec::with_capacity(NX + NU);
    inputs.extend_from_slice(x.as_slice());
    inputs.extend_from_slice(u.as_slice());
    inputs
}
