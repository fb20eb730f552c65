//! Tracing scalar that records arithmetic into a [`Graph`].

use core::cell::RefCell;
use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

use crate::graph::{ExprId, Graph};
use crate::scalar::Scalar;

/// Symbolic scalar bound to a graph.
///
/// Every operation borrows the graph mutably for the duration of one node
/// insertion, so handles can be freely copied while tracing. All operands of
/// an operation must come from the same graph.
#[derive(Clone, Copy)]
pub struct Sym<'g> {
    graph: &'g RefCell<Graph>,
    id: ExprId,
}

impl<'g> Sym<'g> {
    /// Input variable `index` of `graph`.
    pub fn var(graph: &'g RefCell<Graph>, index: u16) -> Self {
        let id = graph.borrow_mut().var(index);
        Self { graph, id }
    }

    pub fn constant(graph: &'g RefCell<Graph>, v: f64) -> Self {
        let id = graph.borrow_mut().constant(v);
        Self { graph, id }
    }

    pub fn id(self) -> ExprId {
        self.id
    }

    fn unary(self, op: impl FnOnce(&mut Graph, ExprId) -> ExprId) -> Self {
        let id = op(&mut *self.graph.borrow_mut(), self.id);
        Self {
            graph: self.graph,
            id,
        }
    }

    fn binary(self, rhs: Sym<'g>, op: impl FnOnce(&mut Graph, ExprId, ExprId) -> ExprId) -> Self {
        debug_assert!(
            core::ptr::eq(self.graph, rhs.graph),
            "operands traced into different graphs"
        );
        let id = op(&mut *self.graph.borrow_mut(), self.id, rhs.id);
        Self {
            graph: self.graph,
            id,
        }
    }

    fn with_constant(self, v: f64, op: impl FnOnce(&mut Graph, ExprId, ExprId) -> ExprId) -> Self {
        let mut graph = self.graph.borrow_mut();
        let c = graph.constant(v);
        let id = op(&mut *graph, self.id, c);
        Self {
            graph: self.graph,
            id,
        }
    }
}

impl fmt::Debug for Sym<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({:?})", self.id)
    }
}

macro_rules! sym_binop {
    ($trait:ident, $method:ident) => {
        impl<'g> $trait for Sym<'g> {
            type Output = Sym<'g>;

            fn $method(self, rhs: Sym<'g>) -> Sym<'g> {
                self.binary(rhs, Graph::$method)
            }
        }

        impl<'g> $trait<f64> for Sym<'g> {
            type Output = Sym<'g>;

            fn $method(self, rhs: f64) -> Sym<'g> {
                self.with_constant(rhs, Graph::$method)
            }
        }
    };
}

sym_binop!(Add, add);
sym_binop!(Sub, sub);
sym_binop!(Mul, mul);
sym_binop!(Div, div);

impl<'g> Neg for Sym<'g> {
    type Output = Sym<'g>;

    fn neg(self) -> Sym<'g> {
        self.unary(Graph::neg)
    }
}

impl Scalar for Sym<'_> {
    fn sin(self) -> Self {
        self.unary(Graph::sin)
    }

    fn cos(self) -> Self {
        self.unary(Graph::cos)
    }

    fn tanh(self) -> Self {
        self.unary(Graph::tanh)
    }

    fn atan2(self, x: Self) -> Self {
        self.binary(x, Graph::atan2)
    }

    fn powi(self, n: i32) -> Self {
        self.unary(|g, a| g.powi(a, n))
    }
}
