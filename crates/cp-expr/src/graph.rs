//! Hash-consed expression graph with symbolic differentiation.
//!
//! Nodes live in an arena and only ever reference earlier nodes, so the
//! arena order is already a topological order. Constructors fold constants
//! and apply a handful of algebraic identities; structurally identical nodes
//! are shared.

use core::fmt;
use std::collections::HashMap;

use cp_core::CpResult;

use crate::tape::Tape;

/// Handle to a node in a [`Graph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    /// Position of the node in its graph's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

/// Expression node.
///
/// Subtraction and division are expressed through `Neg` and `Recip`, which
/// keeps the set of differentiation rules small.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// Literal, stored as raw bits so the node can be hashed.
    Const(u64),
    /// Input variable by position.
    Var(u16),
    Add(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Neg(ExprId),
    Recip(ExprId),
    Powi(ExprId, i32),
    Sin(ExprId),
    Cos(ExprId),
    Tanh(ExprId),
    /// `atan2(y, x)`.
    Atan2(ExprId, ExprId),
}

impl Node {
    /// Literal value, if this is a constant.
    pub fn as_const(&self) -> Option<f64> {
        match *self {
            Node::Const(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    /// Operands, in evaluation order.
    pub fn operands(&self) -> (Option<ExprId>, Option<ExprId>) {
        match *self {
            Node::Const(_) | Node::Var(_) => (None, None),
            Node::Add(a, b) | Node::Mul(a, b) | Node::Atan2(a, b) => (Some(a), Some(b)),
            Node::Neg(a)
            | Node::Recip(a)
            | Node::Powi(a, _)
            | Node::Sin(a)
            | Node::Cos(a)
            | Node::Tanh(a) => (Some(a), None),
        }
    }
}

/// Arena of expression nodes.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    interned: HashMap<Node, ExprId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ExprId) -> Node {
        self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Literal value of `id`, if it is a constant.
    pub fn const_value(&self, id: ExprId) -> Option<f64> {
        self.node(id).as_const()
    }

    fn intern(&mut self, node: Node) -> ExprId {
        if let Some(&id) = self.interned.get(&node) {
            return id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.interned.insert(node, id);
        id
    }

    pub fn constant(&mut self, v: f64) -> ExprId {
        // -0.0 and 0.0 share a node
        let v = if v == 0.0 { 0.0 } else { v };
        self.intern(Node::Const(v.to_bits()))
    }

    pub fn zero(&mut self) -> ExprId {
        self.constant(0.0)
    }

    pub fn one(&mut self) -> ExprId {
        self.constant(1.0)
    }

    pub fn var(&mut self, index: u16) -> ExprId {
        self.intern(Node::Var(index))
    }

    pub fn add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        match (self.const_value(a), self.const_value(b)) {
            (Some(x), Some(y)) => return self.constant(x + y),
            (Some(x), _) if x == 0.0 => return b,
            (_, Some(y)) if y == 0.0 => return a,
            _ => {}
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.intern(Node::Add(a, b))
    }

    pub fn sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.neg(b);
        self.add(a, nb)
    }

    /// `a * b`. A zero constant does not absorb a non-constant operand, so
    /// `0 * inf` still evaluates to NaN.
    pub fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        match (self.const_value(a), self.const_value(b)) {
            (Some(x), Some(y)) => return self.constant(x * y),
            (Some(x), _) if x == 1.0 => return b,
            (_, Some(y)) if y == 1.0 => return a,
            (Some(x), _) if x == -1.0 => return self.neg(b),
            (_, Some(y)) if y == -1.0 => return self.neg(a),
            _ => {}
        }
        if a == b {
            return self.powi(a, 2);
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.intern(Node::Mul(a, b))
    }

    pub fn div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let rb = self.recip(b);
        self.mul(a, rb)
    }

    pub fn neg(&mut self, a: ExprId) -> ExprId {
        match self.node(a) {
            Node::Const(bits) => self.constant(-f64::from_bits(bits)),
            Node::Neg(inner) => inner,
            _ => self.intern(Node::Neg(a)),
        }
    }

    pub fn recip(&mut self, a: ExprId) -> ExprId {
        match self.node(a) {
            Node::Const(bits) => self.constant(1.0 / f64::from_bits(bits)),
            Node::Recip(inner) => inner,
            _ => self.intern(Node::Recip(a)),
        }
    }

    pub fn powi(&mut self, a: ExprId, n: i32) -> ExprId {
        match n {
            0 => return self.one(),
            1 => return a,
            -1 => return self.recip(a),
            _ => {}
        }
        if let Some(x) = self.const_value(a) {
            return self.constant(x.powi(n));
        }
        self.intern(Node::Powi(a, n))
    }

    pub fn sin(&mut self, a: ExprId) -> ExprId {
        match self.const_value(a) {
            Some(x) => self.constant(x.sin()),
            None => self.intern(Node::Sin(a)),
        }
    }

    pub fn cos(&mut self, a: ExprId) -> ExprId {
        match self.const_value(a) {
            Some(x) => self.constant(x.cos()),
            None => self.intern(Node::Cos(a)),
        }
    }

    pub fn tanh(&mut self, a: ExprId) -> ExprId {
        match self.const_value(a) {
            Some(x) => self.constant(x.tanh()),
            None => self.intern(Node::Tanh(a)),
        }
    }

    pub fn atan2(&mut self, y: ExprId, x: ExprId) -> ExprId {
        match (self.const_value(y), self.const_value(x)) {
            (Some(yv), Some(xv)) => self.constant(yv.atan2(xv)),
            _ => self.intern(Node::Atan2(y, x)),
        }
    }

    /// Symbolic partial derivative of `f` with respect to input `wrt`.
    ///
    /// Shared subexpressions are differentiated once per call.
    pub fn diff(&mut self, f: ExprId, wrt: u16) -> ExprId {
        let mut memo = HashMap::new();
        self.diff_memo(f, wrt, &mut memo)
    }

    fn diff_memo(&mut self, f: ExprId, wrt: u16, memo: &mut HashMap<ExprId, ExprId>) -> ExprId {
        if let Some(&d) = memo.get(&f) {
            return d;
        }

        let d = match self.node(f) {
            Node::Const(_) => self.zero(),
            Node::Var(i) => {
                if i == wrt {
                    self.one()
                } else {
                    self.zero()
                }
            }
            Node::Add(a, b) => {
                let da = self.diff_memo(a, wrt, memo);
                let db = self.diff_memo(b, wrt, memo);
                self.add(da, db)
            }
            Node::Mul(a, b) => {
                let da = self.diff_memo(a, wrt, memo);
                let db = self.diff_memo(b, wrt, memo);
                let l = self.chain(da, b);
                let r = self.chain(db, a);
                self.add(l, r)
            }
            Node::Neg(a) => {
                let da = self.diff_memo(a, wrt, memo);
                self.neg(da)
            }
            Node::Recip(a) => {
                // d(1/a) = -da * (1/a)^2
                let da = self.diff_memo(a, wrt, memo);
                let r2 = self.powi(f, 2);
                let t = self.chain(da, r2);
                self.neg(t)
            }
            Node::Powi(a, n) => {
                let da = self.diff_memo(a, wrt, memo);
                let p = self.powi(a, n - 1);
                let c = self.constant(n as f64);
                let cp = self.mul(c, p);
                self.chain(da, cp)
            }
            Node::Sin(a) => {
                let da = self.diff_memo(a, wrt, memo);
                let c = self.cos(a);
                self.chain(da, c)
            }
            Node::Cos(a) => {
                let da = self.diff_memo(a, wrt, memo);
                let s = self.sin(a);
                let t = self.chain(da, s);
                self.neg(t)
            }
            Node::Tanh(a) => {
                // d tanh(a) = (1 - tanh(a)^2) * da
                let da = self.diff_memo(a, wrt, memo);
                let t2 = self.powi(f, 2);
                let one = self.one();
                let s = self.sub(one, t2);
                self.chain(da, s)
            }
            Node::Atan2(y, x) => {
                // d atan2(y, x) = (x * dy - y * dx) / (x^2 + y^2)
                let dy = self.diff_memo(y, wrt, memo);
                let dx = self.diff_memo(x, wrt, memo);
                let xdy = self.chain(dy, x);
                let ydx = self.chain(dx, y);
                let num = self.sub(xdy, ydx);
                let x2 = self.powi(x, 2);
                let y2 = self.powi(y, 2);
                let den = self.add(x2, y2);
                self.div(num, den)
            }
        };

        memo.insert(f, d);
        d
    }

    /// Chain-rule term `d * e`, dropped when the inner derivative `d` is
    /// structurally zero.
    fn chain(&mut self, d: ExprId, e: ExprId) -> ExprId {
        if self.const_value(d) == Some(0.0) {
            return self.zero();
        }
        self.mul(d, e)
    }

    /// Evaluate a single expression at `inputs`.
    pub fn eval(&self, id: ExprId, inputs: &[f64]) -> CpResult<f64> {
        let values = Tape::new(self, &[id]).eval_vec(inputs)?;
        Ok(values[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_fold() {
        let mut g = Graph::new();
        let a = g.constant(2.0);
        let b = g.constant(3.0);
        let s = g.add(a, b);
        let p = g.mul(s, b);
        assert_eq!(g.const_value(p), Some(15.0));

        let z = g.zero();
        let t = g.sin(z);
        assert_eq!(g.const_value(t), Some(0.0));
    }

    #[test]
    fn identities_do_not_allocate() {
        let mut g = Graph::new();
        let x = g.var(0);
        let zero = g.zero();
        let one = g.one();
        let before = g.len();

        assert_eq!(g.add(x, zero), x);
        assert_eq!(g.mul(x, one), x);
        assert_eq!(g.powi(x, 1), x);
        assert_eq!(g.len(), before);

        let n = g.neg(x);
        assert_eq!(g.neg(n), x);
        let r = g.recip(x);
        assert_eq!(g.recip(r), x);
    }

    #[test]
    fn hash_consing_shares_commutative_nodes() {
        let mut g = Graph::new();
        let x = g.var(0);
        let y = g.var(1);
        let a = g.add(x, y);
        let b = g.add(y, x);
        assert_eq!(a, b);

        let m1 = g.mul(x, y);
        let m2 = g.mul(y, x);
        assert_eq!(m1, m2);

        let s1 = g.sin(x);
        let s2 = g.sin(x);
        assert_eq!(s1, s2);
    }

    #[test]
    fn zero_factor_keeps_non_finite_operand() {
        let mut g = Graph::new();
        let x = g.var(0);
        let zero = g.zero();
        let p = g.mul(zero, x);
        let d = g.sub(x, x);
        assert_ne!(p, zero);
        assert_ne!(d, zero);

        assert_eq!(g.eval(p, &[3.0]).unwrap(), 0.0);
        assert!(g.eval(p, &[f64::INFINITY]).unwrap().is_nan());
        assert!(g.eval(d, &[f64::INFINITY]).unwrap().is_nan());
    }

    #[test]
    fn diff_skips_zero_chain_terms() {
        // d(x * y)/dx is y itself, not y + 0 * x
        let mut g = Graph::new();
        let x = g.var(0);
        let y = g.var(1);
        let f = g.mul(x, y);
        assert_eq!(g.diff(f, 0), y);

        let s = g.sin(y);
        let d = g.diff(s, 0);
        assert_eq!(g.const_value(d), Some(0.0));
    }

    #[test]
    fn negative_zero_is_zero() {
        let mut g = Graph::new();
        assert_eq!(g.constant(-0.0), g.zero());
    }

    #[test]
    fn diff_of_variable() {
        let mut g = Graph::new();
        let x = g.var(0);
        let y = g.var(1);
        let dx = g.diff(x, 0);
        let dy = g.diff(y, 0);
        assert_eq!(g.const_value(dx), Some(1.0));
        assert_eq!(g.const_value(dy), Some(0.0));
    }

    #[test]
    fn diff_product_and_quotient() {
        // f = x * y / (x + 1)
        let mut g = Graph::new();
        let x = g.var(0);
        let y = g.var(1);
        let one = g.one();
        let xy = g.mul(x, y);
        let den = g.add(x, one);
        let f = g.div(xy, den);

        let dfdx = g.diff(f, 0);
        let dfdy = g.diff(f, 1);

        let (xv, yv) = (2.0, 5.0);
        // df/dx = y / (x + 1)^2, df/dy = x / (x + 1)
        let expected_dx = yv / (xv + 1.0_f64).powi(2);
        let expected_dy = xv / (xv + 1.0);
        assert!((g.eval(dfdx, &[xv, yv]).unwrap() - expected_dx).abs() < 1e-12);
        assert!((g.eval(dfdy, &[xv, yv]).unwrap() - expected_dy).abs() < 1e-12);
    }

    #[test]
    fn diff_atan2_of_sin_cos_is_one() {
        // atan2(sin t, cos t) = t locally, so the derivative is 1
        let mut g = Graph::new();
        let t = g.var(0);
        let s = g.sin(t);
        let c = g.cos(t);
        let f = g.atan2(s, c);
        let d = g.diff(f, 0);
        for tv in [-2.0, -0.3, 0.0, 1.1, 3.0] {
            assert!((g.eval(d, &[tv]).unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn diff_tanh_and_powi() {
        let mut g = Graph::new();
        let x = g.var(0);
        let t = g.tanh(x);
        let p = g.powi(x, 3);
        let f = g.add(t, p);
        let d = g.diff(f, 0);
        let xv = 0.4_f64;
        let expected = 1.0 - xv.tanh().powi(2) + 3.0 * xv * xv;
        assert!((g.eval(d, &[xv]).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn eval_reports_missing_inputs() {
        let mut g = Graph::new();
        let x = g.var(2);
        assert!(g.eval(x, &[1.0]).is_err());
    }
}
