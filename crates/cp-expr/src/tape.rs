//! Compiled straight-line evaluation of graph outputs.

use cp_core::{CpError, CpResult};

use crate::graph::{ExprId, Graph, Node};

#[derive(Clone, Copy, Debug)]
enum Op {
    Const(f64),
    Var(u16),
    Add(u32, u32),
    Mul(u32, u32),
    Neg(u32),
    Recip(u32),
    Powi(u32, i32),
    Sin(u32),
    Cos(u32),
    Tanh(u32),
    Atan2(u32, u32),
}

/// Compiled program computing a fixed list of graph outputs.
///
/// Only nodes reachable from the outputs are kept, in arena order, and each
/// instruction writes one register. The tape owns no scratch space, so a
/// single instance can be evaluated from several threads at once.
#[derive(Clone, Debug)]
pub struct Tape {
    ops: Vec<Op>,
    outputs: Vec<u32>,
    num_inputs: usize,
}

impl Tape {
    /// Compile `outputs` of `graph`.
    pub fn new(graph: &Graph, outputs: &[ExprId]) -> Self {
        let nodes = graph.nodes();

        let mut live = vec![false; nodes.len()];
        let mut stack: Vec<ExprId> = outputs.to_vec();
        while let Some(id) = stack.pop() {
            if live[id.index()] {
                continue;
            }
            live[id.index()] = true;
            let (a, b) = nodes[id.index()].operands();
            stack.extend(a);
            stack.extend(b);
        }

        let mut register = vec![u32::MAX; nodes.len()];
        let mut ops = Vec::new();
        let mut num_inputs = 0;
        let r = |register: &[u32], id: ExprId| register[id.index()];

        for (i, node) in nodes.iter().enumerate() {
            if !live[i] {
                continue;
            }
            let op = match *node {
                Node::Const(bits) => Op::Const(f64::from_bits(bits)),
                Node::Var(v) => {
                    num_inputs = num_inputs.max(v as usize + 1);
                    Op::Var(v)
                }
                Node::Add(a, b) => Op::Add(r(&register, a), r(&register, b)),
                Node::Mul(a, b) => Op::Mul(r(&register, a), r(&register, b)),
                Node::Neg(a) => Op::Neg(r(&register, a)),
                Node::Recip(a) => Op::Recip(r(&register, a)),
                Node::Powi(a, n) => Op::Powi(r(&register, a), n),
                Node::Sin(a) => Op::Sin(r(&register, a)),
                Node::Cos(a) => Op::Cos(r(&register, a)),
                Node::Tanh(a) => Op::Tanh(r(&register, a)),
                Node::Atan2(y, x) => Op::Atan2(r(&register, y), r(&register, x)),
            };
            register[i] = ops.len() as u32;
            ops.push(op);
        }

        let outputs = outputs.iter().map(|&id| register[id.index()]).collect();

        tracing::trace!(
            graph_nodes = nodes.len(),
            instructions = ops.len(),
            num_inputs,
            "compiled tape"
        );

        Self {
            ops,
            outputs,
            num_inputs,
        }
    }

    /// Smallest input slice length the tape accepts.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Number of instructions after dead-node elimination.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Evaluate into `out`, which must hold exactly `num_outputs()` values.
    pub fn eval(&self, inputs: &[f64], out: &mut [f64]) -> CpResult<()> {
        if inputs.len() < self.num_inputs {
            return Err(CpError::shape("tape inputs", self.num_inputs, inputs.len()));
        }
        if out.len() != self.outputs.len() {
            return Err(CpError::shape("tape outputs", self.outputs.len(), out.len()));
        }
        self.eval_into(inputs, out);
        Ok(())
    }

    /// Evaluate without checking slice lengths.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` is shorter than [`Tape::num_inputs`] or `out` is
    /// shorter than [`Tape::num_outputs`].
    pub fn eval_into(&self, inputs: &[f64], out: &mut [f64]) {
        let mut regs: Vec<f64> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let v = match *op {
                Op::Const(c) => c,
                Op::Var(i) => inputs[i as usize],
                Op::Add(a, b) => regs[a as usize] + regs[b as usize],
                Op::Mul(a, b) => regs[a as usize] * regs[b as usize],
                Op::Neg(a) => -regs[a as usize],
                Op::Recip(a) => 1.0 / regs[a as usize],
                Op::Powi(a, n) => regs[a as usize].powi(n),
                Op::Sin(a) => regs[a as usize].sin(),
                Op::Cos(a) => regs[a as usize].cos(),
                Op::Tanh(a) => regs[a as usize].tanh(),
                Op::Atan2(y, x) => regs[y as usize].atan2(regs[x as usize]),
            };
            regs.push(v);
        }

        for (k, &reg) in self.outputs.iter().enumerate() {
            out[k] = regs[reg as usize];
        }
    }

    /// Evaluate into a freshly allocated vector.
    pub fn eval_vec(&self, inputs: &[f64]) -> CpResult<Vec<f64>> {
        let mut out = vec![0.0; self.outputs.len()];
        self.eval(inputs, &mut out)?;
        Ok(out)
    }
}
