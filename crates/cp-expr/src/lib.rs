//! Symbolic math for differentiable dynamics.
//!
//! This crate provides the pieces needed to write a transition function once
//! and differentiate it mechanically:
//! - [`Scalar`]: numeric abstraction the physics code is generic over
//! - [`Dual`]: forward-mode dual number
//! - [`Graph`]: hash-consed expression graph with constant folding and
//!   symbolic differentiation
//! - [`Sym`]: `Scalar` handle that records operations into a [`Graph`]
//! - [`Tape`]: compiled straight-line program over selected graph outputs
//!
//! # Tracing a function
//!
//! ```
//! use std::cell::RefCell;
//! use cp_expr::{Graph, Scalar, Sym, Tape};
//!
//! fn f<S: Scalar>(x: S, y: S) -> S {
//!     x * y + x.sin()
//! }
//!
//! let cell = RefCell::new(Graph::new());
//! let out = {
//!     let x = Sym::var(&cell, 0);
//!     let y = Sym::var(&cell, 1);
//!     f(x, y).id()
//! };
//! let mut graph = cell.into_inner();
//! let df_dx = graph.diff(out, 0);
//!
//! let tape = Tape::new(&graph, &[out, df_dx]);
//! let values = tape.eval_vec(&[0.0, 2.0]).unwrap();
//! assert_eq!(values, vec![0.0, 3.0]);
//! ```

pub mod dual;
pub mod graph;
pub mod scalar;
pub mod sym;
pub mod tape;

pub use dual::Dual;
pub use graph::{ExprId, Graph, Node};
pub use scalar::Scalar;
pub use sym::Sym;
pub use tape::Tape;
