//! Differentiable cart-pole dynamics for trajectory optimizers.
//!
//! This crate provides:
//! - [`Dynamics`]: the interface an iLQR-style optimizer consumes (next
//!   state, Jacobians, optional Hessians)
//! - three ways to differentiate any [`TransitionFn`]: compiled symbolic
//!   derivatives ([`SymbolicDynamics`]), forward-mode dual numbers
//!   ([`DualDynamics`]) and central finite differences
//!   ([`FiniteDiffDynamics`])
//! - the cart-pole model itself ([`Cartpole`], [`CartpoleDynamics`],
//!   [`build`]) with smooth control squashing ([`squash`])
//! - conversion between the reduced `[x, x', theta, theta']` and augmented
//!   `[x, x', sin(theta), cos(theta), theta']` state representations
//!   ([`state`])
//!
//! # Example
//!
//! ```
//! use cp_dynamics::{CartpoleConfig, CartpoleDynamics, Control, Dynamics, ReducedState};
//! use cp_dynamics::state::{augment_state, reduce_state};
//!
//! let model = CartpoleDynamics::new(CartpoleConfig::new(0.01));
//! let x0 = augment_state(&ReducedState::new(0.0, 0.0, 0.1, 0.0));
//! let x1 = model.step(&x0, &Control::new(0.5));
//! let jac = model.jacobians(&x0, &Control::new(0.5));
//!
//! // gravity wins over the push and the pole keeps falling
//! assert!(x1[4] > 0.0);
//! assert!((reduce_state(&x1)[2] - 0.1).abs() < 1e-12);
//! assert_eq!(jac.f_x.nrows(), 5);
//! ```

pub mod cartpole;
pub mod finite_diff;
pub mod forward;
pub mod model;
pub mod squash;
pub mod state;
pub mod symbolic;

pub use cartpole::{Cartpole, CartpoleConfig, CartpoleDynamics, build};
pub use cp_core::{CpError, CpResult};
pub use finite_diff::{FiniteDiffDynamics, FiniteDiffScheme};
pub use forward::DualDynamics;
pub use model::{Dynamics, StepHessians, StepJacobians, TransitionFn};
pub use state::{
    AugmentedBatch, AugmentedState, Control, ReducedBatch, ReducedState, augment_batch,
    augment_state, reduce_batch, reduce_state,
};
pub use symbolic::{SymbolicDynamics, SymbolicTransition};
