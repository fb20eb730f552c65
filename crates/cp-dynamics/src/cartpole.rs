//! Cart-pole dynamics.
//!
//! Frictionless pole on a cart driven by a horizontal force, after
//! R. V. Florian, "Correct equations for the dynamics of the cart-pole
//! system" (2007), eqs. 23 and 24, integrated with one explicit Euler step.
//!
//! The model works on the augmented state
//! `[x, x', sin(theta), cos(theta), theta']` with a single control `[F]`.
//! Parameters are not validated: masses and pole length must be positive,
//! otherwise the angular acceleration denominator can vanish.

use cp_core::units::constants::G0_MPS2;
use cp_core::{Accel, Force, Length, Mass, Time};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Dynamics, StepHessians, StepJacobians, TransitionFn};
use crate::squash::constrain_each;
use crate::state::{self, AugmentedState, CONTROL_SIZE, Control, ReducedState, STATE_SIZE};
use crate::symbolic::{SymbolicDynamics, SymbolicTransition};
use cp_expr::Scalar;

/// Physical constants and discretization of the cart-pole.
///
/// SI units throughout. Only `dt` is required when deserializing; every
/// other field falls back to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartpoleConfig {
    /// Time step (s).
    pub dt: f64,
    /// Squash the control into `(min_bounds, max_bounds)` before use.
    #[serde(default = "default_constrain")]
    pub constrain: bool,
    #[serde(default = "default_min_bounds")]
    pub min_bounds: f64,
    #[serde(default = "default_max_bounds")]
    pub max_bounds: f64,
    /// Cart mass (kg).
    #[serde(default = "default_mc")]
    pub mc: f64,
    /// Pole mass (kg).
    #[serde(default = "default_mp")]
    pub mp: f64,
    /// Pole length (m).
    #[serde(default = "default_l")]
    pub l: f64,
    /// Gravitational acceleration (m/s^2).
    #[serde(default = "default_g")]
    pub g: f64,
}

fn default_constrain() -> bool {
    true
}

fn default_min_bounds() -> f64 {
    -1.0
}

fn default_max_bounds() -> f64 {
    1.0
}

fn default_mc() -> f64 {
    1.0
}

fn default_mp() -> f64 {
    0.1
}

fn default_l() -> f64 {
    1.0
}

fn default_g() -> f64 {
    G0_MPS2
}

impl CartpoleConfig {
    /// Default parameters with time step `dt` seconds.
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            constrain: default_constrain(),
            min_bounds: default_min_bounds(),
            max_bounds: default_max_bounds(),
            mc: default_mc(),
            mp: default_mp(),
            l: default_l(),
            g: default_g(),
        }
    }

    /// Build from dimensioned quantities; control bounds keep their defaults.
    pub fn from_quantities(dt: Time, mc: Mass, mp: Mass, l: Length, g: Accel) -> Self {
        Self {
            mc: mc.value,
            mp: mp.value,
            l: l.value,
            g: g.value,
            ..Self::new(dt.value)
        }
    }

    pub fn with_bounds(mut self, min_bounds: f64, max_bounds: f64) -> Self {
        self.min_bounds = min_bounds;
        self.max_bounds = max_bounds;
        self
    }

    pub fn with_force_bounds(self, min: Force, max: Force) -> Self {
        self.with_bounds(min.value, max.value)
    }

    /// Use the raw control as the force.
    pub fn unconstrained(mut self) -> Self {
        self.constrain = false;
        self
    }

    fn total_mass(&self) -> f64 {
        self.mc + self.mp
    }
}

/// The cart-pole transition, generic over the scalar it is evaluated on.
#[derive(Clone, Debug, PartialEq)]
pub struct Cartpole {
    config: CartpoleConfig,
}

impl Cartpole {
    pub fn new(config: CartpoleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CartpoleConfig {
        &self.config
    }

    /// Force actually applied to the cart for a raw control.
    pub fn effective_force<S: Scalar>(&self, u: &[S; CONTROL_SIZE]) -> S {
        let c = &self.config;
        let [force] = if c.constrain {
            constrain_each(*u, &[c.min_bounds], &[c.max_bounds])
        } else {
            *u
        };
        force
    }
}

impl TransitionFn<STATE_SIZE, CONTROL_SIZE> for Cartpole {
    fn transition<S: Scalar>(
        &self,
        x: &[S; STATE_SIZE],
        u: &[S; CONTROL_SIZE],
    ) -> [S; STATE_SIZE] {
        let c = &self.config;
        let [pos, vel, sin_theta, cos_theta, omega] = *x;
        let force = self.effective_force(u);
        let total = c.total_mass();

        let temp = (force + omega.powi(2) * sin_theta * (c.mp * c.l)) / total;

        // Florian eq. 23
        let denom = (cos_theta.powi(2) * (-c.mp / total) + 4.0 / 3.0) * c.l;
        let theta_acc = (sin_theta * c.g - cos_theta * temp) / denom;

        // Florian eq. 24
        let x_acc = temp - theta_acc * cos_theta * (c.mp * c.l / total);

        let theta = sin_theta.atan2(cos_theta);
        let next_theta = theta + omega * c.dt;

        [
            pos + vel * c.dt,
            vel + x_acc * c.dt,
            next_theta.sin(),
            next_theta.cos(),
            omega + theta_acc * c.dt,
        ]
    }
}

/// Trace the cart-pole transition into an expression graph.
///
/// Inputs are the five augmented state variables followed by the control.
pub fn build(config: &CartpoleConfig) -> SymbolicTransition<STATE_SIZE, CONTROL_SIZE> {
    let traced = SymbolicTransition::trace(&Cartpole::new(config.clone()));
    debug!(
        dt = config.dt,
        constrain = config.constrain,
        mc = config.mc,
        mp = config.mp,
        l = config.l,
        nodes = traced.graph().len(),
        "traced cart-pole transition"
    );
    traced
}

/// Cart-pole model with compiled symbolic derivatives.
#[derive(Clone, Debug)]
pub struct CartpoleDynamics {
    config: CartpoleConfig,
    inner: SymbolicDynamics<STATE_SIZE, CONTROL_SIZE>,
}

impl CartpoleDynamics {
    /// Jacobians only.
    pub fn new(config: CartpoleConfig) -> Self {
        Self::build_with(config, false)
    }

    /// Jacobians and Hessians.
    pub fn with_hessians(config: CartpoleConfig) -> Self {
        Self::build_with(config, true)
    }

    fn build_with(config: CartpoleConfig, hessians: bool) -> Self {
        let inner = SymbolicDynamics::new(build(&config), hessians);
        Self { config, inner }
    }

    pub fn config(&self) -> &CartpoleConfig {
        &self.config
    }

    pub fn constrained(&self) -> bool {
        self.config.constrain
    }

    pub fn min_bounds(&self) -> f64 {
        self.config.min_bounds
    }

    pub fn max_bounds(&self) -> f64 {
        self.config.max_bounds
    }

    /// See [`state::augment_state`].
    pub fn augment_state(reduced: &ReducedState) -> AugmentedState {
        state::augment_state(reduced)
    }

    /// See [`state::reduce_state`].
    pub fn reduce_state(augmented: &AugmentedState) -> ReducedState {
        state::reduce_state(augmented)
    }
}

impl Dynamics<STATE_SIZE, CONTROL_SIZE> for CartpoleDynamics {
    fn step(&self, x: &AugmentedState, u: &Control) -> AugmentedState {
        self.inner.step(x, u)
    }

    fn jacobians(
        &self,
        x: &AugmentedState,
        u: &Control,
    ) -> StepJacobians<STATE_SIZE, CONTROL_SIZE> {
        self.inner.jacobians(x, u)
    }

    fn has_hessians(&self) -> bool {
        self.inner.has_hessians()
    }

    fn hessians(
        &self,
        x: &AugmentedState,
        u: &Control,
    ) -> Option<StepHessians<STATE_SIZE, CONTROL_SIZE>> {
        self.inner.hessians(x, u)
    }
}
