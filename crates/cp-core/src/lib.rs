//! cp-core: shared foundation for the cart-pole dynamics workspace.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CpError, CpResult};
pub use numeric::*;
pub use units::*;
