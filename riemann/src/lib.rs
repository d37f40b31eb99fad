//! `riemann` is a multi-dimensional Riemann-sum integration routine.
//!
//! The integration region is cut into a regular grid of hyperrectangles, the
//! integrand is sampled at the lower corner of each of them, and the samples
//! are weighted by the volume of a hyperrectangle. Bounds given in decreasing
//! order integrate that axis in reverse, which flips the sign of the result.

pub mod benchmark;
pub mod error;
pub mod grid;
pub mod integrand;
pub mod riemann;

pub use crate::error::{IntegrationError, ParameterError};
pub use crate::riemann::{estimate_integral, try_estimate_integral, Riemann};
