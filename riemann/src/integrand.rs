//! The integrand traits, which define the function to be integrated.

use std::marker::PhantomData;

use wide::f64x4;

/// Number of evaluation points in a SIMD packet.
pub const LANES: usize = 4;

/// A trait representing a function to be integrated.
///
/// Users of the library must implement this trait for their function.
pub trait Integrand {
    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function at a given point `x`.
    ///
    /// # Arguments
    ///
    /// * `x`: A slice of `f64` representing the point in the integration space.
    ///
    /// # Returns
    ///
    /// The value of the function `f(x)`.
    fn eval(&self, x: &[f64]) -> f64;
}

/// A trait representing a function to be integrated that may fail.
///
/// The integrator stops at the first failure and hands the error back to the
/// caller as it was returned.
pub trait TryIntegrand {
    /// The error produced by a failed evaluation.
    type Error;

    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function at a given point `x`.
    fn try_eval(&self, x: &[f64]) -> Result<f64, Self::Error>;
}

/// A trait representing a function to be integrated using SIMD.
pub trait SimdIntegrand {
    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function on a packet of 4 points.
    ///
    /// `points[d]` holds coordinate `d` of the four points, one per lane.
    fn eval_simd(&self, points: &[f64x4]) -> f64x4;
}

/// Adapts a closure taking a point and returning its height into an [`Integrand`].
#[derive(Debug, Clone, Copy)]
pub struct FnIntegrand<F> {
    dim: usize,
    func: F,
}

impl<F> FnIntegrand<F>
where
    F: Fn(&[f64]) -> f64,
{
    pub fn new(dim: usize, func: F) -> Self {
        FnIntegrand { dim, func }
    }
}

impl<F> Integrand for FnIntegrand<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        (self.func)(x)
    }
}

/// Adapts a fallible closure into a [`TryIntegrand`].
pub struct TryFnIntegrand<F, E> {
    dim: usize,
    func: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> TryFnIntegrand<F, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    pub fn new(dim: usize, func: F) -> Self {
        TryFnIntegrand {
            dim,
            func,
            _error: PhantomData,
        }
    }
}

impl<F, E> TryIntegrand for TryFnIntegrand<F, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    type Error = E;

    fn dim(&self) -> usize {
        self.dim
    }

    fn try_eval(&self, x: &[f64]) -> Result<f64, E> {
        (self.func)(x)
    }
}
