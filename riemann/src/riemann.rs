//! The Riemann-sum integrator.

use std::convert::Infallible;

use tracing::{debug, warn};
use wide::f64x4;

use crate::error::{IntegrationError, ParameterError};
use crate::grid::{check_parameters, Grid};
use crate::integrand::{
    FnIntegrand, Integrand, SimdIntegrand, TryFnIntegrand, TryIntegrand, LANES,
};

/// The Riemann-sum integrator.
///
/// The region is cut into hyperrectangles of edge `step_size` and the
/// integrand is sampled at the lower corner of each of them. Nothing but the
/// parameters is kept between calls: the grid is rebuilt on every integration.
#[derive(Debug, Clone)]
pub struct Riemann {
    /// The number of dimensions.
    dim: usize,
    /// The edge length of the hyperrectangles.
    step_size: f64,
    /// The integration boundaries for each dimension, as (start, end) tuples.
    /// `start > end` integrates the axis in reverse and flips the sign.
    boundaries: Vec<(f64, f64)>,
    /// Whether an axis shorter than one step is an error.
    strict: bool,
}

impl Riemann {
    /// Creates a new Riemann integrator.
    ///
    /// # Arguments
    ///
    /// * `boundaries`: A slice of `(start, end)` tuples defining the integration domain for each dimension.
    /// * `step_size`: The edge length of the hyperrectangles, shared by all dimensions.
    ///
    /// # Errors
    ///
    /// Fails if `step_size` is not a positive finite number, if `boundaries`
    /// is empty or has a non-finite bound, or if the grid would have more
    /// points than `usize` can count.
    pub fn new(boundaries: &[(f64, f64)], step_size: f64) -> Result<Self, ParameterError> {
        check_parameters(boundaries, step_size)?;

        Ok(Riemann {
            dim: boundaries.len(),
            step_size,
            boundaries: boundaries.to_vec(),
            strict: false,
        })
    }

    /// Makes an axis shorter than one step an error.
    ///
    /// By default such an axis leaves the grid empty and the estimate is zero.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Returns the number of dimensions of the integrator.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn boundaries(&self) -> &[(f64, f64)] {
        &self.boundaries
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Builds the evaluation grid.
    pub fn grid(&self) -> Result<Grid, ParameterError> {
        let grid = Grid::new(&self.boundaries, self.step_size)?;

        if let Some(axis) = grid.first_empty_axis() {
            if self.strict {
                return Err(ParameterError::EmptyAxis { axis });
            }
            let (start, end) = self.boundaries[axis];
            warn!(
                axis,
                start,
                end,
                step_size = self.step_size,
                "axis is shorter than one step, the estimate is zero"
            );
        }

        Ok(grid)
    }

    /// Integrates the given function.
    ///
    /// # Examples
    ///
    /// ```
    /// use riemann::integrand::Integrand;
    /// use riemann::Riemann;
    ///
    /// struct Plane;
    ///
    /// impl Integrand for Plane {
    ///     fn dim(&self) -> usize {
    ///         2
    ///     }
    ///
    ///     fn eval(&self, x: &[f64]) -> f64 {
    ///         x[0] + x[1]
    ///     }
    /// }
    ///
    /// let riemann = Riemann::new(&[(0.0, 2.0), (0.0, 2.0)], 1.0).unwrap();
    /// assert_eq!(riemann.integrate(&Plane).unwrap(), 4.0);
    /// ```
    pub fn integrate<F: Integrand + ?Sized>(&self, integrand: &F) -> Result<f64, ParameterError> {
        self.check_dim(integrand.dim())?;

        match self.accumulate(|x| Ok::<f64, Infallible>(integrand.eval(x))) {
            Ok(value) => Ok(value),
            Err(IntegrationError::InvalidParameter(err)) => Err(err),
            Err(IntegrationError::Integrand(never)) => match never {},
        }
    }

    /// Integrates a function that may fail.
    ///
    /// The first failure stops the integration and is returned unchanged in
    /// [`IntegrationError::Integrand`].
    pub fn try_integrate<F: TryIntegrand + ?Sized>(
        &self,
        integrand: &F,
    ) -> Result<f64, IntegrationError<F::Error>> {
        self.check_dim(integrand.dim())?;
        self.accumulate(|x| integrand.try_eval(x))
    }

    /// Integrates the given function four points at a time.
    ///
    /// The heights are summed one lane at a time in grid order, so the result
    /// is the one [`Riemann::integrate`] gives for an integrand whose scalar
    /// and SIMD evaluations agree.
    pub fn integrate_simd<F: SimdIntegrand + ?Sized>(
        &self,
        integrand: &F,
    ) -> Result<f64, ParameterError> {
        self.check_dim(integrand.dim())?;

        let grid = self.grid()?;
        let volume = grid.cell_volume();
        let sign = grid.sign();
        debug!(
            dim = self.dim,
            n_points = grid.n_points(),
            sign,
            volume,
            "starting SIMD Riemann sum"
        );

        let mut lanes = vec![[0.0; LANES]; self.dim];
        let mut packet = vec![f64x4::splat(0.0); self.dim];
        let mut filled = 0;
        let mut total = 0.0;

        grid.iter_points().for_each_point(|x| {
            for (axis, &value) in lanes.iter_mut().zip(x) {
                axis[filled] = value;
            }
            filled += 1;
            if filled == LANES {
                eval_packet(integrand, &mut lanes, &mut packet, filled, volume, &mut total);
                filled = 0;
            }
        });
        if filled > 0 {
            eval_packet(integrand, &mut lanes, &mut packet, filled, volume, &mut total);
        }

        Ok(total * f64::from(sign))
    }

    /// Sums `height * volume` over the grid and applies the sign of the region.
    fn accumulate<E, G>(&self, mut eval: G) -> Result<f64, IntegrationError<E>>
    where
        G: FnMut(&[f64]) -> Result<f64, E>,
    {
        let grid = self.grid()?;
        let volume = grid.cell_volume();
        let sign = grid.sign();
        debug!(
            dim = self.dim,
            n_points = grid.n_points(),
            sign,
            volume,
            "starting Riemann sum"
        );

        let mut total = 0.0;
        grid.iter_points()
            .try_for_each_point(|x| {
                total += eval(x)? * volume;
                Ok::<(), E>(())
            })
            .map_err(IntegrationError::Integrand)?;

        Ok(total * f64::from(sign))
    }

    fn check_dim(&self, got: usize) -> Result<(), ParameterError> {
        if got != self.dim {
            return Err(ParameterError::DimensionMismatch {
                expected: self.dim,
                got,
            });
        }
        Ok(())
    }
}

/// Evaluates the first `filled` points stored in `lanes` and adds their
/// weighted heights to `total`, lane by lane. Unused lanes repeat the last
/// point and are discarded.
fn eval_packet<F: SimdIntegrand + ?Sized>(
    integrand: &F,
    lanes: &mut [[f64; LANES]],
    packet: &mut [f64x4],
    filled: usize,
    volume: f64,
    total: &mut f64,
) {
    for (axis, slot) in lanes.iter_mut().zip(packet.iter_mut()) {
        let last = axis[filled - 1];
        axis[filled..].fill(last);
        *slot = f64x4::from(*axis);
    }

    let heights = integrand.eval_simd(packet).to_array();
    for &height in &heights[..filled] {
        *total += height * volume;
    }
}

/// Estimates the integral of `function` over `region` with a Riemann sum.
///
/// `region` holds one `(start, end)` pair per dimension and `function` is
/// called with points of that dimension.
///
/// # Errors
///
/// Fails with a [`ParameterError`] before any evaluation if `step_size` is not
/// a positive finite number or `region` is empty.
///
/// # Examples
///
/// ```
/// let value = riemann::estimate_integral(&[(0.0, 2.0), (0.0, 2.0)], |x| x[0] + x[1], 1.0);
/// assert_eq!(value, Ok(4.0));
/// ```
pub fn estimate_integral<F>(
    region: &[(f64, f64)],
    function: F,
    step_size: f64,
) -> Result<f64, ParameterError>
where
    F: Fn(&[f64]) -> f64,
{
    let riemann = Riemann::new(region, step_size)?;
    riemann.integrate(&FnIntegrand::new(riemann.dim(), function))
}

/// Like [`estimate_integral`], for a function that may fail.
pub fn try_estimate_integral<F, E>(
    region: &[(f64, f64)],
    function: F,
    step_size: f64,
) -> Result<f64, IntegrationError<E>>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    let riemann = Riemann::new(region, step_size)?;
    riemann.try_integrate(&TryFnIntegrand::new(riemann.dim(), function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Constant(usize);

    impl Integrand for Constant {
        fn dim(&self) -> usize {
            self.0
        }

        fn eval(&self, _x: &[f64]) -> f64 {
            1.0
        }
    }

    // f(x) = x0 + 2 x1, exact in both scalar and SIMD arithmetic.
    struct Linear;

    impl Integrand for Linear {
        fn dim(&self) -> usize {
            2
        }

        fn eval(&self, x: &[f64]) -> f64 {
            x[0] + 2.0 * x[1]
        }
    }

    impl SimdIntegrand for Linear {
        fn dim(&self) -> usize {
            2
        }

        fn eval_simd(&self, points: &[f64x4]) -> f64x4 {
            points[0] + f64x4::splat(2.0) * points[1]
        }
    }

    #[derive(Debug, PartialEq)]
    struct OutOfDomain(f64);

    struct CountingSqrt {
        calls: Cell<usize>,
    }

    impl TryIntegrand for CountingSqrt {
        type Error = OutOfDomain;

        fn dim(&self) -> usize {
            1
        }

        fn try_eval(&self, x: &[f64]) -> Result<f64, OutOfDomain> {
            self.calls.set(self.calls.get() + 1);
            if x[0] < 0.0 {
                Err(OutOfDomain(x[0]))
            } else {
                Ok(x[0].sqrt())
            }
        }
    }

    #[test]
    fn test_integrate_constant() {
        let riemann = Riemann::new(&[(0.0, 1.0)], 0.1).unwrap();
        let value = riemann.integrate(&Constant(1)).unwrap();
        assert!((value - 1.0).abs() < 1e-12, "value: {}", value);
    }

    #[test]
    fn test_reversed_axis_negates() {
        let forward = Riemann::new(&[(0.0, 1.0)], 0.1).unwrap();
        let reversed = Riemann::new(&[(1.0, 0.0)], 0.1).unwrap();
        let f = forward.integrate(&Constant(1)).unwrap();
        let r = reversed.integrate(&Constant(1)).unwrap();
        assert_eq!(r, -f);
    }

    #[test]
    fn test_two_reversed_axes_cancel() {
        let forward = Riemann::new(&[(0.0, 2.0), (0.0, 2.0)], 1.0).unwrap();
        let reversed = Riemann::new(&[(2.0, 0.0), (2.0, 0.0)], 1.0).unwrap();
        assert_eq!(
            forward.integrate(&Linear).unwrap(),
            reversed.integrate(&Linear).unwrap()
        );
    }

    #[test]
    fn test_integrate_plane() {
        let value = estimate_integral(&[(0.0, 2.0), (0.0, 2.0)], |x| x[0] + x[1], 1.0).unwrap();
        assert_eq!(value, 4.0);
    }

    #[test]
    fn test_points_visited_in_grid_order() {
        let visited = std::cell::RefCell::new(Vec::new());
        estimate_integral(
            &[(0.0, 2.0), (0.0, 2.0)],
            |x| {
                visited.borrow_mut().push(x.to_vec());
                0.0
            },
            1.0,
        )
        .unwrap();
        assert_eq!(
            visited.into_inner(),
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_invalid_step() {
        for step in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Riemann::new(&[(0.0, 1.0)], step),
                Err(ParameterError::NonPositiveStep(_))
            ));
            assert!(matches!(
                estimate_integral(&[(0.0, 1.0), (1.0, 0.0)], |_| 1.0, step),
                Err(ParameterError::NonPositiveStep(_))
            ));
        }
    }

    #[test]
    fn test_empty_region() {
        assert_eq!(
            Riemann::new(&[], 0.1).unwrap_err(),
            ParameterError::EmptyRegion
        );
    }

    #[test]
    fn test_axis_too_long_is_rejected() {
        assert_eq!(
            Riemann::new(&[(0.0, 4.0e18)], 1.0).unwrap_err(),
            ParameterError::GridTooLarge
        );
        assert_eq!(
            estimate_integral(&[(0.0, 4.0e18)], |_| 1.0, 1.0).unwrap_err(),
            ParameterError::GridTooLarge
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let riemann = Riemann::new(&[(0.0, 1.0), (0.0, 1.0)], 0.5).unwrap();
        assert_eq!(
            riemann.integrate(&Constant(3)).unwrap_err(),
            ParameterError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_short_axis_gives_zero() {
        let mut riemann = Riemann::new(&[(0.0, 1.0), (0.0, 0.25)], 0.5).unwrap();
        assert_eq!(riemann.integrate(&Constant(2)).unwrap(), 0.0);

        riemann.set_strict(true);
        assert_eq!(
            riemann.integrate(&Constant(2)).unwrap_err(),
            ParameterError::EmptyAxis { axis: 1 }
        );
    }

    #[test]
    fn test_integrand_error_propagates() {
        let riemann = Riemann::new(&[(-1.0, 1.0)], 0.5).unwrap();
        let integrand = CountingSqrt {
            calls: Cell::new(0),
        };
        let err = riemann.try_integrate(&integrand).unwrap_err();
        assert_eq!(err.into_integrand_error(), Some(OutOfDomain(-1.0)));
        assert_eq!(integrand.calls.get(), 1);
    }

    #[test]
    fn test_try_integrate_success() {
        let riemann = Riemann::new(&[(0.0, 4.0)], 1.0).unwrap();
        let integrand = CountingSqrt {
            calls: Cell::new(0),
        };
        let value = riemann.try_integrate(&integrand).unwrap();
        assert_eq!(value, 0.0 + 1.0 + 2.0f64.sqrt() + 3.0f64.sqrt());
        assert_eq!(integrand.calls.get(), 4);
    }

    #[test]
    fn test_simd_matches_scalar() {
        // 3 x 5 points, the last packet is partial.
        let riemann = Riemann::new(&[(0.0, 1.5), (2.0, -0.5)], 0.5).unwrap();
        let scalar = riemann.integrate(&Linear).unwrap();
        let simd = riemann.integrate_simd(&Linear).unwrap();
        assert_eq!(scalar.to_bits(), simd.to_bits());
    }

    #[test]
    fn test_idempotent() {
        let riemann = Riemann::new(&[(0.0, 1.0), (-1.0, 0.3)], 0.05).unwrap();
        let f = |x: &[f64]| (x[0] * x[1]).sin() + x[0].exp();
        let integrand = FnIntegrand::new(2, f);
        let first = riemann.integrate(&integrand).unwrap();
        let second = riemann.integrate(&integrand).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }
}
