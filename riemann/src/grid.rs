//! The evaluation grid of the Riemann sum.
//!
//! A [`Grid`] is made of one [`Axis`] per dimension. Each axis holds the lower
//! corners of its sub-intervals, and the evaluation points are the cartesian
//! product of those offsets, enumerated in lexicographic order with the first
//! dimension as the most significant one.

use std::iter::FusedIterator;
use std::mem;

use crate::error::ParameterError;

/// A single dimension of the integration region.
#[derive(Debug, Clone)]
pub struct Axis {
    /// The lower bound, after swapping reversed bounds.
    start: f64,
    /// The upper bound, after swapping reversed bounds.
    end: f64,
    /// Whether the bounds were given with `start > end`.
    reversed: bool,
    /// The lower corners of the sub-intervals, `start + k * step`.
    offsets: Vec<f64>,
}

impl Axis {
    /// Creates the axis `(start, end)` for an already validated step.
    fn new(start: f64, end: f64, step: f64, n_steps: usize) -> Self {
        let (start, end, reversed) = if start > end {
            (end, start, true)
        } else {
            (start, end, false)
        };

        let offsets = (0..n_steps).map(|k| start + k as f64 * step).collect();

        Axis {
            start,
            end,
            reversed,
            offsets,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Returns the number of whole steps that fit in the axis.
    pub fn n_steps(&self) -> usize {
        self.offsets.len()
    }
}

/// The full evaluation grid over an N-dimensional region.
#[derive(Debug, Clone)]
pub struct Grid {
    /// One axis per dimension, in region order.
    axes: Vec<Axis>,
    /// The edge length of every hyperrectangle.
    step: f64,
    /// The number of evaluation points, the product of the axis lengths.
    n_points: usize,
}

impl Grid {
    /// Creates the grid for `boundaries` with hyperrectangles of edge `step`.
    ///
    /// # Errors
    ///
    /// Fails if `step` is not a positive finite number, if `boundaries` is
    /// empty, if a bound is not finite, or if the number of points would
    /// overflow `usize`.
    pub fn new(boundaries: &[(f64, f64)], step: f64) -> Result<Self, ParameterError> {
        let (steps, n_points) = check_parameters(boundaries, step)?;

        let axes = boundaries
            .iter()
            .zip(steps)
            .map(|(&(start, end), n_steps)| Axis::new(start, end, step, n_steps))
            .collect();

        Ok(Grid {
            axes,
            step,
            n_points,
        })
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Returns `+1`, or `-1` if an odd number of axes had reversed bounds.
    pub fn sign(&self) -> i32 {
        self.axes
            .iter()
            .filter(|axis| axis.reversed)
            .fold(1, |sign, _| -sign)
    }

    /// Returns the volume `step^N` of a single hyperrectangle.
    pub fn cell_volume(&self) -> f64 {
        match i32::try_from(self.axes.len()) {
            Ok(dim) => self.step.powi(dim),
            Err(_) => self.step.powf(self.axes.len() as f64),
        }
    }

    /// Returns the index of the first axis shorter than one step.
    pub fn first_empty_axis(&self) -> Option<usize> {
        self.axes.iter().position(|axis| axis.offsets.is_empty())
    }

    /// Materializes every evaluation point, in grid order.
    pub fn points(&self) -> Vec<Vec<f64>> {
        fold_points(self.axes.iter().map(Axis::offsets))
    }

    /// Iterates over the evaluation points, in grid order, one at a time.
    pub fn iter_points(&self) -> GridPoints<'_> {
        GridPoints::from_parts(self.axes.iter().map(Axis::offsets).collect(), self.n_points)
    }
}

/// Validates the parameters of a grid.
///
/// Returns the number of steps along each axis and the total number of points.
pub(crate) fn check_parameters(
    boundaries: &[(f64, f64)],
    step: f64,
) -> Result<(Vec<usize>, usize), ParameterError> {
    if !(step > 0.0 && step.is_finite()) {
        return Err(ParameterError::NonPositiveStep(step));
    }
    if boundaries.is_empty() {
        return Err(ParameterError::EmptyRegion);
    }

    let steps = boundaries
        .iter()
        .enumerate()
        .map(|(axis, &(start, end))| {
            if !(start.is_finite() && end.is_finite()) {
                return Err(ParameterError::NonFiniteBound { axis, start, end });
            }
            count_steps((end - start).abs(), step)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n_points = checked_count(steps.iter().copied())?;
    Ok((steps, n_points))
}

/// The largest number of offsets a single axis can allocate.
const MAX_AXIS_STEPS: usize = isize::MAX as usize / mem::size_of::<f64>();

/// Returns `floor(length / step)`.
fn count_steps(length: f64, step: f64) -> Result<usize, ParameterError> {
    let n_steps = (length / step).floor();
    // Also catches `length` overflowing to infinity.
    if !(n_steps < MAX_AXIS_STEPS as f64) {
        return Err(ParameterError::GridTooLarge);
    }
    Ok(n_steps as usize)
}

/// Returns the product of the axis lengths.
fn checked_count(mut lengths: impl Iterator<Item = usize> + Clone) -> Result<usize, ParameterError> {
    if lengths.clone().any(|len| len == 0) {
        return Ok(0);
    }
    lengths
        .try_fold(1usize, |count, len| count.checked_mul(len))
        .ok_or(ParameterError::GridTooLarge)
}

/// Builds every point that draws exactly one value from each offset sequence.
///
/// `points[i][j]` is taken from `offsets[j]`. Points are ordered
/// lexicographically, the first sequence varying slowest. Equal values at
/// different positions of a sequence are distinct choices and are not merged.
///
/// # Errors
///
/// Fails if `offsets` is empty, or if the number of points overflows `usize`.
///
/// # Examples
///
/// ```
/// use riemann::grid::build_points;
///
/// let points = build_points(&[vec![1.0, 2.0], vec![10.0, 20.0]]).unwrap();
/// assert_eq!(
///     points,
///     vec![
///         vec![1.0, 10.0],
///         vec![1.0, 20.0],
///         vec![2.0, 10.0],
///         vec![2.0, 20.0],
///     ]
/// );
/// ```
pub fn build_points<S: AsRef<[f64]>>(offsets: &[S]) -> Result<Vec<Vec<f64>>, ParameterError> {
    if offsets.is_empty() {
        return Err(ParameterError::EmptyRegion);
    }
    checked_count(offsets.iter().map(|axis| axis.as_ref().len()))?;
    Ok(fold_points(offsets.iter().map(|axis| axis.as_ref())))
}

fn fold_points<'a>(offsets: impl Iterator<Item = &'a [f64]>) -> Vec<Vec<f64>> {
    offsets.fold(vec![Vec::new()], |prefixes, values| {
        let mut points = Vec::with_capacity(prefixes.len() * values.len());
        for prefix in &prefixes {
            for &value in values {
                let mut point = Vec::with_capacity(prefix.len() + 1);
                point.extend_from_slice(prefix);
                point.push(value);
                points.push(point);
            }
        }
        points
    })
}

/// A lazy iterator over the points of [`build_points`], in the same order.
///
/// Only the current point is kept in memory.
#[derive(Debug, Clone)]
pub struct GridPoints<'a> {
    offsets: Vec<&'a [f64]>,
    /// Position of the current point along each axis.
    indices: Vec<usize>,
    /// The current point.
    point: Vec<f64>,
    /// Number of points not yet yielded, the current one included.
    remaining: usize,
}

impl<'a> GridPoints<'a> {
    /// Creates an iterator over the cartesian product of `offsets`.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`build_points`].
    pub fn new<S: AsRef<[f64]>>(offsets: &'a [S]) -> Result<Self, ParameterError> {
        if offsets.is_empty() {
            return Err(ParameterError::EmptyRegion);
        }
        let offsets: Vec<&[f64]> = offsets.iter().map(|axis| axis.as_ref()).collect();
        let n_points = checked_count(offsets.iter().map(|axis| axis.len()))?;
        Ok(Self::from_parts(offsets, n_points))
    }

    fn from_parts(offsets: Vec<&'a [f64]>, n_points: usize) -> Self {
        let point = if n_points > 0 {
            offsets.iter().map(|axis| axis[0]).collect()
        } else {
            Vec::new()
        };

        GridPoints {
            indices: vec![0; offsets.len()],
            offsets,
            point,
            remaining: n_points,
        }
    }

    /// Moves to the next point, the last axis varying fastest.
    fn advance(&mut self) {
        self.remaining -= 1;
        if self.remaining == 0 {
            return;
        }

        for axis in (0..self.offsets.len()).rev() {
            let values = self.offsets[axis];
            self.indices[axis] += 1;
            if self.indices[axis] < values.len() {
                self.point[axis] = values[self.indices[axis]];
                return;
            }
            self.indices[axis] = 0;
            self.point[axis] = values[0];
        }
    }

    /// Calls `visit` on every remaining point without allocating a vector per point.
    pub fn for_each_point<F>(mut self, mut visit: F)
    where
        F: FnMut(&[f64]),
    {
        while self.remaining > 0 {
            visit(&self.point);
            self.advance();
        }
    }

    /// Like [`GridPoints::for_each_point`], but stops at the first error.
    pub fn try_for_each_point<E, F>(mut self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[f64]) -> Result<(), E>,
    {
        while self.remaining > 0 {
            visit(&self.point)?;
            self.advance();
        }
        Ok(())
    }
}

impl Iterator for GridPoints<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let point = self.point.clone();
        self.advance();
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridPoints<'_> {}

impl FusedIterator for GridPoints<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_points_lexicographic() {
        let points = build_points(&[vec![1.0, 2.0], vec![10.0, 20.0]]).unwrap();
        assert_eq!(
            points,
            vec![
                vec![1.0, 10.0],
                vec![1.0, 20.0],
                vec![2.0, 10.0],
                vec![2.0, 20.0],
            ]
        );
    }

    #[test]
    fn test_build_points_count() {
        let offsets = [vec![0.0, 1.0], vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0, 3.0]];
        let points = build_points(&offsets).unwrap();
        assert_eq!(points.len(), 24);
        assert!(points.iter().all(|p| p.len() == 3));
        assert_eq!(points[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(points[1], vec![0.0, 0.0, 1.0]);
        assert_eq!(points[4], vec![0.0, 1.0, 0.0]);
        assert_eq!(points[23], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_build_points_single_dimension() {
        let points = build_points(&[[3.0, 1.0, 2.0]]).unwrap();
        assert_eq!(points, vec![vec![3.0], vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_build_points_all_singletons() {
        let points = build_points(&[[1.0], [2.0], [3.0]]).unwrap();
        assert_eq!(points, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_build_points_keeps_duplicates() {
        let points = build_points(&[vec![5.0, 5.0], vec![7.0]]).unwrap();
        assert_eq!(points, vec![vec![5.0, 7.0], vec![5.0, 7.0]]);
    }

    #[test]
    fn test_build_points_empty_axis() {
        let offsets: [Vec<f64>; 3] = [vec![1.0, 2.0], vec![], vec![3.0]];
        assert!(build_points(&offsets).unwrap().is_empty());
        assert_eq!(GridPoints::new(&offsets).unwrap().count(), 0);
    }

    #[test]
    fn test_build_points_no_dimensions() {
        let offsets: [Vec<f64>; 0] = [];
        assert_eq!(build_points(&offsets), Err(ParameterError::EmptyRegion));
        assert!(matches!(
            GridPoints::new(&offsets),
            Err(ParameterError::EmptyRegion)
        ));
    }

    #[test]
    fn test_lazy_matches_eager() {
        let offsets = [
            vec![-1.0, 0.5],
            vec![2.0],
            vec![0.0, 0.25, 0.5],
            vec![9.0, 8.0],
        ];
        let eager = build_points(&offsets).unwrap();
        let lazy = GridPoints::new(&offsets).unwrap();
        assert_eq!(lazy.len(), eager.len());
        assert_eq!(lazy.collect::<Vec<_>>(), eager);

        let mut visited = Vec::new();
        GridPoints::new(&offsets)
            .unwrap()
            .for_each_point(|x| visited.push(x.to_vec()));
        assert_eq!(visited, eager);
    }

    #[test]
    fn test_try_for_each_point_stops_at_error() {
        let offsets = [vec![0.0, 1.0], vec![0.0, 1.0]];
        let mut seen = 0;
        let result = GridPoints::new(&offsets).unwrap().try_for_each_point(|x| {
            seen += 1;
            if x == [1.0, 0.0] {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_axis_offsets_and_reversal() {
        let grid = Grid::new(&[(0.0, 2.0), (3.0, 1.0)], 0.5).unwrap();
        let axes = grid.axes();

        assert_eq!(axes[0].offsets(), &[0.0, 0.5, 1.0, 1.5]);
        assert!(!axes[0].is_reversed());

        assert_eq!(axes[1].start(), 1.0);
        assert_eq!(axes[1].end(), 3.0);
        assert!(axes[1].is_reversed());
        assert_eq!(axes[1].offsets(), &[1.0, 1.5, 2.0, 2.5]);

        assert_eq!(grid.n_points(), 16);
        assert_eq!(grid.cell_volume(), 0.25);
    }

    #[test]
    fn test_sign_counts_reversed_axes() {
        let forward = Grid::new(&[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)], 0.5).unwrap();
        assert_eq!(forward.sign(), 1);

        let one = Grid::new(&[(1.0, 0.0), (0.0, 1.0), (0.0, 1.0)], 0.5).unwrap();
        assert_eq!(one.sign(), -1);

        let two = Grid::new(&[(1.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 0.5).unwrap();
        assert_eq!(two.sign(), 1);

        let three = Grid::new(&[(1.0, 0.0), (1.0, 0.0), (1.0, 0.0)], 0.5).unwrap();
        assert_eq!(three.sign(), -1);
    }

    #[test]
    fn test_short_axis_is_empty() {
        let grid = Grid::new(&[(0.0, 1.0), (0.0, 0.4)], 0.5).unwrap();
        assert_eq!(grid.first_empty_axis(), Some(1));
        assert_eq!(grid.n_points(), 0);
        assert!(grid.points().is_empty());
        assert_eq!(grid.iter_points().count(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            Grid::new(&[(0.0, 1.0)], 0.0).unwrap_err(),
            ParameterError::NonPositiveStep(0.0)
        );
        assert_eq!(
            Grid::new(&[(0.0, 1.0)], -0.1).unwrap_err(),
            ParameterError::NonPositiveStep(-0.1)
        );
        assert!(matches!(
            Grid::new(&[(0.0, 1.0)], f64::NAN),
            Err(ParameterError::NonPositiveStep(_))
        ));
        assert_eq!(Grid::new(&[], 0.1).unwrap_err(), ParameterError::EmptyRegion);
        assert!(matches!(
            Grid::new(&[(0.0, 1.0), (0.0, f64::INFINITY)], 0.1),
            Err(ParameterError::NonFiniteBound { axis: 1, .. })
        ));
    }

    #[test]
    fn test_too_many_points() {
        assert_eq!(
            Grid::new(&[(0.0, 1.0e300)], 1.0e-300).unwrap_err(),
            ParameterError::GridTooLarge
        );

        let huge = 1.0e10;
        assert_eq!(
            Grid::new(&[(0.0, huge), (0.0, huge)], 1.0).unwrap_err(),
            ParameterError::GridTooLarge
        );
    }

    #[test]
    fn test_axis_too_long_to_allocate() {
        assert_eq!(
            Grid::new(&[(0.0, 4.0e18)], 1.0).unwrap_err(),
            ParameterError::GridTooLarge
        );
        assert_eq!(
            Grid::new(&[(4.0e18, 0.0), (0.0, 1.0)], 1.0).unwrap_err(),
            ParameterError::GridTooLarge
        );
        assert_eq!(
            count_steps(MAX_AXIS_STEPS as f64 * 2.0, 1.0),
            Err(ParameterError::GridTooLarge)
        );
        assert_eq!(count_steps(1.0e6, 1.0), Ok(1_000_000));
    }

    #[test]
    fn test_cell_volume_is_step_to_the_dimension() {
        let grid = Grid::new(&[(0.0, 1.0); 3], 0.5).unwrap();
        assert_eq!(grid.cell_volume(), 0.125);
    }

    #[test]
    fn test_grid_points_match_builder() {
        let grid = Grid::new(&[(0.0, 3.0), (1.0, -1.0)], 1.0).unwrap();
        let offsets: Vec<Vec<f64>> = grid.axes().iter().map(|a| a.offsets().to_vec()).collect();
        assert_eq!(grid.points(), build_points(&offsets).unwrap());
        assert_eq!(grid.iter_points().collect::<Vec<_>>(), grid.points());
    }
}
