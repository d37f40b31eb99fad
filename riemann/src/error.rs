//! Errors reported by the grid builder and the Riemann integrator.

/// An invalid integration parameter.
///
/// These are detected before the integrand is evaluated even once.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// The step size is zero, negative, NaN or infinite.
    #[error("step size must be a positive finite number, got {0}")]
    NonPositiveStep(f64),

    /// The region has no dimensions.
    #[error("integration region must have at least one dimension")]
    EmptyRegion,

    /// A boundary of the region is NaN or infinite.
    #[error("bounds of axis {axis} must be finite, got ({start}, {end})")]
    NonFiniteBound {
        /// Index of the offending axis.
        axis: usize,
        start: f64,
        end: f64,
    },

    /// The integrand does not have the dimension of the region.
    #[error("integrand dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The number of evaluation points does not fit in `usize`.
    #[error("number of evaluation points overflows usize")]
    GridTooLarge,

    /// An axis is shorter than one step. Only reported in strict mode.
    #[error("axis {axis} is shorter than one step")]
    EmptyAxis { axis: usize },
}

/// Failure of an integration with a fallible integrand.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError<E> {
    /// The parameters were rejected before any evaluation.
    #[error(transparent)]
    InvalidParameter(#[from] ParameterError),

    /// The integrand failed. The error is the one it returned, untouched.
    #[error("integrand evaluation failed")]
    Integrand(#[source] E),
}

impl<E> IntegrationError<E> {
    /// Returns the integrand's own error, if that is what stopped the integration.
    pub fn into_integrand_error(self) -> Option<E> {
        match self {
            IntegrationError::Integrand(err) => Some(err),
            IntegrationError::InvalidParameter(_) => None,
        }
    }
}
