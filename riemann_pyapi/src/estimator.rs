//! Riemann estimator interface.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyList;

use riemann::grid::Grid;
use riemann::integrand::TryIntegrand;
use riemann::{IntegrationError, ParameterError, Riemann};

// A wrapper for Python callables to implement the TryIntegrand trait.
// An exception raised by the callable is handed back to Python as is.
struct PyCallable<'py> {
    callable: Bound<'py, PyAny>,
    dim: usize,
}

impl TryIntegrand for PyCallable<'_> {
    type Error = PyErr;

    fn dim(&self) -> usize {
        self.dim
    }

    fn try_eval(&self, x: &[f64]) -> PyResult<f64> {
        let point = PyList::new_bound(self.callable.py(), x);
        self.callable.call1((point,))?.extract::<f64>()
    }
}

fn callable<'py>(function: &Bound<'py, PyAny>, dim: usize) -> PyResult<PyCallable<'py>> {
    if !function.is_callable() {
        return Err(PyValueError::new_err("integrand must be callable"));
    }
    Ok(PyCallable {
        callable: function.clone(),
        dim,
    })
}

fn parameter_error(err: ParameterError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn integration_error(err: IntegrationError<PyErr>) -> PyErr {
    match err {
        IntegrationError::InvalidParameter(err) => parameter_error(err),
        IntegrationError::Integrand(err) => err,
    }
}

#[pyclass(name = "Riemann")]
struct PyRiemann {
    riemann: Riemann,
}

impl PyRiemann {
    // The grid without the strict-mode check, for the geometric properties.
    fn grid(&self) -> PyResult<Grid> {
        Grid::new(self.riemann.boundaries(), self.riemann.step_size()).map_err(parameter_error)
    }
}

#[pymethods]
impl PyRiemann {
    #[new]
    #[pyo3(signature = (boundaries, step_size, strict = false))]
    fn new(boundaries: Vec<(f64, f64)>, step_size: f64, strict: bool) -> PyResult<Self> {
        let mut riemann = Riemann::new(&boundaries, step_size).map_err(parameter_error)?;
        riemann.set_strict(strict);
        Ok(PyRiemann { riemann })
    }

    #[getter]
    fn dim(&self) -> usize {
        self.riemann.dim()
    }

    #[getter]
    fn step_size(&self) -> f64 {
        self.riemann.step_size()
    }

    #[getter]
    fn sign(&self) -> PyResult<i32> {
        Ok(self.grid()?.sign())
    }

    #[getter]
    fn cell_volume(&self) -> PyResult<f64> {
        Ok(self.grid()?.cell_volume())
    }

    /// Returns the evaluation points, in the order they are summed.
    fn points(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(self.grid()?.points())
    }

    fn integrate(&self, function: &Bound<'_, PyAny>) -> PyResult<f64> {
        let integrand = callable(function, self.riemann.dim())?;
        self.riemann
            .try_integrate(&integrand)
            .map_err(integration_error)
    }

    fn __repr__(&self) -> String {
        format!(
            "Riemann(dim={}, step_size={}, strict={})",
            self.riemann.dim(),
            self.riemann.step_size(),
            self.riemann.is_strict()
        )
    }
}

/// Estimates the integral of `function` over `region` with a Riemann sum.
///
/// Parameters
/// ----------
/// region : list[tuple[float, float]]
///     One `(start, end)` pair per dimension.
/// function : Callable[[list[float]], float]
///     The integrand.
/// step_size : float
///     The edge length of the hyperrectangles.
///
/// Raises
/// ------
/// ValueError
///     If `step_size` is not positive or `region` is empty.
#[pyfunction]
#[pyo3(signature = (region, function, step_size))]
fn estimate_integral(
    region: Vec<(f64, f64)>,
    function: &Bound<'_, PyAny>,
    step_size: f64,
) -> PyResult<f64> {
    let riemann = Riemann::new(&region, step_size).map_err(parameter_error)?;
    let integrand = callable(function, riemann.dim())?;
    riemann
        .try_integrate(&integrand)
        .map_err(integration_error)
}

/// Registers the `estimator` submodule with the parent Python module.
///
/// `estimate_integral` is also exposed directly on the parent module.
///
/// # Errors
///
/// Raises an error if the (sub)module cannot be created or registered.
pub fn register(parent_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let m = PyModule::new_bound(parent_module.py(), "estimator")?;
    m.setattr(
        pyo3::intern!(m.py(), "__doc__"),
        "Interface to the Riemann integrator",
    )?;
    pyo3::py_run!(
        parent_module.py(),
        m,
        "import sys; sys.modules['riemann.estimator'] = m"
    );
    m.add_class::<PyRiemann>()?;
    m.add_function(wrap_pyfunction!(estimate_integral, &m)?)?;
    parent_module.add_function(wrap_pyfunction!(estimate_integral, parent_module)?)?;
    parent_module.add_submodule(&m)
}
