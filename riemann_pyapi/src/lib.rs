//! Generate `PyO3` interface for `riemann`

use pyo3::prelude::*;

/// Python bindings for the Riemann integrator.
pub mod estimator;

/// `PyO3` Python module that contains all exposed classes from Rust.
#[pymodule]
fn riemann(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("version", env!("CARGO_PKG_VERSION"))?;
    estimator::register(m)?;
    Ok(())
}
