//! The C-language interface for `riemann`

use std::ffi::c_void;
use std::os::raw::c_int;
use std::slice;

use riemann::integrand::Integrand;
use riemann::{ParameterError, Riemann};

/// The integration succeeded.
pub const RIEMANN_OK: c_int = 0;
/// A parameter was rejected before any evaluation.
pub const RIEMANN_INVALID_PARAMETER: c_int = 1;
/// A required pointer argument was null.
pub const RIEMANN_NULL_POINTER: c_int = 2;

/// A C-compatible struct for integration boundaries.
///
/// `start > end` integrates the axis in reverse.
#[repr(C)]
pub struct CBoundary {
    pub start: f64,
    pub end: f64,
}

/// The C-style integrand function pointer.
/// The first argument is the point `x` (an array of f64).
/// The second argument is the dimension.
/// The third is a user-provided `user_data` pointer.
pub type CIntegrand = extern "C" fn(*const f64, c_int, *mut c_void) -> f64;

/// A wrapper that implements the Rust `Integrand` trait.
struct CIntegrandWrapper {
    dim: usize,
    func: CIntegrand,
    user_data: *mut c_void,
}

impl Integrand for CIntegrandWrapper {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        (self.func)(x.as_ptr(), self.dim as c_int, self.user_data)
    }
}

/// The opaque pointer to the Riemann integrator.
pub type RiemannC = c_void;

fn boundaries_from_raw(dim: usize, boundaries: *const CBoundary) -> Option<Vec<(f64, f64)>> {
    if dim == 0 {
        return Some(Vec::new());
    }
    if boundaries.is_null() {
        return None;
    }
    // SAFETY: the caller guarantees `boundaries` points to `dim` elements.
    let boundaries_slice = unsafe { slice::from_raw_parts(boundaries, dim) };
    Some(boundaries_slice.iter().map(|b| (b.start, b.end)).collect())
}

fn status_of(result: Result<f64, ParameterError>, out: &mut f64) -> c_int {
    match result {
        Ok(value) => {
            *out = value;
            RIEMANN_OK
        }
        Err(_) => RIEMANN_INVALID_PARAMETER,
    }
}

/// Creates a new Riemann integrator.
///
/// Returns a null pointer if the parameters are invalid.
///
/// # Safety
///
/// `boundaries` must be a valid pointer to an array of `CBoundary`
/// of size `dim`.
#[no_mangle]
pub unsafe extern "C" fn riemann_new(
    dim: usize,
    boundaries: *const CBoundary,
    step_size: f64,
) -> *mut RiemannC {
    let Some(rust_boundaries) = boundaries_from_raw(dim, boundaries) else {
        return std::ptr::null_mut();
    };

    match Riemann::new(&rust_boundaries, step_size) {
        Ok(riemann) => Box::into_raw(Box::new(riemann)) as *mut RiemannC,
        Err(_) => std::ptr::null_mut(),
    }
}

/// Makes an axis shorter than one step an error instead of a zero estimate.
///
/// # Safety
///
/// `riemann_ptr` must be a valid pointer returned by `riemann_new`.
#[no_mangle]
pub unsafe extern "C" fn riemann_set_strict(riemann_ptr: *mut RiemannC, strict: c_int) {
    if let Some(riemann) = (riemann_ptr as *mut Riemann).as_mut() {
        riemann.set_strict(strict != 0);
    }
}

/// Integrates the given function and writes the estimate to `result`.
///
/// Returns `RIEMANN_OK`, `RIEMANN_INVALID_PARAMETER` or `RIEMANN_NULL_POINTER`.
/// `result` is left untouched on failure.
///
/// # Safety
/// `riemann_ptr` must be a valid pointer returned by `riemann_new`.
/// `integrand_func` must be a valid function pointer.
/// `result` must be a valid pointer to a `double`.
#[no_mangle]
pub unsafe extern "C" fn riemann_integrate(
    riemann_ptr: *const RiemannC,
    integrand_func: CIntegrand,
    user_data: *mut c_void,
    result: *mut f64,
) -> c_int {
    let (Some(riemann), Some(out)) = ((riemann_ptr as *const Riemann).as_ref(), result.as_mut())
    else {
        return RIEMANN_NULL_POINTER;
    };

    let integrand = CIntegrandWrapper {
        dim: riemann.dim(),
        func: integrand_func,
        user_data,
    };

    status_of(riemann.integrate(&integrand), out)
}

/// Estimates an integral in one call, without keeping an integrator around.
///
/// # Safety
///
/// `boundaries` must be a valid pointer to an array of `CBoundary` of size
/// `dim`, `integrand_func` a valid function pointer and `result` a valid
/// pointer to a `double`.
#[no_mangle]
pub unsafe extern "C" fn riemann_estimate_integral(
    dim: usize,
    boundaries: *const CBoundary,
    integrand_func: CIntegrand,
    user_data: *mut c_void,
    step_size: f64,
    result: *mut f64,
) -> c_int {
    let (Some(rust_boundaries), Some(out)) = (boundaries_from_raw(dim, boundaries), result.as_mut())
    else {
        return RIEMANN_NULL_POINTER;
    };

    let integrand = CIntegrandWrapper {
        dim,
        func: integrand_func,
        user_data,
    };

    let value = Riemann::new(&rust_boundaries, step_size).and_then(|riemann| riemann.integrate(&integrand));
    status_of(value, out)
}

/// Frees the memory of the Riemann integrator.
///
/// # Safety
///
/// `riemann_ptr` must be a valid pointer returned by `riemann_new`
/// and must not be used afterward.
#[no_mangle]
pub unsafe extern "C" fn riemann_free(riemann_ptr: *mut RiemannC) {
    if !riemann_ptr.is_null() {
        drop(Box::from_raw(riemann_ptr as *mut Riemann));
    }
}
