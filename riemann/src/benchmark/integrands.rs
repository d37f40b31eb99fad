//! Genz test functions over the unit hypercube.
use crate::integrand::{Integrand, SimdIntegrand};
use wide::f64x4;

use libm::erf;
use std::f64::consts::PI;

/// Returns the parameters for the Genz test functions.
///
/// `c` lies in `[0.5, 1.5)` so that no closed form divides by zero.
fn genz_params(dim: usize) -> (Vec<f64>, Vec<f64>) {
    (1..=dim)
        .map(|i| {
            let root = (i as f64 + 0.5).sqrt();
            (0.5 + (root * 12345.).fract(), (root * 54321.).fract())
        })
        .unzip()
}

/// The unit hypercube `[0, 1]^dim`.
pub fn unit_hypercube(dim: usize) -> Vec<(f64, f64)> {
    vec![(0.0, 1.0); dim]
}

/// Per-axis width `c` and shift `w` shared by every Genz family, with their
/// splatted SIMD copies.
#[derive(Clone)]
struct GenzParams {
    c: Vec<f64>,
    w: Vec<f64>,
    c_simd: Vec<f64x4>,
    w_simd: Vec<f64x4>,
}

impl GenzParams {
    fn new(dim: usize) -> Self {
        let (c, w) = genz_params(dim);
        let splat = |values: &[f64]| -> Vec<f64x4> {
            values.iter().copied().map(f64x4::splat).collect()
        };
        GenzParams {
            c_simd: splat(&c),
            w_simd: splat(&w),
            c,
            w,
        }
    }

    fn dim(&self) -> usize {
        self.c.len()
    }

    /// `(c_i, w_i)` pairs, one per axis.
    fn axes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.c.iter().copied().zip(self.w.iter().copied())
    }
}

/// `cos(sum_i c_i (x_i - w_i))`.
#[derive(Clone)]
pub struct GenzOscillatory(GenzParams);

impl GenzOscillatory {
    pub fn new(dim: usize) -> Self {
        GenzOscillatory(GenzParams::new(dim))
    }

    /// The real part of the product of the one-dimensional integrals of
    /// `exp(i c (x - w))`.
    pub fn analytical_result(&self) -> f64 {
        let (re, _) = self.0.axes().fold((1.0, 0.0), |(re, im), (c, w)| {
            let (a, b) = (c * (1. - w), c * w);
            let factor_re = (a.sin() + b.sin()) / c;
            let factor_im = (b.cos() - a.cos()) / c;
            (re * factor_re - im * factor_im, re * factor_im + im * factor_re)
        });
        re
    }
}

impl Integrand for GenzOscillatory {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let phase: f64 = self.0.axes().zip(x).map(|((c, w), &xi)| c * (xi - w)).sum();
        phase.cos()
    }
}

impl SimdIntegrand for GenzOscillatory {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let GenzParams { c_simd, w_simd, .. } = &self.0;
        let mut phase = f64x4::splat(0.);
        for ((&c, &w), &xi) in c_simd.iter().zip(w_simd).zip(x) {
            phase += c * (xi - w);
        }
        phase.cos()
    }
}

/// `prod_i 1 / (c_i^-2 + (x_i - w_i)^2)`.
#[derive(Clone)]
pub struct GenzProductPeak(GenzParams);

impl GenzProductPeak {
    pub fn new(dim: usize) -> Self {
        GenzProductPeak(GenzParams::new(dim))
    }

    pub fn analytical_result(&self) -> f64 {
        self.0
            .axes()
            .map(|(c, w)| c * ((c * (1. - w)).atan() + (c * w).atan()))
            .product()
    }
}

impl Integrand for GenzProductPeak {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval(&self, x: &[f64]) -> f64 {
        self.0
            .axes()
            .zip(x)
            .map(|((c, w), &xi)| 1.0 / (c.powi(-2) + (xi - w).powi(2)))
            .product()
    }
}

impl SimdIntegrand for GenzProductPeak {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let GenzParams { c_simd, w_simd, .. } = &self.0;
        let one = f64x4::splat(1.0);
        let mut peak = one;
        for ((&c, &w), &xi) in c_simd.iter().zip(w_simd).zip(x) {
            let dx = xi - w;
            peak *= one / (one / (c * c) + dx * dx);
        }
        peak
    }
}

/// `exp(-sum_i c_i^2 (x_i - w_i)^2)`.
#[derive(Clone)]
pub struct GenzGaussian(GenzParams);

impl GenzGaussian {
    pub fn new(dim: usize) -> Self {
        GenzGaussian(GenzParams::new(dim))
    }

    pub fn analytical_result(&self) -> f64 {
        self.0
            .axes()
            .map(|(c, w)| (PI.sqrt() / (2. * c)) * (erf(c * (1. - w)) + erf(c * w)))
            .product()
    }
}

impl Integrand for GenzGaussian {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let exponent: f64 = self
            .0
            .axes()
            .zip(x)
            .map(|((c, w), &xi)| c.powi(2) * (xi - w).powi(2))
            .sum();
        (-exponent).exp()
    }
}

impl SimdIntegrand for GenzGaussian {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let GenzParams { c_simd, w_simd, .. } = &self.0;
        let mut exponent = f64x4::splat(0.0);
        for ((&c, &w), &xi) in c_simd.iter().zip(w_simd).zip(x) {
            let scaled = c * (xi - w);
            exponent += scaled * scaled;
        }
        (-exponent).exp()
    }
}
