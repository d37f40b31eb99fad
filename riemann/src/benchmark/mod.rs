//! Test functions with known integrals, used by the benchmarks and tests.

pub mod integrands;
