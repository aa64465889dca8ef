//! Benchmarks for low-level DSP primitives.

mod envelope;
mod oscillator;

pub use envelope::bench_envelope;
pub use oscillator::{bench_oscillator, bench_oscillator_set};
