//! Real-world scenario benchmarks.
//!
//! Complete voices rendered through the host-facing API.

mod voice;

pub use voice::bench_voice;
