//! Low-level DSP primitives used by the voice engine.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice structs. They stay focused
//! on the signal-processing math so the synth layer can handle note state and
//! configuration.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Wavetable playback oscillator.
pub mod oscillator;
/// Shared single-cycle sample tables and their resolver.
pub mod wavetable;

pub use envelope::{AdsrParams, Envelope, EnvelopeState};
pub use oscillator::Oscillator;
pub use wavetable::{Wavetable, WavetableBank, WavetableError, WavetableResolver};
