pub mod dsp; // Wavetables, oscillators, envelopes
pub mod io; // Host audio buffers
pub mod patch; // Configuration snapshot and parameter store
pub mod synth; // Voice engine and host-facing voice

/// Upper bound on oscillators per voice. Oscillator sets reserve this much
/// up front so structural edits never reallocate on the render thread.
pub const MAX_OSCILLATORS: usize = 16;

/// Release time (seconds) used for the dying note during a crossfade steal.
pub const FAST_RELEASE_TIME: f32 = 0.01;

/// Capacity of each voice's configuration event queue.
pub const EVENT_QUEUE_SIZE: usize = 256;
