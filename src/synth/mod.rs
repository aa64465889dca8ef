// Purpose: per-voice note handling, oscillator management and voice stealing
// This layer sits above the DSP primitives; the host owns the voice pool

pub mod engine;
pub mod message;
pub mod oscillator_set;
pub mod voice;

pub use engine::{EngineState, SlotRole, VoiceEngine};
pub use message::{ConfigEvent, MessageReceiver};
pub use oscillator_set::OscillatorSet;
pub use voice::Voice;
