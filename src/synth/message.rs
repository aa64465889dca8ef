#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::patch::{
    DetuneField, EnvelopeField, EnvelopeTarget, OscillatorConfig, VoiceStealMode, WaveType,
};

/// A single configuration edit, published by the
/// [`PatchStore`](crate::patch::PatchStore) and applied by each voice on its
/// own render thread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConfigEvent {
    OscillatorAdded {
        index: usize,
        config: OscillatorConfig,
    },
    OscillatorRemoved {
        index: usize,
    },
    OscillatorEnabledChanged {
        index: usize,
        enabled: bool,
    },
    WaveTypeChanged {
        index: usize,
        wave_type: WaveType,
    },
    DetuneChanged {
        index: usize,
        field: DetuneField,
        value: i32,
    },
    EnvelopeParamChanged {
        target: EnvelopeTarget,
        field: EnvelopeField,
        value: f32,
    },
    VoiceStealModeChanged(VoiceStealMode),
    GlideTimeChanged(f32),
    EngineEnabledChanged(bool),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ConfigEvent>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ConfigEvent> {
    fn pop(&mut self) -> Option<ConfigEvent> {
        Consumer::pop(self).ok()
    }
}
