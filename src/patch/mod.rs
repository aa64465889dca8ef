//! Configuration snapshot for a voice engine.
//!
//! The control side owns an [`EngineConfig`] inside a [`PatchStore`] and
//! publishes every edit as a typed [`ConfigEvent`](crate::synth::ConfigEvent).
//! Voices are built from a snapshot and then kept in sync purely by those
//! events, so nothing on the render thread holds a reference into shared
//! mutable state.

use std::fmt;
use std::str::FromStr;

use crate::dsp::AdsrParams;

mod store;

pub use store::{PatchError, PatchStore};

/// Which single-cycle table an oscillator plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveType {
    Sine,
    Saw,
    Ramp,
    Triangle,
    Square,
}

impl WaveType {
    pub const COUNT: usize = 5;

    pub const ALL: [WaveType; Self::COUNT] = [
        WaveType::Sine,
        WaveType::Saw,
        WaveType::Ramp,
        WaveType::Triangle,
        WaveType::Square,
    ];

    /// Dense index, usable for per-wave-type lookup tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WaveType::Sine => "SINE",
            WaveType::Saw => "SAW",
            WaveType::Ramp => "RAMP",
            WaveType::Triangle => "TRIANGLE",
            WaveType::Square => "SQUARE",
        }
    }
}

impl fmt::Display for WaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaveType {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveType::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseConfigError::new("wave type", s))
    }
}

/// How a voice reacts when it is stolen for a new note.
///
/// - `Normal`: the old note is crossfaded out under the new one.
/// - `Portamento`: the playing oscillators are retuned in place.
/// - `Legato`: the playing oscillators glide to the new pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceStealMode {
    Normal,
    #[default]
    Portamento,
    Legato,
}

impl VoiceStealMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceStealMode::Normal => "NORMAL",
            VoiceStealMode::Portamento => "PORTAMENTO",
            VoiceStealMode::Legato => "LEGATO",
        }
    }
}

impl fmt::Display for VoiceStealMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceStealMode {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            VoiceStealMode::Normal,
            VoiceStealMode::Portamento,
            VoiceStealMode::Legato,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ParseConfigError::new("voice steal mode", s))
    }
}

/// A tag string that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfigError {
    kind: &'static str,
    input: String,
}

impl ParseConfigError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_owned(),
        }
    }
}

impl fmt::Display for ParseConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseConfigError {}

/// Pitch offsets applied on top of the played note.
///
/// `octave` moves 12 semitones per step, `coarse` one semitone per step and
/// `fine` one cent (1/100 semitone) per step. Each field is limited to
/// `±DetuneField::limit()`; the store rejects edits outside that range and
/// [`semitones`](Self::semitones) clamps directly built values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Detune {
    pub octave: i32,
    pub coarse: i32,
    pub fine: i32,
}

impl Detune {
    /// Total offset in (fractional) semitones, each field clamped to its limit.
    pub fn semitones(&self) -> f32 {
        let clamp = |field: DetuneField, value: i32| {
            let limit = field.limit();
            value.clamp(-limit, limit) as f32
        };
        clamp(DetuneField::Octave, self.octave) * 12.0
            + clamp(DetuneField::Coarse, self.coarse)
            + clamp(DetuneField::Fine, self.fine) / 100.0
    }

    pub fn get(&self, field: DetuneField) -> i32 {
        match field {
            DetuneField::Octave => self.octave,
            DetuneField::Coarse => self.coarse,
            DetuneField::Fine => self.fine,
        }
    }

    pub fn set(&mut self, field: DetuneField, value: i32) {
        match field {
            DetuneField::Octave => self.octave = value,
            DetuneField::Coarse => self.coarse = value,
            DetuneField::Fine => self.fine = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetuneField {
    Octave,
    Coarse,
    Fine,
}

impl DetuneField {
    pub const ALL: [DetuneField; 3] = [DetuneField::Octave, DetuneField::Coarse, DetuneField::Fine];

    /// Largest accepted magnitude for this field.
    pub fn limit(self) -> i32 {
        match self {
            DetuneField::Octave => 4,
            DetuneField::Coarse => 12,
            DetuneField::Fine => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetuneField::Octave => "octave detune",
            DetuneField::Coarse => "coarse detune",
            DetuneField::Fine => "fine detune",
        }
    }

    pub fn accepts(self, value: i32) -> bool {
        let limit = self.limit();
        (-limit..=limit).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillatorConfig {
    pub enabled: bool,
    pub wave_type: WaveType,
    pub detune: Detune,
}

impl OscillatorConfig {
    pub fn new(wave_type: WaveType) -> Self {
        Self {
            enabled: true,
            wave_type,
            detune: Detune::default(),
        }
    }

    pub fn with_detune(mut self, detune: Detune) -> Self {
        self.detune = detune;
        self
    }
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self::new(WaveType::Sine)
    }
}

/// Which parameter an envelope modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeTarget {
    Gain,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeField {
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    pub target: EnvelopeTarget,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeConfig {
    pub fn gain() -> Self {
        Self {
            target: EnvelopeTarget::Gain,
            attack: 0.1,
            decay: 2.0,
            sustain: 0.6,
            release: 2.0,
        }
    }

    pub fn filter() -> Self {
        Self {
            target: EnvelopeTarget::Filter,
            attack: 0.8,
            decay: 0.5,
            sustain: 1.0,
            release: 1.0,
        }
    }

    pub fn set(&mut self, field: EnvelopeField, value: f32) {
        match field {
            EnvelopeField::Attack => self.attack = value,
            EnvelopeField::Decay => self.decay = value,
            EnvelopeField::Sustain => self.sustain = value,
            EnvelopeField::Release => self.release = value,
        }
    }

    pub fn params(&self) -> AdsrParams {
        AdsrParams::new(self.attack, self.decay, self.sustain, self.release)
    }
}

/// Everything one voice engine needs to know about its patch.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub enabled: bool,
    pub voice_steal_mode: VoiceStealMode,
    /// Legato glide time in seconds.
    pub glide_time: f32,
    pub oscillators: Vec<OscillatorConfig>,
    pub gain_envelope: EnvelopeConfig,
    pub filter_envelope: EnvelopeConfig,
}

impl EngineConfig {
    pub fn envelope(&self, target: EnvelopeTarget) -> &EnvelopeConfig {
        match target {
            EnvelopeTarget::Gain => &self.gain_envelope,
            EnvelopeTarget::Filter => &self.filter_envelope,
        }
    }

    pub fn envelope_mut(&mut self, target: EnvelopeTarget) -> &mut EnvelopeConfig {
        match target {
            EnvelopeTarget::Gain => &mut self.gain_envelope,
            EnvelopeTarget::Filter => &mut self.filter_envelope,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice_steal_mode: VoiceStealMode::default(),
            glide_time: 0.05,
            oscillators: vec![OscillatorConfig::default()],
            gain_envelope: EnvelopeConfig::gain(),
            filter_envelope: EnvelopeConfig::filter(),
        }
    }
}
