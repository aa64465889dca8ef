use std::sync::Arc;

use crate::dsp::wavetable::Wavetable;
use crate::patch::{DetuneField, OscillatorConfig};

/*
Wavetable Oscillator
====================

The oscillator walks a single-cycle table and reads it back at whatever
speed produces the requested pitch.

Vocabulary
----------

  phase            Fractional read position in the table, in [0, N).
                   Persists across samples so the waveform is continuous.

  phase increment  How many table samples we advance per output sample.
                   Zero means the oscillator is silent.

  pitch            The (possibly fractional) MIDI note being played, before
                   detune is applied. Fractional pitches exist while a legato
                   glide is moving between notes.


The Math: Pitch to Increment
----------------------------

    frequency = 440 * 2^((pitch + detune_semitones - 69) / 12)
    increment = frequency * N / sample_rate

Example: A4 (MIDI 69) on a 1024-sample table at 48kHz
  - frequency = 440 Hz
  - increment = 440 * 1024 / 48000 ≈ 9.387 table samples per output sample
  - one cycle takes 1024 / 9.387 ≈ 109 output samples = 48000 / 440 ✓

Without a sample rate or without a note there is nothing to compute, so the
increment stays at zero and the oscillator outputs silence.


Linear Interpolation
--------------------

The phase usually lands between two table entries:

    table:   ... s[i]        s[i+1] ...
                  |----*-----|
                     frac

    out = s[i] + frac * (s[i+1] - s[i])

The table's wrap sample (s[N] == s[0]) keeps s[i+1] in bounds for any
phase below N.


Enable Flag
-----------

A disabled oscillator returns 0.0 and does NOT advance its phase. Flipping
it back on resumes exactly where it left off.
*/

/// Convert a (fractional) MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    config: OscillatorConfig,

    wavetable: Arc<Wavetable>,
    table_size: usize,
    phase: f32,
    phase_increment: f32,

    sample_rate: Option<f32>,
    pitch: Option<f32>,
    frequency: Option<f32>,
}

impl Oscillator {
    pub fn new(config: OscillatorConfig, wavetable: Arc<Wavetable>) -> Self {
        let table_size = wavetable.size();
        Self {
            config,
            wavetable,
            table_size,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate: None,
            pitch: None,
            frequency: None,
        }
    }

    /// Swap in a new table. When the size changes the phase is rescaled so
    /// playback continues from the same relative position in the cycle.
    pub fn set_wavetable(&mut self, wavetable: Arc<Wavetable>) {
        let old_size = self.table_size;
        self.table_size = wavetable.size();
        self.wavetable = wavetable;

        if self.table_size != old_size {
            let size = self.table_size as f32;
            self.phase *= size / old_size as f32;
            if self.phase >= size {
                self.phase -= size;
            }
            self.update_increment();
        }
    }

    /// Non-positive or non-finite rates leave the oscillator inactive.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = (sample_rate > 0.0 && sample_rate.is_finite()).then_some(sample_rate);
        self.update_increment();
    }

    /// Set the note to play; `None` silences the oscillator.
    pub fn set_note(&mut self, note: Option<u8>) {
        self.set_pitch(note.map(f32::from));
    }

    /// Fractional variant of [`set_note`](Self::set_note), used by glides.
    pub fn set_pitch(&mut self, pitch: Option<f32>) {
        self.pitch = pitch;
        self.update_frequency();
    }

    pub fn set_detune(&mut self, detune: crate::patch::Detune) {
        self.config.detune = detune;
        self.update_frequency();
    }

    pub fn set_detune_field(&mut self, field: DetuneField, value: i32) {
        self.config.detune.set(field, value);
        self.update_frequency();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// True when both a sample rate and a note are set.
    pub fn has_increment(&self) -> bool {
        self.phase_increment > 0.0
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.config.enabled || !self.has_increment() {
            return 0.0;
        }

        let samples = self.wavetable.samples();
        let index0 = (self.phase as usize).min(self.table_size - 1);
        let frac = self.phase - index0 as f32;

        let value0 = samples[index0];
        let value1 = samples[index0 + 1];
        let out = value0 + frac * (value1 - value0);

        let size = self.table_size as f32;
        self.phase += self.phase_increment;
        if self.phase >= size {
            self.phase -= size;
            if self.phase >= size {
                // Increment larger than the table (pitch above Nyquist-ish).
                self.phase %= size;
            }
        }

        out
    }

    /// Rewind to the start of the cycle for a fresh note.
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn phase_increment(&self) -> f32 {
        self.phase_increment
    }

    pub fn frequency(&self) -> Option<f32> {
        self.frequency
    }

    pub fn pitch(&self) -> Option<f32> {
        self.pitch
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    pub(crate) fn set_wave_type(&mut self, wave_type: crate::patch::WaveType, table: Arc<Wavetable>) {
        self.config.wave_type = wave_type;
        self.set_wavetable(table);
    }

    fn update_frequency(&mut self) {
        self.frequency = self
            .pitch
            .map(|pitch| midi_note_to_freq(pitch + self.config.detune.semitones()));
        self.update_increment();
    }

    fn update_increment(&mut self) {
        self.phase_increment = match (self.frequency, self.sample_rate) {
            (Some(frequency), Some(sample_rate)) => {
                frequency * self.table_size as f32 / sample_rate
            }
            _ => 0.0,
        };
    }
}
