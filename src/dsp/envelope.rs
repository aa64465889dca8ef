/*
ADSR Envelope Implementation
============================

This module implements a linear ADSR envelope generator. One instance scales
the oscillator mix of a voice slot; the voice engine also carries a second
instance for the filter target.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). This multiplies
              the audio signal to control its amplitude over time.

  stage       Which phase of the envelope we're in: Idle, Attack, Decay,
              Sustain, or Release. A state machine governs transitions.

  gate        The note on/off signal. Gate high (note_on) triggers Attack.
              Gate low (note_off) triggers Release from wherever we are.

  step        How much `level` changes per sample. Calculated from the stage
              duration and sample rate.


The Shape: Linear Ramps
-----------------------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release
         (A)   (D)      (S)      (R)


Retriggering
------------

note_on does NOT reset the level to zero. Attack climbs from whatever level
the envelope is at, with the same slope a full 0 → 1 attack would have.
This matters for voice stealing: a voice that is re-gated halfway through its
release keeps its amplitude and swells back up instead of clicking to silence.

    Level
      │   ╱╲___          ╱╲__
      │  ╱     ╲        ╱
      │ ╱       ╲    ╱─╯   <- attack resumes from the release level
      │╱         ╲__╱
      └────────────────────→ Time
                  ↑
               note_on


Instant Stages
--------------

A stage shorter than one sample (including 0.0 seconds) completes
immediately. The crossfade fast-release uses attack = decay = 0, so these
paths must never divide by zero.


The State Machine
-----------------

    ┌──────┐  note_on   ┌────────┐  level=1   ┌───────┐  level=S  ┌─────────┐
    │ Idle │ ─────────→ │ Attack │ ─────────→ │ Decay │ ────────→ │ Sustain │
    └──────┘            └────────┘            └───────┘           └─────────┘
        ↑                    │ note_off           │ note_off           │
        │                    ↓                    ↓                    │
        │   level=0     ┌─────────┐ ←─────────────┴────────────────────┘
        └────────────── │ Release │            note_off
                        └─────────┘
                             │ note_on → Attack (from current level)

Release is special: we snapshot the starting level and total samples at
note_off time, then interpolate linearly. This ensures we hit exactly 0.0.
*/

const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate went high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate went low, ramping down to 0
}

/// Stage times in seconds and the sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(0.1, 2.0, 0.6, 2.0)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    params: AdsrParams,
    sample_rate: f32,

    // Runtime state (changes every sample)
    stage: EnvelopeState,
    level: f32,

    // Release bookkeeping (pre-calculated at note_off for precision)
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(params: AdsrParams) -> Self {
        Self {
            params,
            sample_rate: DEFAULT_SAMPLE_RATE,
            stage: EnvelopeState::Idle,
            level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self::new(AdsrParams::new(attack, decay, sustain, release))
    }

    /// Non-positive rates are ignored; the previous rate stays in effect.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 && sample_rate.is_finite() {
            self.sample_rate = sample_rate;
        }
    }

    /// Replace the stage parameters. Takes effect from the next sample; a
    /// release already in progress keeps its original length.
    pub fn set_params(&mut self, params: AdsrParams) {
        self.params = AdsrParams::new(params.attack, params.decay, params.sustain, params.release);
    }

    pub fn params(&self) -> AdsrParams {
        self.params
    }

    /// Gate high: (re)start the attack from the current level.
    pub fn note_on(&mut self) {
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from current level.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeState::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples =
            (self.params.release * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += self.step(self.params.attack);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.params.sustain;
                let step = self.step(self.params.decay);
                self.level -= (1.0 - target) * step;

                if self.level <= target || step >= 1.0 {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.params.sustain;
            }

            EnvelopeState::Release => {
                // level = start * (1 - elapsed/total)
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    /// Reset to idle state.
    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    /// The level produced by the last `next_sample` call.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    // Fraction of full scale covered per sample by a stage of `seconds`.
    fn step(&self, seconds: f32) -> f32 {
        let samples = seconds * self.sample_rate;
        if samples > 1.0 {
            1.0 / samples
        } else {
            1.0
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}
