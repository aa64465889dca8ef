use std::sync::Arc;

use crate::{
    dsp::{AdsrParams, Envelope, WavetableResolver},
    patch::{EngineConfig, EnvelopeConfig, EnvelopeTarget, VoiceStealMode},
    synth::{message::ConfigEvent, oscillator_set::OscillatorSet},
    FAST_RELEASE_TIME,
};

/*
Voice Engine
============

One voice engine renders one voice: a set of oscillators, summed, scaled by
velocity and shaped by an amplitude envelope. Its interesting job is voice
stealing: what to do when a new note arrives while the old one still sounds.

Two Slots
---------

The engine owns two identical slots, each a complete "voice" on its own:

    slot = oscillator set + gain envelope + filter envelope + velocity level

At any time each slot has a role:

    Primary   the note the voice is playing (always exactly one slot)
    Fading    the previous note, fast-releasing under the new one
    Standby   idle, phases at zero, waiting to become Primary

Both slots mirror the same oscillator configuration, so swapping roles
never needs to build or copy oscillators.


Stealing Strategies
-------------------

When the host steals a sounding voice it first calls stop_note with
allow_tail_off = false, then start_note with the new note.

  Portamento   stop_note only remembers the steal (smooth_steal). start_note
               retunes the Primary oscillators in place: same phase, same
               envelope, new pitch. No click because nothing jumps.

  Legato       Like portamento, but the pitch slides to the new note over
               glide_time seconds.

  Normal       (or any start_note while the note is releasing) Crossfade:

                 Primary ──┐                  ┌── Fading (fast release from
                           │  roles swapped   │   its current level)
                 Standby ──┘                  └── Primary (attack from 0)

               At the instant of the swap the two gain envelopes sum to the
               level the old note had, so there is no step in amplitude.


State Machine
-------------

    ┌──────┐  start_note  ┌──────────┐  stop_note  ┌───────────┐
    │ Idle │ ───────────→ │ Sounding │ ──────────→ │ Releasing │
    └──────┘              └──────────┘             └───────────┘
       ↑                    │      ↑                     │
       │     start_note     │      │ fade done           │ start_note
       │     (crossfade)    ↓      │                     ↓
       │                  ┌──────────┐ ←─────────────────┘
       │                  │  Fading  │
       │                  └──────────┘
       │  gain envelope idle   │
       └───────────────────────┘ (from Sounding/Releasing too)

Everything in next_sample is allocation-free and lock-free.
*/

/// What a slot is currently used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Primary,
    Fading,
    Standby,
}

/// Observable state of the engine's note state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Sounding,
    Releasing,
    Fading,
}

#[derive(Debug, Clone)]
struct VoiceSlot {
    role: SlotRole,
    oscillators: OscillatorSet,
    gain_env: Envelope,
    filter_env: Envelope,
    velocity_level: f32,
}

impl VoiceSlot {
    fn new(role: SlotRole, oscillators: OscillatorSet, gain: AdsrParams, filter: AdsrParams) -> Self {
        Self {
            role,
            oscillators,
            gain_env: Envelope::new(gain),
            filter_env: Envelope::new(filter),
            velocity_level: 0.0,
        }
    }

    #[inline]
    fn render(&mut self) -> f32 {
        let mixed = self.oscillators.mix() * self.velocity_level;
        // Advanced in step with the gain envelope; nothing consumes it yet.
        self.filter_env.next_sample();
        mixed * self.gain_env.next_sample()
    }

    fn clear(&mut self) {
        self.oscillators.reset_phases();
        self.gain_env.reset();
        self.filter_env.reset();
    }

    fn start(&mut self, note: u8, velocity: f32) {
        self.velocity_level = velocity * 0.5;
        self.oscillators.set_note(Some(note));
        self.gain_env.note_on();
        self.filter_env.note_on();
    }
}

/// Per-voice oscillator manager with smooth voice stealing.
pub struct VoiceEngine {
    slots: [VoiceSlot; 2],
    resolver: Arc<dyn WavetableResolver>,

    enabled: bool,
    steal_mode: VoiceStealMode,
    glide_time: f32,
    gain_envelope: EnvelopeConfig,
    filter_envelope: EnvelopeConfig,
    sample_rate: f32,

    current_note: Option<u8>,
    releasing: bool,
    smooth_steal: bool,
    note_finished: bool,
}

impl VoiceEngine {
    pub fn new(config: &EngineConfig, resolver: Arc<dyn WavetableResolver>) -> Self {
        let oscillators = OscillatorSet::from_configs(&config.oscillators, resolver.as_ref());
        let gain = config.gain_envelope.params();
        let filter = config.filter_envelope.params();

        Self {
            slots: [
                VoiceSlot::new(SlotRole::Primary, oscillators.clone(), gain, filter),
                VoiceSlot::new(SlotRole::Standby, oscillators, gain, filter),
            ],
            resolver,
            enabled: config.enabled,
            steal_mode: config.voice_steal_mode,
            glide_time: config.glide_time.max(0.0),
            gain_envelope: config.gain_envelope,
            filter_envelope: config.filter_envelope,
            sample_rate: 0.0,
            current_note: None,
            releasing: false,
            smooth_steal: false,
            note_finished: false,
        }
    }

    /// Propagate a new sample rate to every oscillator and envelope.
    /// Unchanged rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate == self.sample_rate {
            return;
        }
        log::debug!("voice engine sample rate {} -> {}", self.sample_rate, sample_rate);
        self.sample_rate = sample_rate;

        for slot in &mut self.slots {
            slot.oscillators.set_sample_rate(sample_rate);
            if sample_rate > 0.0 {
                slot.gain_env.set_sample_rate(sample_rate);
                slot.filter_env.set_sample_rate(sample_rate);
            }
        }
    }

    /// Start `note`, handling the transition from any note already playing.
    pub fn start_note(&mut self, note: u8, velocity: f32) {
        let velocity = velocity.clamp(0.0, 1.0);

        if self.current_note.is_none() {
            self.primary_mut().start(note, velocity);
            self.current_note = Some(note);
            self.releasing = false;
            self.smooth_steal = false;
            return;
        }

        if self.smooth_steal {
            self.smooth_steal = false;
            match self.steal_mode {
                VoiceStealMode::Portamento => {
                    self.primary_mut().oscillators.set_note(Some(note));
                    self.current_note = Some(note);
                    return;
                }
                VoiceStealMode::Legato => {
                    let samples = (self.glide_time * self.sample_rate.max(0.0)).round() as u32;
                    self.primary_mut().oscillators.glide_to(note, samples);
                    self.current_note = Some(note);
                    return;
                }
                // Mode changed between the steal and the new note.
                VoiceStealMode::Normal => {}
            }
        }

        self.begin_crossfade(note, velocity);
    }

    /// Release the current note, or defer to the next `start_note` when the
    /// voice is being stolen under a gliding steal mode.
    pub fn stop_note(&mut self, _velocity: f32, allow_tail_off: bool) {
        if self.current_note.is_none() || self.releasing {
            // Stolen while releasing: start_note will crossfade.
            return;
        }

        if !allow_tail_off && self.steal_mode != VoiceStealMode::Normal {
            self.smooth_steal = true;
        } else {
            let primary = self.primary_mut();
            primary.gain_env.note_off();
            primary.filter_env.note_off();
            self.releasing = true;
            self.smooth_steal = false;
        }
    }

    /// Render one output frame.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let mut out = 0.0;

        if self.current_note.is_some() {
            let primary = self.primary_index();
            if self.slots[primary].gain_env.is_active() {
                out += self.slots[primary].render();
            } else {
                self.finish_note(primary);
            }
        }

        if let Some(fading) = self.slot_index(SlotRole::Fading) {
            let slot = &mut self.slots[fading];
            if slot.gain_env.is_active() {
                out += slot.render();
            } else {
                slot.clear();
                slot.role = SlotRole::Standby;
            }
        }

        out
    }

    /// Apply one configuration edit to both slots.
    pub fn handle_event(&mut self, event: &ConfigEvent) {
        log::trace!("voice engine applying {event:?}");
        let resolver = self.resolver.as_ref();

        match *event {
            ConfigEvent::OscillatorAdded { index, config } => {
                for slot in &mut self.slots {
                    slot.oscillators.on_config_added(index, config, resolver);
                }
            }
            ConfigEvent::OscillatorRemoved { index } => {
                for slot in &mut self.slots {
                    slot.oscillators.on_config_removed(index);
                }
            }
            ConfigEvent::OscillatorEnabledChanged { index, enabled } => {
                for slot in &mut self.slots {
                    slot.oscillators.set_enabled(index, enabled);
                }
            }
            ConfigEvent::WaveTypeChanged { index, wave_type } => {
                for slot in &mut self.slots {
                    slot.oscillators.on_wave_type_changed(index, wave_type, resolver);
                }
            }
            ConfigEvent::DetuneChanged { index, field, value } => {
                for slot in &mut self.slots {
                    slot.oscillators.set_detune(index, field, value);
                }
            }
            ConfigEvent::EnvelopeParamChanged {
                target,
                field,
                value,
            } => {
                let envelope = match target {
                    EnvelopeTarget::Gain => &mut self.gain_envelope,
                    EnvelopeTarget::Filter => &mut self.filter_envelope,
                };
                envelope.set(field, value);
                let params = envelope.params();

                // The fading slot keeps its fast-release shape.
                for slot in self.slots.iter_mut().filter(|s| s.role != SlotRole::Fading) {
                    match target {
                        EnvelopeTarget::Gain => slot.gain_env.set_params(params),
                        EnvelopeTarget::Filter => slot.filter_env.set_params(params),
                    }
                }
            }
            ConfigEvent::VoiceStealModeChanged(mode) => self.steal_mode = mode,
            ConfigEvent::GlideTimeChanged(seconds) => self.glide_time = seconds.max(0.0),
            ConfigEvent::EngineEnabledChanged(enabled) => self.enabled = enabled,
        }
    }

    /// Returns true once after the playing note has fully finished.
    pub fn take_note_finished(&mut self) -> bool {
        std::mem::take(&mut self.note_finished)
    }

    /// A note is playing or a crossfade tail is still audible.
    pub fn is_sounding(&self) -> bool {
        self.current_note.is_some() || self.slot_index(SlotRole::Fading).is_some()
    }

    pub fn state(&self) -> EngineState {
        if self.slot_index(SlotRole::Fading).is_some() {
            EngineState::Fading
        } else if self.current_note.is_none() {
            EngineState::Idle
        } else if self.releasing {
            EngineState::Releasing
        } else {
            EngineState::Sounding
        }
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    /// Role of slot `0` or `1`; `None` for any other index.
    pub fn slot_role(&self, slot: usize) -> Option<SlotRole> {
        self.slots.get(slot).map(|s| s.role)
    }

    /// Last gain envelope output of the slot holding `role`.
    pub fn envelope_level(&self, role: SlotRole) -> Option<f32> {
        self.slot_index(role).map(|i| self.slots[i].gain_env.level())
    }

    /// Oscillators of the slot holding `role`.
    pub fn oscillators_for(&self, role: SlotRole) -> Option<&OscillatorSet> {
        self.slot_index(role).map(|i| &self.slots[i].oscillators)
    }

    /// Oscillators of the primary slot.
    pub fn oscillators(&self) -> &OscillatorSet {
        &self.slots[self.primary_index()].oscillators
    }

    pub fn oscillator_count(&self) -> usize {
        debug_assert_eq!(self.slots[0].oscillators.len(), self.slots[1].oscillators.len());
        self.oscillators().len()
    }

    pub fn steal_mode(&self) -> VoiceStealMode {
        self.steal_mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The incoming note plays at its own velocity; only the dying note
    /// keeps the old level.
    fn begin_crossfade(&mut self, note: u8, velocity: f32) {
        // A third note during a fade cuts the oldest tail short.
        if let Some(stale) = self.slot_index(SlotRole::Fading) {
            self.slots[stale].clear();
            self.slots[stale].role = SlotRole::Standby;
        }

        let old = self.primary_index();
        let new = 1 - old;

        let dying = &mut self.slots[old];
        let level = dying.gain_env.level();
        dying.role = SlotRole::Fading;
        dying
            .gain_env
            .set_params(AdsrParams::new(0.0, 0.0, level, FAST_RELEASE_TIME));
        dying.gain_env.note_off();
        dying.filter_env.note_off();

        let fresh = &mut self.slots[new];
        fresh.role = SlotRole::Primary;
        fresh.clear();
        fresh.gain_env.set_params(self.gain_envelope.params());
        fresh.filter_env.set_params(self.filter_envelope.params());
        fresh.start(note, velocity);

        self.current_note = Some(note);
        self.releasing = false;
    }

    fn finish_note(&mut self, primary: usize) {
        let slot = &mut self.slots[primary];
        slot.clear();
        slot.oscillators.set_note(None);

        self.releasing = false;
        self.smooth_steal = false;
        self.current_note = None;
        self.note_finished = true;
    }

    fn primary_index(&self) -> usize {
        let index = self.slot_index(SlotRole::Primary);
        debug_assert!(index.is_some(), "voice engine lost its primary slot");
        index.unwrap_or(0)
    }

    fn primary_mut(&mut self) -> &mut VoiceSlot {
        let index = self.primary_index();
        &mut self.slots[index]
    }

    fn slot_index(&self, role: SlotRole) -> Option<usize> {
        self.slots.iter().position(|slot| slot.role == role)
    }
}
