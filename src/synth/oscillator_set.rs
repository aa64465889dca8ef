use crate::{
    dsp::{Oscillator, WavetableResolver},
    patch::{DetuneField, OscillatorConfig, WaveType},
    MAX_OSCILLATORS,
};

/// An ordered group of oscillators mirroring the patch's oscillator list.
///
/// The set is only ever changed through the `on_config_*` methods, which
/// correspond 1:1 to the store's structural events, so its length and order
/// always match the configuration it was built from.
#[derive(Debug)]
pub struct OscillatorSet {
    oscillators: Vec<Oscillator>,
    sample_rate: f32,
    note: Option<u8>,
    glide: Option<Glide>,
}

/// Linear pitch ramp used for legato steals.
#[derive(Debug, Clone, Copy)]
struct Glide {
    pitch: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl OscillatorSet {
    pub fn new() -> Self {
        Self {
            oscillators: Vec::with_capacity(MAX_OSCILLATORS),
            sample_rate: 0.0,
            note: None,
            glide: None,
        }
    }

    pub fn from_configs(configs: &[OscillatorConfig], resolver: &dyn WavetableResolver) -> Self {
        let mut set = Self::new();
        for (index, config) in configs.iter().enumerate() {
            set.on_config_added(index, *config, resolver);
        }
        set
    }

    /// Build an oscillator for a newly inserted configuration entry.
    pub fn on_config_added(
        &mut self,
        index: usize,
        config: OscillatorConfig,
        resolver: &dyn WavetableResolver,
    ) {
        debug_assert!(index <= self.oscillators.len(), "oscillator index {index} out of range");
        debug_assert!(self.oscillators.len() < MAX_OSCILLATORS);
        let index = index.min(self.oscillators.len());

        let mut osc = Oscillator::new(config, resolver.resolve(config.wave_type));
        osc.set_sample_rate(self.sample_rate);
        osc.set_pitch(self.current_pitch());
        self.oscillators.insert(index, osc);
    }

    pub fn on_config_removed(&mut self, index: usize) {
        debug_assert!(index < self.oscillators.len(), "oscillator index {index} out of range");
        if index < self.oscillators.len() {
            self.oscillators.remove(index);
        }
    }

    pub fn on_wave_type_changed(
        &mut self,
        index: usize,
        wave_type: WaveType,
        resolver: &dyn WavetableResolver,
    ) {
        if let Some(osc) = self.get_mut(index) {
            osc.set_wave_type(wave_type, resolver.resolve(wave_type));
        }
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(osc) = self.get_mut(index) {
            osc.set_enabled(enabled);
        }
    }

    pub fn set_detune(&mut self, index: usize, field: DetuneField, value: i32) {
        if let Some(osc) = self.get_mut(index) {
            osc.set_detune_field(field, value);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for osc in &mut self.oscillators {
            osc.set_sample_rate(sample_rate);
        }
    }

    /// Jump straight to `note`, cancelling any glide in progress.
    pub fn set_note(&mut self, note: Option<u8>) {
        self.note = note;
        self.glide = None;
        for osc in &mut self.oscillators {
            osc.set_note(note);
        }
    }

    /// Slide from the current pitch to `note` over `samples` output samples.
    ///
    /// Without a current pitch, or with a zero-length glide, this is the same
    /// as [`set_note`](Self::set_note).
    pub fn glide_to(&mut self, note: u8, samples: u32) {
        let Some(start) = self.current_pitch() else {
            self.set_note(Some(note));
            return;
        };
        if samples == 0 {
            self.set_note(Some(note));
            return;
        }

        let target = f32::from(note);
        self.note = Some(note);
        self.glide = Some(Glide {
            pitch: start,
            target,
            step: (target - start) / samples as f32,
            remaining: samples,
        });
    }

    pub fn is_gliding(&self) -> bool {
        self.glide.is_some()
    }

    /// The note the set is playing or gliding towards.
    pub fn note(&self) -> Option<u8> {
        self.note
    }

    /// Pitch actually sounding right now (fractional while gliding).
    pub fn current_pitch(&self) -> Option<f32> {
        match self.glide {
            Some(glide) => Some(glide.pitch),
            None => self.note.map(f32::from),
        }
    }

    /// Sum one sample from every enabled oscillator.
    ///
    /// The enabled flag is read from each oscillator's own configuration on
    /// every call rather than cached at the set level.
    #[inline]
    pub fn mix(&mut self) -> f32 {
        let glide_step = self.glide.as_mut().map(|glide| {
            glide.remaining = glide.remaining.saturating_sub(1);
            let done = glide.remaining == 0;
            glide.pitch = if done {
                glide.target
            } else {
                glide.pitch + glide.step
            };
            (glide.pitch, done)
        });

        if let Some((pitch, done)) = glide_step {
            if done {
                self.glide = None;
            }
            for osc in &mut self.oscillators {
                osc.set_pitch(Some(pitch));
            }
        }

        self.oscillators
            .iter_mut()
            .filter(|osc| osc.is_enabled())
            .map(|osc| osc.next_sample())
            .sum()
    }

    pub fn reset_phases(&mut self) {
        for osc in &mut self.oscillators {
            osc.reset_phase();
        }
    }

    pub fn len(&self) -> usize {
        self.oscillators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oscillators.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Oscillator> {
        self.oscillators.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Oscillator> {
        self.oscillators.iter()
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.oscillators.capacity()
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Oscillator> {
        debug_assert!(index < self.oscillators.len(), "oscillator index {index} out of range");
        self.oscillators.get_mut(index)
    }
}

// A derived clone would shrink the reservation to the current length.
impl Clone for OscillatorSet {
    fn clone(&self) -> Self {
        let mut oscillators = Vec::with_capacity(MAX_OSCILLATORS.max(self.oscillators.len()));
        oscillators.extend(self.oscillators.iter().cloned());
        Self {
            oscillators,
            sample_rate: self.sample_rate,
            note: self.note,
            glide: self.glide,
        }
    }
}

impl Default for OscillatorSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Wavetable, WavetableBank};
    use crate::patch::Detune;
    use std::sync::Arc;

    fn bank() -> WavetableBank {
        let flat = Arc::new(Wavetable::from_cycle(&[0.5; 32]).unwrap());
        let ramp = Arc::new(Wavetable::from_fn(64, |p| p).unwrap());
        WavetableBank::new(flat).with_table(WaveType::Ramp, ramp)
    }

    fn wave_types(set: &OscillatorSet) -> Vec<WaveType> {
        set.iter().map(|osc| osc.config().wave_type).collect()
    }

    #[test]
    fn mirrors_inserts_and_removals() {
        let bank = bank();
        let mut set = OscillatorSet::new();

        set.on_config_added(0, OscillatorConfig::new(WaveType::Sine), &bank);
        set.on_config_added(1, OscillatorConfig::new(WaveType::Saw), &bank);
        set.on_config_added(1, OscillatorConfig::new(WaveType::Ramp), &bank);
        assert_eq!(
            wave_types(&set),
            vec![WaveType::Sine, WaveType::Ramp, WaveType::Saw]
        );

        set.on_config_removed(0);
        assert_eq!(wave_types(&set), vec![WaveType::Ramp, WaveType::Saw]);
        assert_eq!(set.get(0).unwrap().table_size(), 64);
    }

    #[test]
    fn new_oscillators_pick_up_ambient_state() {
        let bank = bank();
        let mut set = OscillatorSet::new();
        set.set_sample_rate(48_000.0);
        set.set_note(Some(69));

        set.on_config_added(0, OscillatorConfig::new(WaveType::Sine), &bank);

        let osc = set.get(0).unwrap();
        assert!(osc.has_increment());
        assert!((osc.frequency().unwrap() - 440.0).abs() < 1e-3);
    }

    #[test]
    fn mix_skips_disabled_oscillators() {
        let bank = bank();
        let mut set = OscillatorSet::from_configs(
            &[OscillatorConfig::default(), OscillatorConfig::default()],
            &bank,
        );
        set.set_sample_rate(48_000.0);
        set.set_note(Some(60));

        // Flat 0.5 table: every enabled oscillator contributes exactly 0.5.
        assert_eq!(set.mix(), 1.0);

        set.set_enabled(1, false);
        assert_eq!(set.mix(), 0.5);

        set.set_enabled(0, false);
        assert_eq!(set.mix(), 0.0);
    }

    #[test]
    fn wave_type_change_rescales_phase() {
        let bank = bank();
        let mut set = OscillatorSet::from_configs(&[OscillatorConfig::default()], &bank);
        set.set_sample_rate(48_000.0);
        set.set_note(Some(72));
        for _ in 0..5 {
            set.mix();
        }
        let relative = set.get(0).unwrap().phase() / 32.0;

        set.on_wave_type_changed(0, WaveType::Ramp, &bank);

        let osc = set.get(0).unwrap();
        assert_eq!(osc.config().wave_type, WaveType::Ramp);
        assert!((osc.phase() / 64.0 - relative).abs() < 1e-6);
    }

    #[test]
    fn detune_applies_to_one_oscillator() {
        let bank = bank();
        let mut set = OscillatorSet::from_configs(
            &[
                OscillatorConfig::default(),
                OscillatorConfig::default().with_detune(Detune::default()),
            ],
            &bank,
        );
        set.set_sample_rate(48_000.0);
        set.set_note(Some(57));

        set.set_detune(1, DetuneField::Octave, 1);

        let f0 = set.get(0).unwrap().frequency().unwrap();
        let f1 = set.get(1).unwrap().frequency().unwrap();
        assert!((f1 - 2.0 * f0).abs() < 1e-2);
    }

    #[test]
    fn glide_reaches_target_monotonically() {
        let bank = bank();
        let mut set = OscillatorSet::from_configs(&[OscillatorConfig::default()], &bank);
        set.set_sample_rate(48_000.0);
        set.set_note(Some(60));

        set.glide_to(72, 100);
        assert_eq!(set.note(), Some(72));

        let mut last = 60.0;
        for _ in 0..100 {
            set.mix();
            let pitch = set.current_pitch().unwrap();
            assert!(pitch >= last);
            last = pitch;
        }

        assert!(!set.is_gliding());
        assert_eq!(set.current_pitch(), Some(72.0));
        assert_eq!(set.get(0).unwrap().pitch(), Some(72.0));
    }

    #[test]
    fn clones_keep_the_full_reservation() {
        let bank = bank();
        let set = OscillatorSet::from_configs(&[OscillatorConfig::default()], &bank);

        let copy = set.clone();

        assert!(set.capacity() >= MAX_OSCILLATORS);
        assert!(copy.capacity() >= MAX_OSCILLATORS);
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn glide_without_a_note_jumps() {
        let bank = bank();
        let mut set = OscillatorSet::from_configs(&[OscillatorConfig::default()], &bank);

        set.glide_to(64, 480);

        assert!(!set.is_gliding());
        assert_eq!(set.current_pitch(), Some(64.0));
    }
}
