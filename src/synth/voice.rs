use crate::{
    io::AudioBuffer,
    synth::{
        engine::VoiceEngine,
        message::{ConfigEvent, MessageReceiver},
    },
};

/// One host voice: forwards note events to its [`VoiceEngine`] and mixes the
/// engine's output into the host's block.
///
/// The host owns the voice pool and decides which voice to steal. A voice
/// counts as busy from `note_on` until the engine reports that the note has
/// fully finished; any crossfade tail still playing at that point keeps
/// rendering.
pub struct Voice {
    engine: VoiceEngine,
    events: Option<Box<dyn MessageReceiver + Send>>,
    current_note: Option<u8>,
}

impl Voice {
    pub fn new(engine: VoiceEngine) -> Self {
        Self {
            engine,
            events: None,
            current_note: None,
        }
    }

    /// Attach the queue this voice drains at the start of every block.
    pub fn with_events(mut self, events: impl MessageReceiver + Send + 'static) -> Self {
        self.events = Some(Box::new(events));
        self
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.engine.set_sample_rate(sample_rate);
    }

    /// Pitch wheel is accepted for host compatibility but not applied.
    pub fn note_on(&mut self, note: u8, velocity: f32, _pitch_wheel: i32) {
        log::trace!("voice note on {note} vel {velocity}");
        self.current_note = Some(note);
        self.engine.start_note(note, velocity);
    }

    pub fn note_off(&mut self, velocity: f32, allow_tail_off: bool) {
        log::trace!("voice note off (tail: {allow_tail_off})");
        self.engine.stop_note(velocity, allow_tail_off);
    }

    /// Apply a configuration edit directly, for hosts without a queue.
    pub fn handle_event(&mut self, event: &ConfigEvent) {
        self.engine.handle_event(event);
    }

    /// Add `num_samples` frames of output into every channel of `buffer`,
    /// starting at `start_sample`.
    pub fn render_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        self.process_events();

        if !self.engine.is_sounding() {
            return;
        }

        let end = (start_sample + num_samples).min(buffer.num_frames());
        for frame in start_sample..end {
            let sample = self.engine.next_sample();
            buffer.add_frame(frame, sample);

            if self.engine.take_note_finished() {
                log::trace!("voice finished note {:?}", self.current_note);
                self.current_note = None;
            }
        }
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    /// True while the host must not reuse this voice for a fresh note.
    pub fn is_active(&self) -> bool {
        self.current_note.is_some()
    }

    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut VoiceEngine {
        &mut self.engine
    }

    fn process_events(&mut self) {
        if let Some(events) = self.events.as_mut() {
            while let Some(event) = events.pop() {
                self.engine.handle_event(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Wavetable, WavetableBank};
    use crate::patch::{
        EngineConfig, EnvelopeConfig, EnvelopeField, EnvelopeTarget, OscillatorConfig,
        VoiceStealMode, WaveType,
    };
    use std::collections::VecDeque;
    use std::sync::Arc;

    const SAMPLE_RATE: f32 = 1_000.0;

    // Flat table: every rendered sample equals the envelope times 0.5 * velocity.
    fn voice() -> Voice {
        let flat = Arc::new(Wavetable::from_cycle(&[1.0; 16]).unwrap());
        let config = EngineConfig {
            voice_steal_mode: VoiceStealMode::Normal,
            gain_envelope: EnvelopeConfig {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.02,
                ..EnvelopeConfig::gain()
            },
            ..EngineConfig::default()
        };
        let mut voice = Voice::new(VoiceEngine::new(&config, Arc::new(WavetableBank::new(flat))));
        voice.set_sample_rate(SAMPLE_RATE);
        voice
    }

    struct Queue(VecDeque<ConfigEvent>);

    impl MessageReceiver for Queue {
        fn pop(&mut self) -> Option<ConfigEvent> {
            self.0.pop_front()
        }
    }

    #[test]
    fn renders_additively_at_offset_into_every_channel() {
        let mut voice = voice();
        let mut buffer = AudioBuffer::new(2, 8);
        buffer.channel_mut(0).fill(0.25);

        voice.note_on(60, 1.0, 8192);
        voice.render_block(&mut buffer, 2, 4);

        assert_eq!(buffer.channel(0), &[0.25, 0.25, 0.75, 0.75, 0.75, 0.75, 0.25, 0.25]);
        assert_eq!(buffer.channel(1), &[0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn idle_voice_leaves_buffer_untouched() {
        let mut voice = voice();
        let mut buffer = AudioBuffer::new(1, 16);

        voice.render_block(&mut buffer, 0, 16);

        assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
        assert!(!voice.is_active());
    }

    #[test]
    fn voice_frees_itself_after_release() {
        let mut voice = voice();
        let mut buffer = AudioBuffer::new(1, 64);

        voice.note_on(64, 0.5, 8192);
        voice.render_block(&mut buffer, 0, 10);
        assert_eq!(voice.current_note(), Some(64));

        voice.note_off(0.0, true);
        voice.render_block(&mut buffer, 10, 30);

        assert!(!voice.is_active());
        assert_eq!(voice.current_note(), None);
        assert!(!voice.engine().is_sounding());
    }

    #[test]
    fn crossfade_tail_keeps_rendering_after_voice_is_freed() {
        let mut voice = voice();
        let mut buffer = AudioBuffer::new(1, 16);
        voice.handle_event(&ConfigEvent::EnvelopeParamChanged {
            target: EnvelopeTarget::Gain,
            field: EnvelopeField::Release,
            value: 0.002,
        });

        voice.note_on(60, 1.0, 8192);
        voice.render_block(&mut buffer, 0, 5);
        voice.note_on(62, 1.0, 8192);
        voice.note_off(0.0, true);
        voice.render_block(&mut buffer, 5, 6);

        // New note released after two samples, the fade from 0.5 runs ten.
        assert!(!voice.is_active());
        assert!(voice.engine().is_sounding());
        assert!((buffer.channel(0)[10] - 0.25).abs() < 1e-6);

        voice.render_block(&mut buffer, 11, 5);
        assert!(!voice.engine().is_sounding());
        assert_eq!(buffer.channel(0)[15], 0.0);
    }

    #[test]
    fn queued_events_apply_at_block_start() {
        let events = Queue(VecDeque::from([
            ConfigEvent::OscillatorAdded {
                index: 1,
                config: OscillatorConfig::new(WaveType::Saw),
            },
            ConfigEvent::EngineEnabledChanged(false),
        ]));
        let mut voice = voice().with_events(events);
        let mut buffer = AudioBuffer::new(1, 4);

        voice.note_on(60, 1.0, 8192);
        voice.render_block(&mut buffer, 0, 4);

        assert_eq!(voice.engine().oscillator_count(), 2);
        assert!(!voice.engine().is_enabled());
        assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn block_past_buffer_end_is_clamped() {
        let mut voice = voice();
        let mut buffer = AudioBuffer::new(1, 4);

        voice.note_on(60, 1.0, 8192);
        voice.render_block(&mut buffer, 2, 100);

        assert_eq!(buffer.channel(0), &[0.0, 0.0, 0.5, 0.5]);
    }
}
