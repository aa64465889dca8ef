use std::fmt;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

#[cfg(feature = "rtrb")]
use crate::EVENT_QUEUE_SIZE;
use crate::{
    patch::{
        DetuneField, EngineConfig, EnvelopeField, EnvelopeTarget, OscillatorConfig,
        VoiceStealMode, WaveType,
    },
    synth::ConfigEvent,
    MAX_OSCILLATORS,
};

/// Rejected configuration edit. The stored configuration is unchanged and
/// no event was published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatchError {
    IndexOutOfRange { index: usize, len: usize },
    TooManyOscillators { max: usize },
    InvalidValue { field: &'static str, value: f32 },
    /// A subscriber has not drained its queue; retry after the next block.
    QueueFull,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::IndexOutOfRange { index, len } => {
                write!(f, "oscillator index {index} out of range (have {len})")
            }
            PatchError::TooManyOscillators { max } => {
                write!(f, "a voice holds at most {max} oscillators")
            }
            PatchError::InvalidValue { field, value } => {
                write!(f, "invalid value {value} for {field}")
            }
            PatchError::QueueFull => write!(f, "voice event queue is full"),
        }
    }
}

impl std::error::Error for PatchError {}

/// Control-thread owner of the engine configuration.
///
/// Every successful edit mutates the stored [`EngineConfig`] and pushes the
/// matching [`ConfigEvent`] to every subscribed voice. An edit either reaches
/// all subscribers or none of them.
pub struct PatchStore {
    config: EngineConfig,
    #[cfg(feature = "rtrb")]
    subscribers: Vec<Producer<ConfigEvent>>,
}

impl PatchStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "rtrb")]
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a voice. Build the voice engine from the returned snapshot
    /// and hand the consumer to [`Voice::with_events`](crate::synth::Voice::with_events).
    #[cfg(feature = "rtrb")]
    pub fn subscribe(&mut self) -> (EngineConfig, Consumer<ConfigEvent>) {
        let (tx, rx) = RingBuffer::<ConfigEvent>::new(EVENT_QUEUE_SIZE);
        self.subscribers.push(tx);
        log::debug!("patch store: subscriber {} registered", self.subscribers.len());
        (self.config.clone(), rx)
    }

    #[cfg(feature = "rtrb")]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Insert an oscillator at `index` (`index == len` appends).
    pub fn add_oscillator(
        &mut self,
        index: usize,
        config: OscillatorConfig,
    ) -> Result<ConfigEvent, PatchError> {
        let len = self.config.oscillators.len();
        if index > len {
            return Err(PatchError::IndexOutOfRange { index, len });
        }
        if len >= MAX_OSCILLATORS {
            return Err(PatchError::TooManyOscillators {
                max: MAX_OSCILLATORS,
            });
        }
        for field in DetuneField::ALL {
            check_detune(field, config.detune.get(field))?;
        }

        self.publish(ConfigEvent::OscillatorAdded { index, config }, |cfg| {
            cfg.oscillators.insert(index, config)
        })
    }

    pub fn remove_oscillator(&mut self, index: usize) -> Result<ConfigEvent, PatchError> {
        self.check_index(index)?;
        self.publish(ConfigEvent::OscillatorRemoved { index }, |cfg| {
            cfg.oscillators.remove(index);
        })
    }

    pub fn set_oscillator_enabled(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<ConfigEvent, PatchError> {
        self.check_index(index)?;
        self.publish(
            ConfigEvent::OscillatorEnabledChanged { index, enabled },
            |cfg| cfg.oscillators[index].enabled = enabled,
        )
    }

    pub fn set_wave_type(
        &mut self,
        index: usize,
        wave_type: WaveType,
    ) -> Result<ConfigEvent, PatchError> {
        self.check_index(index)?;
        self.publish(ConfigEvent::WaveTypeChanged { index, wave_type }, |cfg| {
            cfg.oscillators[index].wave_type = wave_type
        })
    }

    pub fn set_detune(
        &mut self,
        index: usize,
        field: DetuneField,
        value: i32,
    ) -> Result<ConfigEvent, PatchError> {
        self.check_index(index)?;
        check_detune(field, value)?;
        self.publish(ConfigEvent::DetuneChanged { index, field, value }, |cfg| {
            cfg.oscillators[index].detune.set(field, value)
        })
    }

    /// Stage times must be finite and non-negative; sustain lies in [0, 1].
    pub fn set_envelope_param(
        &mut self,
        target: EnvelopeTarget,
        field: EnvelopeField,
        value: f32,
    ) -> Result<ConfigEvent, PatchError> {
        let valid = match field {
            EnvelopeField::Sustain => (0.0..=1.0).contains(&value),
            _ => value.is_finite() && value >= 0.0,
        };
        if !valid {
            let name = match field {
                EnvelopeField::Attack => "attack",
                EnvelopeField::Decay => "decay",
                EnvelopeField::Sustain => "sustain",
                EnvelopeField::Release => "release",
            };
            return Err(PatchError::InvalidValue { field: name, value });
        }

        self.publish(
            ConfigEvent::EnvelopeParamChanged {
                target,
                field,
                value,
            },
            |cfg| cfg.envelope_mut(target).set(field, value),
        )
    }

    pub fn set_voice_steal_mode(
        &mut self,
        mode: VoiceStealMode,
    ) -> Result<ConfigEvent, PatchError> {
        self.publish(ConfigEvent::VoiceStealModeChanged(mode), |cfg| {
            cfg.voice_steal_mode = mode
        })
    }

    pub fn set_glide_time(&mut self, seconds: f32) -> Result<ConfigEvent, PatchError> {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(PatchError::InvalidValue {
                field: "glide time",
                value: seconds,
            });
        }
        self.publish(ConfigEvent::GlideTimeChanged(seconds), |cfg| {
            cfg.glide_time = seconds
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<ConfigEvent, PatchError> {
        self.publish(ConfigEvent::EngineEnabledChanged(enabled), |cfg| {
            cfg.enabled = enabled
        })
    }

    fn check_index(&self, index: usize) -> Result<(), PatchError> {
        let len = self.config.oscillators.len();
        if index < len {
            Ok(())
        } else {
            Err(PatchError::IndexOutOfRange { index, len })
        }
    }

    fn publish(
        &mut self,
        event: ConfigEvent,
        apply: impl FnOnce(&mut EngineConfig),
    ) -> Result<ConfigEvent, PatchError> {
        #[cfg(feature = "rtrb")]
        {
            let before = self.subscribers.len();
            self.subscribers.retain(|tx| !tx.is_abandoned());
            if self.subscribers.len() != before {
                log::debug!(
                    "patch store: dropped {} abandoned subscriber(s)",
                    before - self.subscribers.len()
                );
            }

            if self.subscribers.iter().any(|tx| tx.is_full()) {
                log::warn!("patch store: event queue full, rejecting {event:?}");
                return Err(PatchError::QueueFull);
            }
        }

        apply(&mut self.config);

        #[cfg(feature = "rtrb")]
        for tx in &mut self.subscribers {
            // Capacity was checked above and this is the only producer.
            let _ = tx.push(event);
        }

        log::debug!("patch store: {event:?}");
        Ok(event)
    }
}

fn check_detune(field: DetuneField, value: i32) -> Result<(), PatchError> {
    if field.accepts(value) {
        Ok(())
    } else {
        log::warn!("patch store: {} {value} outside ±{}", field.as_str(), field.limit());
        Err(PatchError::InvalidValue {
            field: field.as_str(),
            value: value as f32,
        })
    }
}

impl Default for PatchStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
