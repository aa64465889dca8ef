//! wavevoice - plays a short phrase through one stolen-and-restolen voice
//!
//! Run with: RUST_LOG=debug cargo run
//!
//! Each pass of the phrase switches steal mode and wave type through the
//! patch store, so the difference between crossfade, portamento and legato
//! steals is audible.

mod tables;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use wavevoice::{
    io::AudioBuffer,
    patch::{
        DetuneField, EnvelopeField, EnvelopeTarget, OscillatorConfig, PatchStore, VoiceStealMode,
        WaveType,
    },
    synth::{Voice, VoiceEngine},
};

const MAX_BLOCK_SIZE: usize = 512;
const NOTE_QUEUE_SIZE: usize = 64;
const STEP: Duration = Duration::from_millis(220);

const PHRASE: [u8; 8] = [60, 63, 67, 70, 72, 70, 67, 63];

#[derive(Debug, Clone, Copy)]
enum NoteCommand {
    On { note: u8, velocity: f32 },
    Off,
}

/// Audio-thread side: one voice, stolen by every new note.
struct Player {
    voice: Voice,
    notes: Consumer<NoteCommand>,
    block: AudioBuffer,
}

impl Player {
    fn handle_notes(&mut self) {
        while let Ok(command) = self.notes.pop() {
            match command {
                NoteCommand::On { note, velocity } => {
                    if self.voice.is_active() {
                        self.voice.note_off(0.0, false);
                    }
                    self.voice.note_on(note, velocity, 8192);
                }
                NoteCommand::Off => self.voice.note_off(0.0, true),
            }
        }
    }

    fn fill(&mut self, data: &mut [f32], channels: usize) {
        self.handle_notes();

        for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let frames = chunk.len() / channels;
            self.block.clear();
            self.voice.render_block(&mut self.block, 0, frames);
            self.block.write_interleaved(chunk);
        }
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::init();

    let bank = Arc::new(tables::standard_bank().wrap_err("failed to build wavetables")?);
    let mut store = PatchStore::default();
    let (snapshot, events) = store.subscribe();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    log::info!("output: {sample_rate} Hz, {channels} channel(s)");

    let mut voice = Voice::new(VoiceEngine::new(&snapshot, bank)).with_events(events);
    voice.set_sample_rate(sample_rate);

    let (mut notes, notes_rx) = RingBuffer::<NoteCommand>::new(NOTE_QUEUE_SIZE);
    let mut player = Player {
        voice,
        notes: notes_rx,
        block: AudioBuffer::new(channels, MAX_BLOCK_SIZE),
    };

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| player.fill(data, channels),
            |err| log::error!("audio stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;

    store.set_envelope_param(EnvelopeTarget::Gain, EnvelopeField::Attack, 0.02)?;
    store.set_envelope_param(EnvelopeTarget::Gain, EnvelopeField::Release, 0.4)?;
    // Second sine a few cents sharp for a little beating.
    store.add_oscillator(1, OscillatorConfig::new(WaveType::Sine))?;
    store.set_detune(1, DetuneField::Fine, 7)?;

    let passes = [
        (VoiceStealMode::Normal, WaveType::Sine),
        (VoiceStealMode::Portamento, WaveType::Saw),
        (VoiceStealMode::Legato, WaveType::Triangle),
        (VoiceStealMode::Normal, WaveType::Square),
    ];

    for (mode, wave_type) in passes {
        log::info!("pass: {mode} / {wave_type}");
        store.set_voice_steal_mode(mode)?;
        store.set_wave_type(0, wave_type)?;

        for &note in &PHRASE {
            if notes.push(NoteCommand::On { note, velocity: 0.8 }).is_err() {
                log::warn!("note queue full, dropping note {note}");
            }
            thread::sleep(STEP);
        }
    }

    let _ = notes.push(NoteCommand::Off);
    thread::sleep(Duration::from_millis(600));
    Ok(())
}
