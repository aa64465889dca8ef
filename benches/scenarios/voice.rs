//! Benchmarks for complete voices.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavevoice::io::AudioBuffer;
use wavevoice::patch::{EngineConfig, OscillatorConfig, VoiceStealMode, WaveType};
use wavevoice::synth::{Voice, VoiceEngine};

use crate::{bank, BLOCK_SIZES, SAMPLE_RATE};

fn voice(mode: VoiceStealMode, oscillators: usize) -> Voice {
    let config = EngineConfig {
        voice_steal_mode: mode,
        oscillators: vec![OscillatorConfig::new(WaveType::Saw); oscillators],
        ..EngineConfig::default()
    };
    let mut voice = Voice::new(VoiceEngine::new(&config, bank()));
    voice.set_sample_rate(SAMPLE_RATE);
    voice
}

pub fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voice");

    for &size in BLOCK_SIZES {
        let mut buffer = AudioBuffer::new(2, size);

        // Sustained three-oscillator patch, stereo output
        let mut held = voice(VoiceStealMode::Portamento, 3);
        held.note_on(45, 0.9, 8192);
        group.bench_with_input(BenchmarkId::new("sustained", size), &size, |b, _| {
            b.iter(|| {
                buffer.clear();
                held.render_block(black_box(&mut buffer), 0, size);
            })
        });

        // Every block steals the voice: both slots render during the fade
        let mut stolen = voice(VoiceStealMode::Normal, 3);
        stolen.note_on(45, 0.9, 8192);
        let mut note = 45u8;
        group.bench_with_input(BenchmarkId::new("crossfade_steal", size), &size, |b, _| {
            b.iter(|| {
                note = if note == 45 { 52 } else { 45 };
                stolen.note_off(0.0, false);
                stolen.note_on(note, 0.9, 8192);
                buffer.clear();
                stolen.render_block(black_box(&mut buffer), 0, size);
            })
        });

        // Legato steals glide instead of fading
        let mut gliding = voice(VoiceStealMode::Legato, 3);
        gliding.note_on(45, 0.9, 8192);
        group.bench_with_input(BenchmarkId::new("legato_steal", size), &size, |b, _| {
            b.iter(|| {
                note = if note == 45 { 52 } else { 45 };
                gliding.note_off(0.0, false);
                gliding.note_on(note, 0.9, 8192);
                buffer.clear();
                gliding.render_block(black_box(&mut buffer), 0, size);
            })
        });
    }

    group.finish();
}
