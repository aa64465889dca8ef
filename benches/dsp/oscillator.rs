//! Benchmarks for wavetable playback.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavevoice::dsp::{Oscillator, WavetableResolver};
use wavevoice::patch::{OscillatorConfig, WaveType};
use wavevoice::synth::OscillatorSet;

use crate::{bank, BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let bank = bank();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Mid-range note: interpolation plus a wrap every few samples
        let mut osc = Oscillator::new(OscillatorConfig::new(WaveType::Sine), bank.resolve(WaveType::Sine));
        osc.set_sample_rate(SAMPLE_RATE);
        osc.set_note(Some(69));
        group.bench_with_input(BenchmarkId::new("sine_a4", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sample();
                }
                black_box(&buffer);
            })
        });

        // Very high note: increment exceeds the table, modulo path
        let mut osc = Oscillator::new(OscillatorConfig::new(WaveType::Saw), bank.resolve(WaveType::Saw));
        osc.set_sample_rate(SAMPLE_RATE);
        osc.set_note(Some(127));
        group.bench_with_input(BenchmarkId::new("saw_top_note", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sample();
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}

pub fn bench_oscillator_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator_set");
    let bank = bank();

    for count in [1usize, 4, 16] {
        let configs = vec![OscillatorConfig::new(WaveType::Saw); count];
        let mut set = OscillatorSet::from_configs(&configs, bank.as_ref());
        set.set_sample_rate(SAMPLE_RATE);
        set.set_note(Some(45));

        let mut buffer = vec![0.0f32; 256];
        group.bench_with_input(BenchmarkId::new("mix_256", count), &count, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = set.mix();
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
