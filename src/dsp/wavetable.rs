use std::fmt;
use std::sync::Arc;

use crate::patch::WaveType;

/*
Wavetables
==========

A wavetable is one cycle of a waveform stored as N samples. An oscillator
plays it back by walking a read position ("phase") through the table at a
rate proportional to the pitch it wants to produce.

Layout
------

We store N + 1 samples. The extra sample at index N is a copy of index 0:

    index:   0    1    2   ...  N-1    N
    value:  s0   s1   s2   ... sN-1   s0   <- wrap sample

Linear interpolation reads table[i] and table[i + 1]. Without the wrap sample,
reading past the last real sample would need a modulo on every lookup. With
it, any phase in [0, N) has both neighbours in bounds.

Ownership
---------

Tables are immutable once built and shared through `Arc`. Every oscillator
using a given wave type holds a clone of the same `Arc`, so changing the
wave type of an oscillator never copies sample data and never allocates on
the render thread.

Content generation (sine, saw, ...) is not this module's business; callers
hand us a cycle and we close the loop.
*/

/// Errors raised when building a wavetable from caller-provided samples.
#[derive(Debug, Clone, PartialEq)]
pub enum WavetableError {
    /// The cycle contained no samples.
    EmptyCycle,
    /// A sample was NaN or infinite.
    NonFiniteSample { index: usize },
}

impl fmt::Display for WavetableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCycle => write!(f, "wavetable cycle is empty"),
            Self::NonFiniteSample { index } => {
                write!(f, "wavetable sample {index} is not finite")
            }
        }
    }
}

impl std::error::Error for WavetableError {}

/// An immutable single-cycle table with a duplicated wrap sample.
#[derive(Debug, PartialEq)]
pub struct Wavetable {
    samples: Box<[f32]>,
}

impl Wavetable {
    /// Build a table from one cycle of samples, appending the wrap sample.
    pub fn from_cycle(cycle: &[f32]) -> Result<Self, WavetableError> {
        let first = *cycle.first().ok_or(WavetableError::EmptyCycle)?;

        if let Some(index) = cycle.iter().position(|s| !s.is_finite()) {
            return Err(WavetableError::NonFiniteSample { index });
        }

        let mut samples = Vec::with_capacity(cycle.len() + 1);
        samples.extend_from_slice(cycle);
        samples.push(first);

        Ok(Self {
            samples: samples.into_boxed_slice(),
        })
    }

    /// Build an N-sample table by evaluating `f` at normalised phases
    /// `i / N` for `i` in `0..N`.
    ///
    /// ```
    /// use std::f32::consts::TAU;
    /// use wavevoice::dsp::Wavetable;
    ///
    /// let sine = Wavetable::from_fn(1024, |phase| (TAU * phase).sin()).unwrap();
    /// assert_eq!(sine.size(), 1024);
    /// ```
    pub fn from_fn(size: usize, f: impl Fn(f32) -> f32) -> Result<Self, WavetableError> {
        let cycle: Vec<f32> = (0..size).map(|i| f(i as f32 / size as f32)).collect();
        Self::from_cycle(&cycle)
    }

    /// Number of samples in one cycle (excludes the wrap sample).
    pub fn size(&self) -> usize {
        self.samples.len() - 1
    }

    /// All N + 1 samples, wrap sample included.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// Maps a wave type tag to a shared, already normalised wavetable.
pub trait WavetableResolver: Send + Sync {
    fn resolve(&self, wave_type: WaveType) -> Arc<Wavetable>;
}

/// A fixed set of tables, one slot per wave type.
///
/// Slots that were never filled resolve to the fallback table, so every
/// lookup succeeds without allocating.
pub struct WavetableBank {
    tables: [Option<Arc<Wavetable>>; WaveType::COUNT],
    fallback: Arc<Wavetable>,
}

impl WavetableBank {
    pub fn new(fallback: Arc<Wavetable>) -> Self {
        Self {
            tables: Default::default(),
            fallback,
        }
    }

    pub fn with_table(mut self, wave_type: WaveType, table: Arc<Wavetable>) -> Self {
        self.insert(wave_type, table);
        self
    }

    pub fn insert(&mut self, wave_type: WaveType, table: Arc<Wavetable>) {
        self.tables[wave_type.index()] = Some(table);
    }
}

impl WavetableResolver for WavetableBank {
    fn resolve(&self, wave_type: WaveType) -> Arc<Wavetable> {
        self.tables[wave_type.index()]
            .as_ref()
            .unwrap_or(&self.fallback)
            .clone()
    }
}
