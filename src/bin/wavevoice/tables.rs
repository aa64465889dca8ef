//! Band-unlimited basic shapes for the demo. Good enough for a listening
//! test; a real host would load its own band-limited tables.

use std::f32::consts::TAU;
use std::sync::Arc;

use wavevoice::dsp::{Wavetable, WavetableBank, WavetableError};
use wavevoice::patch::WaveType;

pub const TABLE_SIZE: usize = 2048;

fn shape(wave_type: WaveType) -> fn(f32) -> f32 {
    match wave_type {
        WaveType::Sine => |p| (TAU * p).sin(),
        WaveType::Saw => |p| 1.0 - 2.0 * p,
        WaveType::Ramp => |p| 2.0 * p - 1.0,
        WaveType::Triangle => |p| 1.0 - 4.0 * (p - 0.5).abs(),
        WaveType::Square => |p| if p < 0.5 { 1.0 } else { -1.0 },
    }
}

pub fn standard_bank() -> Result<WavetableBank, WavetableError> {
    let sine = Arc::new(Wavetable::from_fn(TABLE_SIZE, shape(WaveType::Sine))?);
    let mut bank = WavetableBank::new(sine.clone());
    bank.insert(WaveType::Sine, sine);

    for wave_type in [WaveType::Saw, WaveType::Ramp, WaveType::Triangle, WaveType::Square] {
        let table = Wavetable::from_fn(TABLE_SIZE, shape(wave_type))?;
        bank.insert(wave_type, Arc::new(table));
    }
    Ok(bank)
}
