/// Combined waveform bus model.
///
/// When several waveform generators are selected at once, their outputs
/// short together on the 12 lines feeding the waveform DAC. The lines
/// couple capacitively, so the DAC sees a smeared mix rather than a clean
/// logical AND. This module turns one 12-bit accumulator value into the
/// 8-bit sample the chip actually reads back (the top 8 lines of the bus).
///
/// Signal flow per accumulator value:
///   bits -> top-bit coupling -> triangle fold | saw/tri blend
///        -> bus mixing -> threshold at `bias` -> 8-bit sample

use crate::params::ParameterSet;
use crate::waveform::{WaveFacets, WaveformType};

pub const ACCUMULATOR_BITS: usize = 12;
/// Number of distinct accumulator values (and reference samples).
pub const TABLE_SIZE: usize = 1 << ACCUMULATOR_BITS;

const TOP: usize = ACCUMULATOR_BITS - 1;
/// Lowest bus line visible at the output; lines 4..=11 become bits 0..=7.
const OUTPUT_SHIFT: usize = 4;

/// Per-line bit strengths, 0.0..=1.0 while mixing.
type BitVector12 = [f32; ACCUMULATOR_BITS];

/// A parameter set bound to one waveform type, ready to sample.
///
/// Facets and coupling weights are derived once here so the per-sample
/// path does no decoding.
#[derive(Debug, Clone)]
pub struct CombinedWaveform {
    facets: WaveFacets,
    params: ParameterSet,
    /// Coupling weight indexed by line distance |s - c|, 0..=12.
    weights: [f32; ACCUMULATOR_BITS + 1],
}

impl CombinedWaveform {
    pub fn new(wave: WaveformType, params: &ParameterSet) -> Self {
        let mut weights = [0.0f32; ACCUMULATOR_BITS + 1];
        for (i, w) in weights.iter_mut().enumerate() {
            *w = 1.0 / (1.0 + (i * i) as f32 * params.distance);
        }
        Self {
            facets: wave.facets(),
            params: *params,
            weights,
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Predicted 8-bit output for one accumulator value (upper bits ignored).
    pub fn sample(&self, accumulator: u16) -> u8 {
        let acc = accumulator as usize & (TABLE_SIZE - 1);

        let mut bits: BitVector12 = [0.0; ACCUMULATOR_BITS];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = if acc & (1 << i) != 0 { 1.0 } else { 0.0 };
        }
        bits[TOP] *= self.params.top_bit;

        if self.facets.triangle {
            fold_triangle(&mut bits, acc & (1 << TOP) != 0);
        }
        if self.facets.saw_triangle {
            blend_saw_triangle(&mut bits, self.params.st_mix);
        }

        let mixed = self.mix(&bits);
        self.threshold(&mixed)
    }

    /// Capacitive coupling between bus lines.
    ///
    /// Each line becomes the mean of its own level and the weighted average
    /// of every line (plus the pulse line, when present). Reads only from
    /// `bits`, writes only into the returned buffer.
    fn mix(&self, bits: &BitVector12) -> BitVector12 {
        let mut out: BitVector12 = [0.0; ACCUMULATOR_BITS];
        for s in 0..ACCUMULATOR_BITS {
            let mut n = 0.0f32;
            let mut avg = 0.0f32;
            for c in 0..ACCUMULATOR_BITS {
                let weight = self.weights[s.abs_diff(c)];
                avg += bits[c] * weight;
                n += weight;
            }
            if self.facets.pulse {
                // Pulse sits one line above the top accumulator bit.
                let weight = self.weights[ACCUMULATOR_BITS - s];
                avg += self.params.pulse_strength * weight;
                n += weight;
            }
            out[s] = (bits[s] + avg / n) * 0.5;
        }
        out
    }

    fn threshold(&self, mixed: &BitVector12) -> u8 {
        let mut result = 0u8;
        for cb in 0..8 {
            if mixed[OUTPUT_SHIFT + cb] > self.params.bias {
                result |= 1 << cb;
            }
        }
        result
    }
}

/// Triangle generator: shift up one line, inverting when the MSB is set.
fn fold_triangle(bits: &mut BitVector12, top: bool) {
    for i in (1..ACCUMULATOR_BITS).rev() {
        bits[i] = if top { 1.0 - bits[i - 1] } else { bits[i - 1] };
    }
    bits[0] = 0.0;
}

/// Sawtooth/triangle blend: each line interpolates toward the line below.
fn blend_saw_triangle(bits: &mut BitVector12, st_mix: f32) {
    for i in (1..ACCUMULATOR_BITS).rev() {
        bits[i] = bits[i - 1] * (1.0 - st_mix) + bits[i] * st_mix;
    }
    bits[0] *= st_mix;
}

/// One-shot simulation. Prefer [`CombinedWaveform`] when sampling many values.
pub fn simulate(accumulator: u16, wave: WaveformType, params: &ParameterSet) -> u8 {
    CombinedWaveform::new(wave, params).sample(accumulator)
}
