//! Fidelity score: total Hamming distance between simulated and sampled
//! output over the whole accumulator range. 0 is a bit-exact fit.
//!
//! The 4096 simulations are independent, so they are spread over the
//! rayon pool and reduced by summation.

use rayon::prelude::*;

use crate::params::ParameterSet;
use crate::reference::ReferenceTable;
use crate::simulator::{CombinedWaveform, TABLE_SIZE};
use crate::waveform::WaveformType;

/// Worst possible score: every bit of every sample wrong.
pub const MAX_SCORE: u32 = (TABLE_SIZE * 8) as u32;

/// Number of differing bits between two samples (0..=8).
#[inline]
pub fn bit_errors(a: u8, b: u8) -> u32 {
    (a ^ b).count_ones()
}

/// One row of the diagnostic dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub index: u16,
    pub reference: u8,
    pub predicted: u8,
}

impl SampleReport {
    pub fn bit_errors(&self) -> u32 {
        bit_errors(self.reference, self.predicted)
    }
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub score: u32,
    /// Indexed by accumulator value.
    pub samples: Vec<SampleReport>,
}

pub fn score(params: &ParameterSet, wave: WaveformType, reference: &ReferenceTable) -> u32 {
    let model = CombinedWaveform::new(wave, params);
    (0..TABLE_SIZE as u16)
        .into_par_iter()
        .map(|v| bit_errors(model.sample(v), reference.get(v)))
        .sum()
}

/// Score plus every (index, reference, predicted) triple, in index order.
pub fn score_with_report(
    params: &ParameterSet,
    wave: WaveformType,
    reference: &ReferenceTable,
) -> ScoreReport {
    let model = CombinedWaveform::new(wave, params);
    let samples: Vec<SampleReport> = (0..TABLE_SIZE as u16)
        .into_par_iter()
        .map(|v| SampleReport {
            index: v,
            reference: reference.get(v),
            predicted: model.sample(v),
        })
        .collect();
    let score = samples.iter().map(SampleReport::bit_errors).sum();
    ScoreReport { score, samples }
}

/// The full lookup table an emulator would bake from `params`.
pub fn render_table(wave: WaveformType, params: &ParameterSet) -> ReferenceTable {
    let model = CombinedWaveform::new(wave, params);
    let mut samples = Box::new([0u8; TABLE_SIZE]);
    samples
        .par_iter_mut()
        .enumerate()
        .for_each(|(v, s)| *s = model.sample(v as u16));
    ReferenceTable::from_array(samples)
}
