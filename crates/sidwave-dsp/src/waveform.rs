/// Combined waveform selection — which oscillator outputs share the bus.
///
/// The control-register waveform nibble is a bit set: 1 = triangle,
/// 2 = sawtooth, 4 = pulse. Only the four multi-waveform combinations that
/// produce analog (non-AND) output are modelled here.

use std::fmt;
use std::str::FromStr;

use crate::error::FitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveformType {
    /// 3: sawtooth + triangle.
    SawTriangle,
    /// 5: pulse + triangle.
    PulseTriangle,
    /// 6: pulse + sawtooth.
    PulseSaw,
    /// 7: pulse + sawtooth + triangle.
    PulseSawTriangle,
}

/// The three branches of the bus model, decoded from the waveform code.
///
/// These are the raw bit tests on the code, not a clean partition:
/// code 5 (`0b101`) folds the triangle, code 7 (`0b111`) blends instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFacets {
    /// Accumulator folded about its midpoint (`code & 3 == 1`).
    pub triangle: bool,
    /// Sawtooth/triangle analog blend (`code & 3 == 3`).
    pub saw_triangle: bool,
    /// Pulse output drives a virtual 13th bus line (`code > 4`).
    pub pulse: bool,
}

impl WaveformType {
    pub const ALL: [WaveformType; 4] = [
        WaveformType::SawTriangle,
        WaveformType::PulseTriangle,
        WaveformType::PulseSaw,
        WaveformType::PulseSawTriangle,
    ];

    pub fn code(self) -> u8 {
        match self {
            WaveformType::SawTriangle => 3,
            WaveformType::PulseTriangle => 5,
            WaveformType::PulseSaw => 6,
            WaveformType::PulseSawTriangle => 7,
        }
    }

    pub fn facets(self) -> WaveFacets {
        let code = self.code();
        WaveFacets {
            triangle: code & 3 == 1,
            saw_triangle: code & 3 == 3,
            pulse: code > 4,
        }
    }
}

impl TryFrom<u8> for WaveformType {
    type Error = FitError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            3 => Ok(WaveformType::SawTriangle),
            5 => Ok(WaveformType::PulseTriangle),
            6 => Ok(WaveformType::PulseSaw),
            7 => Ok(WaveformType::PulseSawTriangle),
            other => Err(FitError::InvalidWaveformType(other.to_string())),
        }
    }
}

impl FromStr for WaveformType {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        let value: u8 = code
            .parse()
            .map_err(|_| FitError::InvalidWaveformType(code.to_string()))?;
        WaveformType::try_from(value)
    }
}

impl fmt::Display for WaveformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
