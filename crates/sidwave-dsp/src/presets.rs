/// Best known fits per sampled chip, as starting points for further search.
///
/// The recorded score is the bit-error total the fit achieved against that
/// chip's own capture.

use crate::params::ParameterSet;
use crate::reference::ChipId;
use crate::waveform::WaveformType;
use crate::waveform::WaveformType::{PulseSaw, PulseSawTriangle, PulseTriangle, SawTriangle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub chip: char,
    pub wave: WaveformType,
    pub params: ParameterSet,
    pub score: u32,
}

#[allow(clippy::too_many_arguments)]
const fn preset(
    chip: char,
    wave: WaveformType,
    score: u32,
    bias: f32,
    pulse_strength: f32,
    top_bit: f32,
    distance: f32,
    st_mix: f32,
) -> Preset {
    Preset {
        chip,
        wave,
        params: ParameterSet {
            bias,
            pulse_strength,
            top_bit,
            distance,
            st_mix,
        },
        score,
    }
}

#[rustfmt::skip]
pub const PRESETS: [Preset; 20] = [
    preset('D', SawTriangle,      280, 0.9347278, 0.0,       0.0,       1.017948,    0.5655234),
    preset('D', PulseTriangle,    600, 0.8931507, 2.483499,  0.0,       0.03339716,  0.0),
    preset('D', PulseSaw,         613, 0.8869214, 2.440879,  1.680824,  0.02267573,  0.0),
    preset('D', PulseSawTriangle,  44, 0.9266459, 0.7393153, 0.0,       0.0598464,   0.1851717),

    preset('E', SawTriangle,      144, 0.9689716, 0.0,       0.0,       1.92,        0.718864),
    preset('E', PulseTriangle,    166, 0.9161022, 1.879311,  0.0,       0.02331964,  0.0),
    preset('E', PulseSaw,          10, 0.879145,  1.30156,   0.0,       0.006426161, 0.0),
    preset('E', PulseSawTriangle,   2, 0.9493611, 0.6681492, 0.0,       0.04524437,  0.1509331),

    preset('G', SawTriangle,      252, 0.9393118, 0.0,       0.0,       1.038816,    0.5292149),
    preset('G', PulseTriangle,    360, 0.8924618, 2.01122,   0.0,       0.03133072,  0.0),
    preset('G', PulseSaw,         668, 0.8952018, 2.213601,  1.705941,  0.01260567,  0.0),
    preset('G', PulseSawTriangle,  14, 0.9322616, 0.6173857, 0.0,       0.06722359,  0.2427691),

    preset('V', SawTriangle,      314, 0.9738218, 0.0,       0.992848,  2.547508,    0.9599405),
    preset('V', PulseTriangle,    628, 0.9236207, 2.19129,   0.0,       0.1108298,   0.0),
    preset('V', PulseSaw,         593, 0.9248214, 2.232846,  0.9491023, 0.1313893,   0.0),
    preset('V', PulseSawTriangle, 168, 0.9845552, 1.380867,  0.9621406, 1.592066,    0.9472086),

    preset('W', SawTriangle,      319, 0.9686383, 0.0,       0.9963791, 2.21016,     0.8968357),
    preset('W', PulseTriangle,    784, 0.9069195, 2.203437,  0.0,       0.129717,    0.0),
    preset('W', PulseSaw,         764, 0.9074827, 2.184185,  0.9717882, 0.1274436,   0.0),
    preset('W', PulseSawTriangle, 213, 0.9882526, 1.729343,  0.9398671, 2.652093,    0.9998723),
];

/// Known fit for `chip` and `wave`, if one has been recorded.
pub fn preset_for(chip: ChipId, wave: WaveformType) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.chip == chip.letter() && p.wave == wave)
}
