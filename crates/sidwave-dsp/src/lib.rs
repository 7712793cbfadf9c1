//! SID combined-waveform model fitting.
//!
//! Pure math plus the reference-table loader; no CLI or logging backend.

pub mod error;
pub mod params;
pub mod waveform;

// Bus model and scoring
pub mod scorer;
pub mod simulator;

// Search
pub mod optimizer;
pub mod presets;

// Sampled chip data
pub mod reference;

pub use error::FitError;
pub use optimizer::{Improvement, Optimizer, SearchState, StopSignal};
pub use params::ParameterSet;
pub use reference::{ChipId, ReferenceTable};
pub use waveform::WaveformType;
