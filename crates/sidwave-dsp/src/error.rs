//! Error taxonomy for startup validation and reference loading.
//!
//! Everything here is raised before a search begins. The simulator, scorer
//! and optimizer are total over their inputs and never return these.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("invalid waveform type '{0}': expected one of 3, 5, 6, 7")]
    InvalidWaveformType(String),

    #[error("invalid chip identifier '{0}': no matching reference column")]
    InvalidChipIdentifier(char),

    #[error("reference data unavailable at {path}: {source}")]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },
}

impl FitError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}
