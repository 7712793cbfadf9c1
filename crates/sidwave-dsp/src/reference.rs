/// Sampled chip output — the 4096-entry tables the model is fitted to.
///
/// Reference captures are stored one file per waveform (`WAVE3.CSV`,
/// `WAVE5.CSV`, ...). Each of the 4096 rows holds one comma-separated
/// 8-bit value per sampled chip; chip `A` is column 0, `B` column 1, etc.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::FitError;
use crate::simulator::TABLE_SIZE;
use crate::waveform::WaveformType;

/// A sampled chip, identified by its column letter in the reference files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipId(char);

impl ChipId {
    pub fn new(letter: char) -> Result<Self, FitError> {
        if letter.is_ascii_uppercase() {
            Ok(Self(letter))
        } else {
            Err(FitError::InvalidChipIdentifier(letter))
        }
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// Zero-based CSV column for this chip.
    pub fn column(self) -> usize {
        (self.0 as u8 - b'A') as usize
    }
}

impl TryFrom<char> for ChipId {
    type Error = FitError;

    fn try_from(letter: char) -> Result<Self, Self::Error> {
        Self::new(letter)
    }
}

impl std::str::FromStr for ChipId {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::new(c),
            (Some(c), Some(_)) => Err(FitError::InvalidChipIdentifier(c)),
            (None, _) => Err(FitError::InvalidChipIdentifier(' ')),
        }
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exactly [`TABLE_SIZE`] samples indexed by accumulator value. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    samples: Box<[u8; TABLE_SIZE]>,
}

impl ReferenceTable {
    pub fn from_samples(samples: Vec<u8>) -> Result<Self, FitError> {
        let len = samples.len();
        let samples: Box<[u8; TABLE_SIZE]> = samples.into_boxed_slice().try_into().map_err(|_| {
            FitError::malformed(len, format!("expected {TABLE_SIZE} samples, got {len}"))
        })?;
        Ok(Self { samples })
    }

    pub(crate) fn from_array(samples: Box<[u8; TABLE_SIZE]>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn get(&self, accumulator: u16) -> u8 {
        self.samples[accumulator as usize & (TABLE_SIZE - 1)]
    }

    pub fn samples(&self) -> &[u8; TABLE_SIZE] {
        &self.samples
    }

    /// Every sample bit-inverted.
    pub fn complement(&self) -> Self {
        let mut samples = self.samples.clone();
        for s in samples.iter_mut() {
            *s = !*s;
        }
        Self { samples }
    }

    /// Pick `chip`'s column out of a reference capture.
    pub fn parse_csv(text: &str, chip: ChipId) -> Result<Self, FitError> {
        let column = chip.column();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut samples = Vec::with_capacity(TABLE_SIZE);
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record).map_err(csv_error)? {
            let line = record.position().map_or(0, |p| p.line() as usize);
            // Every row has the first row's width, so checking once is enough.
            if samples.is_empty() && column >= record.len() {
                return Err(FitError::InvalidChipIdentifier(chip.letter()));
            }
            let cell = &record[column];
            let value: u8 = cell
                .parse()
                .map_err(|_| FitError::malformed(line, format!("`{cell}` is not a value in 0..=255")))?;
            samples.push(value);
        }

        if samples.len() != TABLE_SIZE {
            return Err(FitError::malformed(
                samples.len(),
                format!("expected {TABLE_SIZE} rows, got {}", samples.len()),
            ));
        }
        Self::from_samples(samples)
    }
}

fn csv_error(err: csv::Error) -> FitError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    match err.kind() {
        csv::ErrorKind::UnequalLengths { expected_len, len, .. } => {
            FitError::malformed(line, format!("expected {expected_len} columns, got {len}"))
        }
        _ => FitError::malformed(line, err.to_string()),
    }
}

/// `dir/WAVE{code:X}.CSV`
pub fn reference_path(dir: &Path, wave: WaveformType) -> PathBuf {
    dir.join(format!("WAVE{:X}.CSV", wave.code()))
}

/// Load the capture of `wave` for `chip` from `dir`.
pub fn load_reference(dir: &Path, wave: WaveformType, chip: ChipId) -> Result<ReferenceTable, FitError> {
    let path = reference_path(dir, wave);
    debug!("reading chip {chip} from {}", path.display());
    let text = fs::read_to_string(&path).map_err(|source| FitError::DataUnavailable {
        path: path.clone(),
        source,
    })?;
    ReferenceTable::parse_csv(&text, chip)
}
