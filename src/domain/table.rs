//! Gamma lookup tables
//!
//! A gamma table maps input intensity levels to corrected output levels with
//! one column per colour channel. Values are normalised to `[0, 1]` and every
//! table carries exactly three channels once parsed.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Number of colour channels in a table (red, green, blue)
pub const CHANNELS: usize = 3;
/// Number of entries per channel in a hardware gamma ramp
pub const RAMP_SIZE: usize = 256;
/// Full-scale value of a hardware ramp entry
pub const RAMP_MAX: f64 = 65535.0;

/// Colour channel of a gamma table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; CHANNELS] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Gamma table is empty")]
    Empty,
    #[error("Gamma table needs at least {min} rows, found {found}")]
    TooFewRows { min: usize, found: usize },
    #[error("Line {line}: expected {expected} columns, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: unsupported column count {found} (expected 1 or 3)")]
    UnsupportedColumns { line: usize, found: usize },
    #[error("Line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },
    #[error("Row {row}, {channel:?} channel: value {value} is outside [0, 1]")]
    OutOfRange {
        row: usize,
        channel: Channel,
        value: f64,
    },
    #[error("Failed to access gamma table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Hardware representation of a gamma table: 3 channels of 256 `u16` entries
///
/// The layout matches what display drivers expect (all red entries, then all
/// green, then all blue), so the raw array can be handed to the OS directly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct GammaRamp {
    channels: [[u16; RAMP_SIZE]; CHANNELS],
}

impl GammaRamp {
    /// Identity ramp (`i * 257` per entry)
    pub fn identity() -> Self {
        let mut channels = [[0u16; RAMP_SIZE]; CHANNELS];
        for channel in channels.iter_mut() {
            for (i, entry) in channel.iter_mut().enumerate() {
                *entry = (i as u16) * 257;
            }
        }
        Self { channels }
    }

    pub fn channel(&self, channel: Channel) -> &[u16; RAMP_SIZE] {
        &self.channels[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut [u16; RAMP_SIZE] {
        &mut self.channels[channel.index()]
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.channels.as_ptr().cast()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u16 {
        self.channels.as_mut_ptr().cast()
    }
}

impl Default for GammaRamp {
    fn default() -> Self {
        Self::identity()
    }
}

/// Per-channel lookup table with values normalised to `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct GammaTable {
    rows: Vec<[f64; CHANNELS]>,
}

impl GammaTable {
    /// Minimum number of rows for a usable table
    pub const MIN_ROWS: usize = 2;

    /// Creates a table from rows, validating size and value range
    pub fn from_rows(rows: Vec<[f64; CHANNELS]>) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Err(TableError::Empty);
        }
        if rows.len() < Self::MIN_ROWS {
            return Err(TableError::TooFewRows {
                min: Self::MIN_ROWS,
                found: rows.len(),
            });
        }

        for (row, values) in rows.iter().enumerate() {
            for channel in Channel::ALL {
                let value = values[channel.index()];
                if !(0.0..=1.0).contains(&value) {
                    return Err(TableError::OutOfRange { row, channel, value });
                }
            }
        }

        Ok(Self { rows })
    }

    /// Linear table of `size` rows (output equals input)
    pub fn identity(size: usize) -> Self {
        let size = size.max(Self::MIN_ROWS);
        let last = (size - 1) as f64;
        let rows = (0..size)
            .map(|i| {
                let v = i as f64 / last;
                [v; CHANNELS]
            })
            .collect();
        Self { rows }
    }

    /// Parses whitespace-delimited text, one row per line
    ///
    /// `#` starts a comment and blank lines are skipped. A single-column
    /// table is broadcast to all three channels.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut rows = Vec::new();
        let mut columns: Option<usize> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = match raw_line.split_once('#') {
                Some((data, _comment)) => data,
                None => raw_line,
            };

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let expected = *columns.get_or_insert(tokens.len());
            if tokens.len() != expected {
                return Err(TableError::RaggedRow {
                    line: line_number,
                    expected,
                    found: tokens.len(),
                });
            }
            if expected != 1 && expected != CHANNELS {
                return Err(TableError::UnsupportedColumns {
                    line: line_number,
                    found: expected,
                });
            }

            let mut values = Vec::with_capacity(expected);
            for token in tokens {
                let value = token
                    .parse::<f64>()
                    .map_err(|_| TableError::InvalidNumber {
                        line: line_number,
                        token: token.to_string(),
                    })?;
                values.push(value);
            }

            let row = if expected == 1 {
                [values[0]; CHANNELS]
            } else {
                [values[0], values[1], values[2]]
            };
            rows.push(row);
        }

        Self::from_rows(rows)
    }

    /// Reads and parses a table file
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let text = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Formats the table with six decimals, space separated
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * 27);
        for row in &self.rows {
            let _ = writeln!(out, "{:.6} {:.6} {:.6}", row[0], row[1], row[2]);
        }
        out
    }

    /// Writes the table to `path` in the text format
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        std::fs::write(path, self.to_text()).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[f64; CHANNELS]] {
        &self.rows
    }

    pub fn channel(&self, channel: Channel) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[channel.index()])
    }

    /// Returns the first place where a channel decreases, if any
    ///
    /// Tables are expected to be non-decreasing but this is not enforced.
    pub fn first_decrease(&self) -> Option<(usize, Channel)> {
        for (row, pair) in self.rows.windows(2).enumerate() {
            for channel in Channel::ALL {
                if pair[1][channel.index()] < pair[0][channel.index()] {
                    return Some((row + 1, channel));
                }
            }
        }
        None
    }

    pub fn is_monotonic(&self) -> bool {
        self.first_decrease().is_none()
    }

    /// Linearly interpolates the table to `size` rows
    pub fn resample(&self, size: usize) -> GammaTable {
        let size = size.max(Self::MIN_ROWS);
        if size == self.rows.len() {
            return self.clone();
        }

        let last_src = (self.rows.len() - 1) as f64;
        let last_dst = (size - 1) as f64;
        let rows = (0..size)
            .map(|i| {
                let position = i as f64 * last_src / last_dst;
                let lower = position.floor() as usize;
                let upper = (lower + 1).min(self.rows.len() - 1);
                let t = position - lower as f64;
                let mut row = [0.0; CHANNELS];
                for (c, value) in row.iter_mut().enumerate() {
                    let a = self.rows[lower][c];
                    let b = self.rows[upper][c];
                    *value = (a + (b - a) * t).clamp(0.0, 1.0);
                }
                row
            })
            .collect();

        GammaTable { rows }
    }

    /// Converts to the hardware ramp, resampling to 256 entries
    pub fn to_ramp(&self) -> GammaRamp {
        let resampled = self.resample(RAMP_SIZE);
        let mut ramp = GammaRamp::identity();
        for channel in Channel::ALL {
            let entries = ramp.channel_mut(channel);
            for (entry, value) in entries.iter_mut().zip(resampled.channel(channel)) {
                *entry = (value * RAMP_MAX).round().clamp(0.0, RAMP_MAX) as u16;
            }
        }
        ramp
    }

    /// Builds a 256-row table from a hardware ramp
    pub fn from_ramp(ramp: &GammaRamp) -> GammaTable {
        let rows = (0..RAMP_SIZE)
            .map(|i| {
                let mut row = [0.0; CHANNELS];
                for channel in Channel::ALL {
                    row[channel.index()] = ramp.channel(channel)[i] as f64 / RAMP_MAX;
                }
                row
            })
            .collect();
        GammaTable { rows }
    }

    /// Largest absolute difference against `other`, compared at this table's size
    pub fn max_deviation(&self, other: &GammaTable) -> f64 {
        let other = other.resample(self.rows.len());
        self.rows
            .iter()
            .zip(other.rows.iter())
            .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()))
            .fold(0.0, f64::max)
    }
}
