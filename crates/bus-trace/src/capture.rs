//! Logic-analyzer CSV captures.
//!
//! Exports start with free-form comment lines, then a header beginning with
//! `Time(s)`, then one row per sample. Signal columns hold `0`, `1` or `?`
//! for an unknown level.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const TIME_COLUMN: &str = "Time(s)";
const DATA_COLUMNS: [&str; 8] = ["D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7"];
const STATUS_COLUMNS: [&str; 3] = ["S0", "S1", "S2"];
const ENABLE_COLUMN: &str = "CP_D_EN";

/// Capture could not be read or parsed. Line numbers are 1-based file lines.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// File could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Capture path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// No line starts with `Time(s)`.
    #[error("no header line starting with 'Time(s)'")]
    MissingHeader,
    /// A required signal column is absent from the header.
    #[error("header has no '{column}' column")]
    MissingColumn {
        /// Column name.
        column: &'static str,
    },
    /// A row is short or holds an unparseable value.
    #[error("line {line}: {message}")]
    MalformedRow {
        /// Offending line.
        line: usize,
        /// What was wrong.
        message: String,
    },
}

/// One analyzer sample. `None` marks a signal the analyzer reported as unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// File line the sample came from.
    pub line: usize,
    /// Sample time in seconds.
    pub time_s: f64,
    /// D7..D0; `None` if any bit was unknown.
    pub data: Option<u8>,
    /// `S2 S1 S0`; `None` if any bit was unknown.
    pub status: Option<u8>,
    /// SYNC level.
    pub sync: Option<bool>,
    /// INT level.
    pub int: Option<bool>,
    /// Data-bus enable of the CPU board, when captured.
    pub cp_d_en: Option<bool>,
}

impl Sample {
    /// Sample time in microseconds.
    #[must_use]
    pub fn time_us(&self) -> f64 {
        self.time_s * 1e6
    }
}

/// Parsed capture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capture {
    /// Samples in file order.
    pub samples: Vec<Sample>,
    /// The capture carried a `CP_D_EN` column.
    pub has_enable: bool,
}

struct Columns {
    time: usize,
    data: [usize; 8],
    status: [usize; 3],
    sync: usize,
    int: usize,
    enable: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, CaptureError> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |column: &'static str| {
            names
                .iter()
                .position(|name| *name == column)
                .ok_or(CaptureError::MissingColumn { column })
        };
        let mut data = [0; 8];
        for (slot, column) in data.iter_mut().zip(DATA_COLUMNS) {
            *slot = find(column)?;
        }
        let mut status = [0; 3];
        for (slot, column) in status.iter_mut().zip(STATUS_COLUMNS) {
            *slot = find(column)?;
        }
        Ok(Self {
            time: find(TIME_COLUMN)?,
            data,
            status,
            sync: find("SYNC")?,
            int: find("INT")?,
            enable: find(ENABLE_COLUMN).ok(),
        })
    }

    fn parse_row(&self, line: usize, row: &str) -> Result<Sample, CaptureError> {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        let field = |index: usize| {
            fields
                .get(index)
                .copied()
                .ok_or_else(|| CaptureError::MalformedRow {
                    line,
                    message: format!("expected at least {} fields", index + 1),
                })
        };
        let level = |index: usize| -> Result<Option<bool>, CaptureError> {
            match field(index)? {
                "0" => Ok(Some(false)),
                "1" => Ok(Some(true)),
                "?" => Ok(None),
                other => Err(CaptureError::MalformedRow {
                    line,
                    message: format!("invalid signal level '{other}'"),
                }),
            }
        };
        let raw_time = field(self.time)?;
        let time_s = raw_time
            .parse::<f64>()
            .map_err(|_| CaptureError::MalformedRow {
                line,
                message: format!("invalid time '{raw_time}'"),
            })?;

        let mut data = Some(0_u8);
        for (bit, index) in self.data.iter().enumerate() {
            let bit_level = level(*index)?;
            data = data.zip(bit_level).map(|(value, high)| value | (u8::from(high) << bit));
        }
        let mut status = Some(0_u8);
        for (bit, index) in self.status.iter().enumerate() {
            let bit_level = level(*index)?;
            status = status.zip(bit_level).map(|(value, high)| value | (u8::from(high) << bit));
        }

        Ok(Sample {
            line,
            time_s,
            data,
            status,
            sync: level(self.sync)?,
            int: level(self.int)?,
            cp_d_en: match self.enable {
                Some(index) => level(index)?,
                None => None,
            },
        })
    }
}

/// Parses capture text.
///
/// # Errors
///
/// Returns [`CaptureError`] for a missing header or column, or a malformed row.
pub fn parse_capture(text: &str) -> Result<Capture, CaptureError> {
    let mut lines = text.lines().enumerate();
    let header = lines
        .by_ref()
        .find_map(|(_, line)| line.starts_with("Time").then_some(line))
        .ok_or(CaptureError::MissingHeader)?;
    let columns = Columns::from_header(header)?;

    let mut samples = Vec::new();
    for (index, row) in lines {
        if row.trim().is_empty() {
            continue;
        }
        samples.push(columns.parse_row(index + 1, row)?);
    }
    Ok(Capture {
        samples,
        has_enable: columns.enable.is_some(),
    })
}

/// Reads and parses a capture file.
///
/// # Errors
///
/// Returns [`CaptureError::Io`] when the file cannot be read, otherwise as
/// [`parse_capture`].
pub fn read_capture(path: &Path) -> Result<Capture, CaptureError> {
    let text = fs::read_to_string(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capture(&text)
}

#[cfg(test)]
mod tests {
    use super::{parse_capture, CaptureError};

    const HEADER: &str = "Time(s), D0, D1, D2, D3, D4, D5, D6, D7, INT, S0, S1, S2, SYNC";

    #[test]
    fn skips_preamble_and_decodes_signals() {
        let text = format!(
            "Analyzer export\nSample rate 10MHz\n{HEADER}\n\
             0.000001, 1, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1\n\
             \n\
             0.000002, ?, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, ?, 0\n"
        );
        let capture = parse_capture(&text).unwrap();
        assert!(!capture.has_enable);
        assert_eq!(capture.samples.len(), 2);

        let first = capture.samples[0];
        assert_eq!(first.line, 4);
        assert_eq!(first.data, Some(0x85));
        assert_eq!(first.status, Some(0b010));
        assert_eq!(first.sync, Some(true));
        assert_eq!(first.int, Some(false));
        assert!((first.time_us() - 1.0).abs() < 1e-9);

        let second = capture.samples[1];
        assert_eq!(second.line, 6);
        assert_eq!(second.data, None);
        assert_eq!(second.status, None);
        assert_eq!(second.int, Some(true));
    }

    #[test]
    fn optional_enable_column_is_read() {
        let text = format!("{HEADER}, CP_D_EN\n0.0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1\n");
        let capture = parse_capture(&text).unwrap();
        assert!(capture.has_enable);
        assert_eq!(capture.samples[0].cp_d_en, Some(true));
    }

    #[test]
    fn structural_problems_are_reported() {
        assert!(matches!(
            parse_capture("no header here\n"),
            Err(CaptureError::MissingHeader)
        ));
        assert!(matches!(
            parse_capture("Time(s), D0, D1\n"),
            Err(CaptureError::MissingColumn { column: "D2" })
        ));
        let short = format!("{HEADER}\n0.0, 1, 1\n");
        assert!(matches!(
            parse_capture(&short),
            Err(CaptureError::MalformedRow { line: 2, .. })
        ));
        let bad_level = format!("{HEADER}\n0.0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0\n");
        assert!(matches!(
            parse_capture(&bad_level),
            Err(CaptureError::MalformedRow { line: 2, .. })
        ));
    }
}
