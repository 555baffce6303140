use std::io::{self, BufRead, Write};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::ThroughputSample;

pub const HEADER: &str = "Timestamp,Upload Speed (MB/s),Download Speed (MB/s)";

/// Timestamp format of data rows
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format embedded in generated session file names
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const SESSION_PREFIX: &str = "wifi_session_";
pub const SESSION_EXTENSION: &str = ".csv";

const COLUMNS: usize = 3;

/// Why a single data row was rejected
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("expected 3 columns, found {0}")]
    ColumnCount(usize),

    #[error("invalid timestamp {0:?}")]
    Timestamp(String),

    #[error("invalid {field} value {value:?}")]
    Number { field: &'static str, value: String },

    #[error("invalid UTF-8")]
    Encoding,
}

/// A rejected row, with its 1-based line number in the file
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Result of decoding a session file
#[derive(Debug, Default)]
pub struct DecodedSession {
    pub samples: Vec<ThroughputSample>,
    pub skipped: Vec<SkippedRow>,
}

/// Default file name for a session started at `start`
pub fn session_filename(start: NaiveDateTime) -> String {
    format!(
        "{}{}{}",
        SESSION_PREFIX,
        start.format(FILENAME_TIMESTAMP_FORMAT),
        SESSION_EXTENSION
    )
}

pub fn is_session_filename(name: &str) -> bool {
    name.starts_with(SESSION_PREFIX) && name.ends_with(SESSION_EXTENSION)
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(ROW_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, RowError> {
    NaiveDateTime::parse_from_str(value, ROW_TIMESTAMP_FORMAT)
        .map_err(|_| RowError::Timestamp(value.to_string()))
}

/// Write the header and one row per sample
pub fn write_session<W: Write>(mut writer: W, samples: &[ThroughputSample]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;
    for sample in samples {
        writeln!(writer, "{}", encode_row(sample))?;
    }
    writer.flush()
}

pub fn encode_row(sample: &ThroughputSample) -> String {
    format!(
        "{},{:.2},{:.2}",
        format_timestamp(&sample.timestamp),
        sample.upload_mb_per_s,
        sample.download_mb_per_s
    )
}

/// Parse one data row (`timestamp,upload,download`)
pub fn parse_row(line: &str) -> Result<ThroughputSample, RowError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != COLUMNS {
        return Err(RowError::ColumnCount(fields.len()));
    }

    let timestamp = parse_timestamp(fields[0])?;
    let upload = parse_speed("upload", fields[1])?;
    let download = parse_speed("download", fields[2])?;

    Ok(ThroughputSample::new(timestamp, upload, download))
}

fn parse_speed(field: &'static str, value: &str) -> Result<f64, RowError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowError::Number {
            field,
            value: value.to_string(),
        })
}

/// Decode a whole session file. The first line is the header and is not
/// validated; blank lines are ignored; bad rows are collected in `skipped`.
/// Only I/O failures are returned as errors.
pub fn read_session<R: BufRead>(reader: R) -> io::Result<DecodedSession> {
    let mut decoded = DecodedSession::default();

    for (index, raw) in reader.split(b'\n').enumerate().skip(1) {
        let raw = raw?;
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(_) => {
                decoded.skipped.push(SkippedRow {
                    line: index + 1,
                    reason: RowError::Encoding.to_string(),
                });
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line) {
            Ok(sample) => decoded.samples.push(sample),
            Err(e) => decoded.skipped.push(SkippedRow {
                line: index + 1,
                reason: e.to_string(),
            }),
        }
    }

    Ok(decoded)
}
