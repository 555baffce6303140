use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Bytes in one megabyte (binary, 1024 * 1024)
pub const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

/// Convert a byte count to megabytes
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MEGABYTE
}

/// Convert a byte count to megabits
pub fn bytes_to_megabits(bytes: u64) -> f64 {
    bytes as f64 * 8.0 / BYTES_PER_MEGABYTE
}

pub fn megabytes_to_megabits(megabytes: f64) -> f64 {
    megabytes * 8.0
}

pub fn megabits_to_megabytes(megabits: f64) -> f64 {
    megabits / 8.0
}

/// One throughput measurement, in MB/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Local wall-clock time of the measurement
    pub timestamp: NaiveDateTime,
    pub upload_mb_per_s: f64,
    pub download_mb_per_s: f64,
}

impl ThroughputSample {
    pub fn new(timestamp: NaiveDateTime, upload_mb_per_s: f64, download_mb_per_s: f64) -> Self {
        Self {
            timestamp,
            upload_mb_per_s,
            download_mb_per_s,
        }
    }

    pub fn upload_mbit_per_s(&self) -> f64 {
        megabytes_to_megabits(self.upload_mb_per_s)
    }

    pub fn download_mbit_per_s(&self) -> f64 {
        megabytes_to_megabits(self.download_mb_per_s)
    }

    /// Copy of this sample with both speeds expressed in `unit`
    pub fn in_unit(&self, unit: SpeedUnit) -> ConvertedSample {
        ConvertedSample {
            timestamp: self.timestamp,
            upload: unit.convert(self.upload_mb_per_s),
            download: unit.convert(self.download_mb_per_s),
            unit,
        }
    }
}

/// Sample with speeds in a caller-chosen unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvertedSample {
    pub timestamp: NaiveDateTime,
    pub upload: f64,
    pub download: f64,
    pub unit: SpeedUnit,
}

/// Primary unit used when presenting speeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[default]
    #[serde(rename = "MB/s", alias = "mbs")]
    MegabytesPerSecond,
    #[serde(rename = "Mbps", alias = "mbps")]
    MegabitsPerSecond,
}

impl SpeedUnit {
    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::MegabytesPerSecond => "MB/s",
            SpeedUnit::MegabitsPerSecond => "Mbps",
        }
    }

    pub fn other(&self) -> SpeedUnit {
        match self {
            SpeedUnit::MegabytesPerSecond => SpeedUnit::MegabitsPerSecond,
            SpeedUnit::MegabitsPerSecond => SpeedUnit::MegabytesPerSecond,
        }
    }

    pub fn convert(&self, mb_per_s: f64) -> f64 {
        match self {
            SpeedUnit::MegabytesPerSecond => mb_per_s,
            SpeedUnit::MegabitsPerSecond => megabytes_to_megabits(mb_per_s),
        }
    }

    /// Render a MB/s speed as `"<primary> (<secondary>)"`, e.g. `"1.00 MB/s (8.00 Mbps)"`
    pub fn format(&self, mb_per_s: f64) -> String {
        let secondary = self.other();
        format!(
            "{:.2} {} ({:.2} {})",
            self.convert(mb_per_s),
            self.label(),
            secondary.convert(mb_per_s),
            secondary.label()
        )
    }
}
