//! Core data structures and types for sensor dataset loading.
//!
//! Defines the supported sensor types with their channel layouts and the
//! per-row sample produced for a training loop.

use crate::constants::channels::*;
use crate::error::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensor types supported by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Amsu,
    Atms,
    Mhs,
    Iasi,
    Cris,
}

impl SensorType {
    pub const ALL: [SensorType; 5] = [
        SensorType::Amsu,
        SensorType::Atms,
        SensorType::Mhs,
        SensorType::Iasi,
        SensorType::Cris,
    ];

    /// Canonical tag as used in catalog dataset names
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Amsu => "AMSU",
            SensorType::Atms => "ATMS",
            SensorType::Mhs => "MHS",
            SensorType::Iasi => "IASI",
            SensorType::Cris => "CrIS",
        }
    }

    /// Number of channel columns selected for this sensor type
    pub fn channel_count(&self) -> usize {
        match self {
            SensorType::Amsu => AMSU_CHANNELS,
            SensorType::Atms => ATMS_CHANNELS,
            SensorType::Mhs => MHS_CHANNELS,
            SensorType::Iasi => IASI_CHANNELS,
            SensorType::Cris => CRIS_CHANNELS,
        }
    }

    /// Column prefix of this sensor's channel variables
    pub fn channel_prefix(&self) -> &'static str {
        match self {
            SensorType::Amsu | SensorType::Atms | SensorType::Mhs => BRIGHTNESS_TEMPERATURE_PREFIX,
            SensorType::Iasi => SCALED_RADIANCE_PREFIX,
            SensorType::Cris => SPECTRAL_RADIANCE_PREFIX,
        }
    }

    /// Channel column names, 1-based and zero-padded (`TMBR_00001`, ...)
    pub fn channel_columns(&self) -> Vec<String> {
        let prefix = self.channel_prefix();
        (1..=self.channel_count())
            .map(|i| format!("{prefix}{i:0width$}", width = CHANNEL_INDEX_WIDTH))
            .collect()
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self> {
        SensorType::ALL
            .into_iter()
            .find(|sensor| sensor.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SensorError::UnsupportedSensor {
                sensor: s.to_string(),
            })
    }
}

/// One observation row converted to numeric form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub latitude: f32,
    pub longitude: f32,
    /// All non-primary selected columns, in frame order
    pub metadata: Vec<f32>,
}

impl Sample {
    /// Length of the metadata vector
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }
}

/// Summary of a loaded dataset for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub dataset_name: String,
    pub sensor_type: SensorType,
    pub rows: usize,
    pub metadata_width: usize,
    pub partitions_selected: usize,
}
