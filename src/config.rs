//! Configuration for catalog access and dataset requests.
//!
//! `LoaderConfig` carries the settings shared by every dataset opened
//! from a catalog (root directory, column names, batch size).
//! `DatasetRequest` describes one dataset to materialize.

use crate::catalog::TimeSelection;
use crate::constants::{
    CATALOG_APP_DIR, CATALOG_DIR_NAME, DEFAULT_BATCH_SIZE, DEFAULT_PRIMARY_DESCRIPTORS,
    LATITUDE_COLUMN, LONGITUDE_COLUMN, TIMESTAMP_COLUMN,
};
use crate::error::{Result, SensorError};
use crate::models::SensorType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Global configuration for loading sensor datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Root directory of the local catalog
    pub catalog_root: PathBuf,

    /// Column holding the observation time
    pub timestamp_column: String,

    /// Column holding latitude
    pub latitude_column: String,

    /// Column holding longitude
    pub longitude_column: String,

    /// Samples per stacked batch
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            catalog_root: default_catalog_root(),
            timestamp_column: TIMESTAMP_COLUMN.to_string(),
            latitude_column: LATITUDE_COLUMN.to_string(),
            longitude_column: LONGITUDE_COLUMN.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// `<data_dir>/nnja/catalog`, falling back to the working directory
pub fn default_catalog_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CATALOG_APP_DIR)
        .join(CATALOG_DIR_NAME)
}

impl LoaderConfig {
    /// Set the catalog root directory
    pub fn with_catalog_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.catalog_root = root.into();
        self
    }

    /// Set the timestamp column name
    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = column.into();
        self
    }

    /// Set the latitude and longitude column names
    pub fn with_position_columns(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.latitude_column = latitude.into();
        self.longitude_column = longitude.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check settings that would otherwise fail late
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SensorError::configuration("batch_size must be at least 1"));
        }
        for (what, column) in [
            ("timestamp", &self.timestamp_column),
            ("latitude", &self.latitude_column),
            ("longitude", &self.longitude_column),
        ] {
            if column.trim().is_empty() {
                return Err(SensorError::configuration(format!(
                    "{what} column name must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// A single dataset to select and materialize from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRequest {
    pub dataset_name: String,
    pub time: TimeSelection,
    pub primary_descriptors: Vec<String>,
    pub additional_variables: Vec<String>,
    pub sensor_type: SensorType,
}

impl DatasetRequest {
    /// Request with the default primary descriptors and no additional variables
    pub fn new(
        dataset_name: impl Into<String>,
        time: TimeSelection,
        sensor_type: SensorType,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            time,
            primary_descriptors: DEFAULT_PRIMARY_DESCRIPTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            additional_variables: Vec::new(),
            sensor_type,
        }
    }

    /// Request from a sensor tag string; unknown tags are rejected here
    pub fn from_tag(
        dataset_name: impl Into<String>,
        time: TimeSelection,
        sensor_tag: &str,
    ) -> Result<Self> {
        let sensor_type = sensor_tag.parse::<SensorType>()?;
        Ok(Self::new(dataset_name, time, sensor_type))
    }

    /// Replace the primary descriptor columns
    pub fn with_primary_descriptors<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_descriptors = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the additional variables appended after the channel columns
    pub fn with_additional_variables<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_variables = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Variables to select: primary descriptors, channels, then additional
    /// variables, without duplicates
    pub fn selected_variables(&self) -> Vec<String> {
        let mut variables: Vec<String> = Vec::new();
        let candidates = self
            .primary_descriptors
            .iter()
            .cloned()
            .chain(self.sensor_type.channel_columns())
            .chain(self.additional_variables.iter().cloned());

        for name in candidates {
            if !variables.contains(&name) {
                variables.push(name);
            }
        }

        debug!(
            "Selecting {} variables for {} dataset '{}'",
            variables.len(),
            self.sensor_type,
            self.dataset_name
        );
        variables
    }
}
