//! Map-style sensor dataset over a materialized catalog selection.
//!
//! `SensorDataset::open` runs the whole catalog query once: open by name,
//! load the manifest, select the time window and the sensor's variables,
//! then materialize. The frame is converted once into typed columns and
//! dropped; `get` assembles one row into a [`Sample`] on every call.

use crate::catalog::Catalog;
use crate::collate::{Batch, collate};
use crate::config::{DatasetRequest, LoaderConfig};
use crate::convert::{float_values, timestamp_seconds};
use crate::error::{Result, SensorError};
use crate::models::{DatasetSummary, Sample, SensorType};
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// Observations of one sensor type, exposed as fixed-shape samples
#[derive(Debug)]
pub struct SensorDataset {
    dataset_name: String,
    sensor_type: SensorType,
    primary_descriptors: Vec<String>,
    metadata_columns: Vec<String>,
    partitions_selected: usize,
    rows: usize,
    timestamps: Vec<f64>,
    latitudes: Vec<f32>,
    longitudes: Vec<f32>,
    metadata: Vec<Vec<f32>>,
}

impl SensorDataset {
    /// Query `catalog` for `request` and validate the result
    ///
    /// Fails with a configuration error if a primary descriptor, or the
    /// timestamp/latitude/longitude column, is absent after selection.
    pub fn open(
        catalog: &dyn Catalog,
        config: &LoaderConfig,
        request: &DatasetRequest,
    ) -> Result<Self> {
        config.validate()?;
        if request.primary_descriptors.is_empty() {
            return Err(SensorError::configuration(
                "at least one primary descriptor column is required",
            ));
        }

        let mut handle = catalog.open(&request.dataset_name)?;
        handle.load_manifest()?;
        handle.sel(&request.time, &request.selected_variables())?;
        let frame = handle.load_dataset()?;

        Self::from_frame(frame, config, request, handle.partitions_selected())
    }

    /// Validate and index an already materialized frame
    pub fn from_frame(
        frame: DataFrame,
        config: &LoaderConfig,
        request: &DatasetRequest,
        partitions_selected: usize,
    ) -> Result<Self> {
        let columns: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        for column in request.primary_descriptors.iter().chain([
            &config.timestamp_column,
            &config.latitude_column,
            &config.longitude_column,
        ]) {
            if !columns.contains(column) {
                return Err(SensorError::MissingColumn {
                    column: column.clone(),
                });
            }
        }

        let metadata_columns: Vec<String> = columns
            .into_iter()
            .filter(|name| !request.primary_descriptors.contains(name))
            .collect();

        let timestamps = timestamp_seconds(&frame, &config.timestamp_column)?;
        let latitudes = float_values(&frame, &config.latitude_column)?;
        let longitudes = float_values(&frame, &config.longitude_column)?;
        let metadata = metadata_columns
            .iter()
            .map(|name| float_values(&frame, name))
            .collect::<Result<Vec<_>>>()?;

        let expected = request.sensor_type.channel_count();
        if metadata_columns.len() < expected {
            debug!(
                "{} dataset '{}' exposes {} metadata columns, fewer than its {} channels",
                request.sensor_type,
                request.dataset_name,
                metadata_columns.len(),
                expected
            );
        }

        info!(
            "Loaded {} dataset '{}': {} samples, metadata width {}",
            request.sensor_type,
            request.dataset_name,
            frame.height(),
            metadata_columns.len()
        );

        Ok(Self {
            dataset_name: request.dataset_name.clone(),
            sensor_type: request.sensor_type,
            primary_descriptors: request.primary_descriptors.clone(),
            metadata_columns,
            partitions_selected,
            rows: frame.height(),
            timestamps,
            latitudes,
            longitudes,
            metadata,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`
    pub fn get(&self, index: usize) -> Result<Sample> {
        if index >= self.len() {
            return Err(SensorError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        Ok(self.sample_at(index))
    }

    /// All samples in row order
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).map(|index| self.sample_at(index))
    }

    /// `index` must be below `len()`
    fn sample_at(&self, index: usize) -> Sample {
        Sample {
            timestamp: self.timestamps[index],
            latitude: self.latitudes[index],
            longitude: self.longitudes[index],
            metadata: self.metadata.iter().map(|column| column[index]).collect(),
        }
    }

    /// Stacked batches of `batch_size` samples in row order; the last may be short
    pub fn batches(&self, batch_size: usize) -> Result<Batches<'_>> {
        if batch_size == 0 {
            return Err(SensorError::configuration("batch_size must be at least 1"));
        }
        Ok(Batches {
            dataset: self,
            batch_size,
            next: 0,
        })
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn primary_descriptors(&self) -> &[String] {
        &self.primary_descriptors
    }

    /// Columns packed into each sample's metadata vector, in order
    pub fn metadata_columns(&self) -> &[String] {
        &self.metadata_columns
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            dataset_name: self.dataset_name.clone(),
            sensor_type: self.sensor_type,
            rows: self.len(),
            metadata_width: self.metadata_columns.len(),
            partitions_selected: self.partitions_selected,
        }
    }
}

/// Iterator over stacked batches of a [`SensorDataset`]
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a SensorDataset,
    batch_size: usize,
    next: usize,
}

impl Batches<'_> {
    /// Total number of batches, counting a short final batch
    pub fn batch_count(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.dataset.len();
        if self.next >= len {
            return None;
        }

        let end = (self.next + self.batch_size).min(len);
        let samples = (self.next..end)
            .map(|index| self.dataset.get(index))
            .collect::<Result<Vec<_>>>();
        self.next = end;

        Some(samples.and_then(|samples| collate(&samples)))
    }
}
