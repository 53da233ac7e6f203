//! Batch stacking of samples.
//!
//! Every sample field is stacked along a new leading axis, preserving
//! input order. An empty input or samples with differing metadata
//! lengths are rejected rather than padded.

use crate::constants::SAMPLE_FIELDS;
use crate::error::{Result, SensorError};
use crate::models::Sample;
use ndarray::{Array1, Array2, ArrayView1};

/// Stacked fields of `N` samples
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Shape `(N,)`
    pub timestamp: Array1<f64>,
    /// Shape `(N,)`
    pub latitude: Array1<f32>,
    /// Shape `(N,)`
    pub longitude: Array1<f32>,
    /// Shape `(N, M)` where `M` is the metadata width
    pub metadata: Array2<f32>,
}

impl Batch {
    /// Number of stacked samples
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata_width(&self) -> usize {
        self.metadata.ncols()
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        SAMPLE_FIELDS
    }

    /// Shape of each stacked field, keyed by field name
    pub fn shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        vec![
            ("timestamp", self.timestamp.shape().to_vec()),
            ("latitude", self.latitude.shape().to_vec()),
            ("longitude", self.longitude.shape().to_vec()),
            ("metadata", self.metadata.shape().to_vec()),
        ]
    }

    /// Metadata row of the sample at `index`
    pub fn metadata_row(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.len()).then(|| self.metadata.row(index))
    }

    /// The sample at `index`, unstacked
    pub fn sample(&self, index: usize) -> Option<Sample> {
        let metadata = self.metadata_row(index)?.to_vec();
        Some(Sample {
            timestamp: self.timestamp[index],
            latitude: self.latitude[index],
            longitude: self.longitude[index],
            metadata,
        })
    }
}

/// Stack `samples` into one [`Batch`]
pub fn collate(samples: &[Sample]) -> Result<Batch> {
    let first = samples.first().ok_or(SensorError::EmptyBatch)?;
    let width = first.metadata_len();

    if let Some((index, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, sample)| sample.metadata_len() != width)
    {
        return Err(SensorError::InconsistentBatch {
            index,
            expected: width,
            found: sample.metadata_len(),
        });
    }

    let flat: Vec<f32> = samples
        .iter()
        .flat_map(|sample| sample.metadata.iter().copied())
        .collect();

    Ok(Batch {
        timestamp: samples.iter().map(|s| s.timestamp).collect(),
        latitude: samples.iter().map(|s| s.latitude).collect(),
        longitude: samples.iter().map(|s| s.longitude).collect(),
        metadata: Array2::from_shape_vec((samples.len(), width), flat)?,
    })
}
