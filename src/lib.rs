//! Sensor Dataset Library
//!
//! Loads satellite sensor observations (AMSU, ATMS, MHS, IASI, CrIS) from
//! a time-partitioned Parquet catalog and exposes them as fixed-shape
//! numeric samples for a model-training loop.
//!
//! This library provides tools for:
//! - Opening catalog datasets and selecting them by time and variable list
//! - Validating required descriptor columns once, at construction
//! - Converting rows into timestamp/latitude/longitude/metadata samples
//! - Stacking samples into `ndarray` batches

pub mod catalog;
pub mod cli;
pub mod collate;
pub mod config;
pub mod constants;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod models;

pub use catalog::{Catalog, CatalogDataset, LocalCatalog, TimeSelection};
pub use collate::{Batch, collate};
pub use config::{DatasetRequest, LoaderConfig};
pub use dataset::{Batches, SensorDataset};
pub use error::{Result, SensorError};
pub use models::{Sample, SensorType};
