//! Observation catalog access.
//!
//! A catalog serves named collections of sensor observations. Each
//! collection is opened by name, its manifest loaded, narrowed by time
//! and variable list, and finally materialized into a polars `DataFrame`.
//!
//! `LocalCatalog` implements this over a directory tree:
//! ```text
//! <root>/
//!   amsua-1bamua-NC021023/
//!     OBS_DATE=2021-01-01/
//!       part-0.parquet
//!       part-1.parquet
//!     OBS_DATE=2021-01-02/
//!       part-0.parquet
//!   atms-atms-NC021203/
//!     ...
//! ```

use crate::config::LoaderConfig;
use crate::constants::{PARTITION_DATE_FORMAT, PARTITION_FILE_PATTERN, PARTITION_PREFIX};
use crate::convert::timestamp_seconds;
use crate::error::{Result, SensorError};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Time restriction applied when selecting from a catalog dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSelection {
    /// The whole daily partition containing this instant
    At(DateTime<Utc>),
    /// Rows with `start <= timestamp < end`
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeSelection {
    /// Half-open range selection; `start` must precede `end`
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(SensorError::configuration(format!(
                "time range start {start} must be before end {end}"
            )));
        }
        Ok(TimeSelection::Range { start, end })
    }

    /// Whether the daily partition for `date` can hold selected rows
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        match self {
            TimeSelection::At(instant) => instant.date_naive() == date,
            TimeSelection::Range { start, end } => {
                let day_start = date.and_time(NaiveTime::MIN).and_utc();
                let day_end = day_start + Duration::days(1);
                day_start < *end && *start < day_end
            }
        }
    }

    /// Epoch-second bounds for row filtering, if any
    fn row_bounds(&self) -> Option<(f64, f64)> {
        match self {
            TimeSelection::At(_) => None,
            TimeSelection::Range { start, end } => {
                Some((epoch_seconds(start), epoch_seconds(end)))
            }
        }
    }
}

fn epoch_seconds(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, PARTITION_DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(SensorError::configuration(format!(
        "could not parse '{s}' as an RFC 3339 timestamp or YYYY-MM-DD date"
    )))
}

impl FromStr for TimeSelection {
    type Err = SensorError;

    /// Accepts `<instant>` or `<start>..<end>`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once("..") {
            Some((start, end)) => {
                TimeSelection::range(parse_instant(start)?, parse_instant(end)?)
            }
            None => Ok(TimeSelection::At(parse_instant(s)?)),
        }
    }
}

impl fmt::Display for TimeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSelection::At(instant) => write!(f, "{}", instant.to_rfc3339()),
            TimeSelection::Range { start, end } => {
                write!(f, "{}..{}", start.to_rfc3339(), end.to_rfc3339())
            }
        }
    }
}

/// A store of named observation collections
pub trait Catalog {
    /// Open a collection by name; the manifest is not loaded yet
    fn open(&self, name: &str) -> Result<Box<dyn CatalogDataset>>;

    /// Names of all collections in the catalog
    fn list(&self) -> Result<Vec<String>>;
}

/// One named collection inside a catalog
pub trait CatalogDataset: Send + Sync {
    fn name(&self) -> &str;

    /// Discover partitions and variables
    fn load_manifest(&mut self) -> Result<()>;

    /// All variables available in the collection; requires the manifest
    fn variables(&self) -> Result<Vec<String>>;

    /// Narrow the collection to a time selection and variable list
    fn sel(&mut self, time: &TimeSelection, variables: &[String]) -> Result<()>;

    /// Number of partitions matched by the current selection
    fn partitions_selected(&self) -> usize;

    /// Materialize the current selection
    fn load_dataset(&self) -> Result<DataFrame>;
}

/// Catalog backed by a local directory of partitioned parquet datasets
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
    timestamp_column: String,
}

impl LocalCatalog {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            root: config.catalog_root.clone(),
            timestamp_column: config.timestamp_column.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Catalog for LocalCatalog {
    fn open(&self, name: &str) -> Result<Box<dyn CatalogDataset>> {
        let path = self.root.join(name);
        if !path.is_dir() {
            return Err(SensorError::DatasetNotFound {
                name: name.to_string(),
                path,
            });
        }

        debug!("Opened catalog dataset '{}' at {}", name, path.display());
        Ok(Box::new(LocalDataset::new(
            name.to_string(),
            path,
            self.timestamp_column.clone(),
        )))
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(SensorError::configuration(format!(
                "catalog root not found at {}",
                self.root.display()
            )));
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                SensorError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("catalog directory traversal failed")
                }))
            })?;
            if entry.file_type().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// One daily partition of a dataset
#[derive(Debug, Clone)]
pub struct Partition {
    pub date: NaiveDate,
    pub files: Vec<PathBuf>,
}

/// Partitions and merged schema of a dataset
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub partitions: Vec<Partition>,
    pub schema: Schema,
}

impl Manifest {
    pub fn variables(&self) -> Vec<String> {
        self.schema.iter_names().map(|s| s.to_string()).collect()
    }
}

#[derive(Debug, Clone)]
struct Selection {
    time: TimeSelection,
    variables: Vec<String>,
    partitions: Vec<Partition>,
}

/// A dataset directory in a `LocalCatalog`
#[derive(Debug)]
pub struct LocalDataset {
    name: String,
    path: PathBuf,
    timestamp_column: String,
    manifest: Option<Manifest>,
    selection: Option<Selection>,
}

impl LocalDataset {
    fn new(name: String, path: PathBuf, timestamp_column: String) -> Self {
        Self {
            name,
            path,
            timestamp_column,
            manifest: None,
            selection: None,
        }
    }

    pub fn manifest(&self) -> Result<&Manifest> {
        self.manifest.as_ref().ok_or_else(|| {
            SensorError::configuration(format!(
                "manifest for dataset '{}' has not been loaded",
                self.name
            ))
        })
    }

    /// Parse `OBS_DATE=YYYY-MM-DD` into its date
    fn partition_date(dir_name: &str) -> Option<NaiveDate> {
        let date = dir_name.strip_prefix(PARTITION_PREFIX)?;
        NaiveDate::parse_from_str(date, PARTITION_DATE_FORMAT).ok()
    }

    fn partition_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = dir.join(PARTITION_FILE_PATTERN);
        let pattern_str = pattern.to_string_lossy();

        let mut files = Vec::new();
        let paths = glob::glob(&pattern_str).map_err(|e| {
            SensorError::configuration(format!("invalid partition pattern {pattern_str}: {e}"))
        })?;
        for entry in paths {
            files.push(entry.map_err(|e| SensorError::Io(e.into_error()))?);
        }

        files.sort();
        Ok(files)
    }

    /// Columns to read from the selected partitions
    fn read_columns(&self, selection: &Selection) -> Vec<String> {
        let mut columns = selection.variables.clone();
        if selection.time.row_bounds().is_some() && !columns.contains(&self.timestamp_column) {
            columns.push(self.timestamp_column.clone());
        }
        columns
    }
}

impl CatalogDataset for LocalDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_manifest(&mut self) -> Result<()> {
        let mut partitions = Vec::new();

        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                SensorError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("dataset directory traversal failed")
                }))
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir_name = entry.file_name().to_string_lossy();
            if !dir_name.starts_with(PARTITION_PREFIX) {
                debug!("Skipping non-partition directory: {}", entry.path().display());
                continue;
            }
            let Some(date) = Self::partition_date(&dir_name) else {
                warn!("Skipping partition with unparseable date: {}", dir_name);
                continue;
            };

            let files = Self::partition_files(entry.path())?;
            if files.is_empty() {
                debug!("Partition {} has no data files", dir_name);
                continue;
            }
            partitions.push(Partition { date, files });
        }

        partitions.sort_by_key(|p| p.date);

        let mut schema = Schema::default();
        for file in partitions.iter().flat_map(|p| p.files.iter()) {
            let mut frame = LazyFrame::scan_parquet(file, ScanArgsParquet::default())?;
            let file_schema = frame.collect_schema()?;
            for (name, dtype) in file_schema.iter() {
                if !schema.contains(name.as_str()) {
                    schema.with_column(name.clone(), dtype.clone());
                }
            }
        }

        info!(
            "Loaded manifest for '{}': {} partitions, {} variables",
            self.name,
            partitions.len(),
            schema.len()
        );

        self.manifest = Some(Manifest { partitions, schema });
        self.selection = None;
        Ok(())
    }

    fn variables(&self) -> Result<Vec<String>> {
        Ok(self.manifest()?.variables())
    }

    fn sel(&mut self, time: &TimeSelection, variables: &[String]) -> Result<()> {
        let manifest = self.manifest()?;

        let mut kept = Vec::with_capacity(variables.len());
        let mut dropped = Vec::new();
        for name in variables {
            if manifest.schema.contains(name) {
                kept.push(name.clone());
            } else {
                dropped.push(name.as_str());
            }
        }
        if !dropped.is_empty() {
            warn!(
                "Dataset '{}' has no variables named {:?}; they will be absent",
                self.name, dropped
            );
        }

        let partitions: Vec<Partition> = manifest
            .partitions
            .iter()
            .filter(|p| time.covers_date(p.date))
            .cloned()
            .collect();

        debug!(
            "Selection on '{}' ({}): {} of {} partitions, {} variables",
            self.name,
            time,
            partitions.len(),
            manifest.partitions.len(),
            kept.len()
        );

        self.selection = Some(Selection {
            time: *time,
            variables: kept,
            partitions,
        });
        Ok(())
    }

    fn partitions_selected(&self) -> usize {
        self.selection.as_ref().map_or(0, |s| s.partitions.len())
    }

    fn load_dataset(&self) -> Result<DataFrame> {
        let manifest = self.manifest()?;
        let selection = self.selection.as_ref().ok_or_else(|| {
            SensorError::configuration(format!(
                "no selection made on dataset '{}' before loading",
                self.name
            ))
        })?;

        if selection.time.row_bounds().is_some()
            && !manifest.schema.contains(&self.timestamp_column)
        {
            return Err(SensorError::MissingColumn {
                column: self.timestamp_column.clone(),
            });
        }

        let columns = self.read_columns(selection);

        let files: Vec<&PathBuf> = selection
            .partitions
            .iter()
            .flat_map(|p| p.files.iter())
            .collect();

        let frame = if files.is_empty() {
            debug!(
                "No partitions selected on '{}', returning empty frame",
                self.name
            );
            DataFrame::empty_with_schema(&manifest.schema).select(columns.iter().cloned())?
        } else {
            let mut scans = Vec::with_capacity(files.len());
            for file in files {
                scans.push(LazyFrame::scan_parquet(file, ScanArgsParquet::default())?);
            }
            let mut combined = concat_lf_diagonal(scans, UnionArgs::default())?;
            let available = combined.collect_schema()?;

            // Variables absent from every selected file still get a typed null column
            let exprs: Vec<Expr> = columns
                .iter()
                .map(|c| {
                    if available.contains(c) {
                        col(c.as_str())
                    } else {
                        let dtype = manifest.schema.get(c).cloned().unwrap_or(DataType::Null);
                        lit(NULL).cast(dtype).alias(c.as_str())
                    }
                })
                .collect();
            combined.select(exprs).collect()?
        };

        let frame = match selection.time.row_bounds() {
            Some((start, end)) if frame.height() > 0 => {
                let seconds = timestamp_seconds(&frame, &self.timestamp_column)?;
                let mask: BooleanChunked =
                    seconds.iter().map(|&ts| ts >= start && ts < end).collect();
                frame.filter(&mask)?
            }
            _ => frame,
        };

        let frame = if frame.width() != selection.variables.len() {
            frame.select(selection.variables.iter().cloned())?
        } else {
            frame
        };

        info!(
            "Materialized '{}': {} rows x {} columns",
            self.name,
            frame.height(),
            frame.width()
        );
        Ok(frame)
    }
}
