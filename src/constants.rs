//! Application constants for the sensor dataset loader
//!
//! Column names, catalog layout markers and the per-sensor channel
//! layouts used when selecting variables from a catalog dataset.

// =============================================================================
// Primary Descriptor Columns
// =============================================================================

/// Observation timestamp column
pub const TIMESTAMP_COLUMN: &str = "OBS_TIMESTAMP";

/// Latitude column (degrees north)
pub const LATITUDE_COLUMN: &str = "LAT";

/// Longitude column (degrees east)
pub const LONGITUDE_COLUMN: &str = "LON";

/// Primary descriptors requested when none are given explicitly
pub const DEFAULT_PRIMARY_DESCRIPTORS: &[&str] =
    &[TIMESTAMP_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN];

// =============================================================================
// Catalog Layout
// =============================================================================

/// Hive-style partition directory prefix; directories are `OBS_DATE=YYYY-MM-DD`
pub const PARTITION_PREFIX: &str = "OBS_DATE=";

/// Date format used in partition directory names
pub const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Data file pattern inside a partition directory
pub const PARTITION_FILE_PATTERN: &str = "*.parquet";

/// Application directory under the user data directory
pub const CATALOG_APP_DIR: &str = "nnja";

/// Catalog directory name under the application directory
pub const CATALOG_DIR_NAME: &str = "catalog";

// =============================================================================
// Sensor Channel Layouts
// =============================================================================

/// Channel column layout for a sensor type
pub mod channels {
    /// Brightness temperature columns shared by the microwave sounders
    pub const BRIGHTNESS_TEMPERATURE_PREFIX: &str = "TMBR_";

    /// IASI scaled radiance columns
    pub const SCALED_RADIANCE_PREFIX: &str = "SCRA_";

    /// CrIS band-1 spectral radiance columns
    pub const SPECTRAL_RADIANCE_PREFIX: &str = "SRAD01_";

    /// Zero-padded width of the channel index
    pub const CHANNEL_INDEX_WIDTH: usize = 5;

    pub const AMSU_CHANNELS: usize = 15;
    pub const ATMS_CHANNELS: usize = 22;
    pub const MHS_CHANNELS: usize = 5;
    pub const IASI_CHANNELS: usize = 616;
    pub const CRIS_CHANNELS: usize = 431;
}

// =============================================================================
// Batching
// =============================================================================

/// Default number of samples per stacked batch
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Field names of a sample, in output order
pub const SAMPLE_FIELDS: &[&str] = &["timestamp", "latitude", "longitude", "metadata"];
