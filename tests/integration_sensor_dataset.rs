//! Integration tests for loading sensor datasets from a local catalog
//!
//! Each test writes a small partitioned parquet catalog into a temporary
//! directory and loads it end to end through `SensorDataset::open`.

use chrono::{TimeZone, Utc};
use polars::prelude::*;
use sensor_dataset::{
    Catalog, DatasetRequest, LoaderConfig, LocalCatalog, SensorDataset, SensorError, SensorType,
    TimeSelection,
};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

/// 2021-01-01T00:00:00Z
const DAY_ONE: i64 = 1_609_459_200;
const DAY_SECONDS: i64 = 86_400;

/// Observation frame for `sensor` with one row per minute from `start_seconds`
fn sensor_frame(sensor: SensorType, start_seconds: i64, rows: usize) -> DataFrame {
    let timestamps: Vec<i64> = (0..rows)
        .map(|i| (start_seconds + i as i64 * 60) * 1_000)
        .collect();
    let latitudes: Vec<f64> = (0..rows).map(|i| 10.0 + i as f64).collect();
    let longitudes: Vec<f64> = (0..rows).map(|i| -20.0 - i as f64).collect();

    let mut columns: Vec<Column> = vec![
        Series::new("OBS_TIMESTAMP".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap()
            .into(),
        Series::new("LAT".into(), latitudes).into(),
        Series::new("LON".into(), longitudes).into(),
        Series::new("SAID".into(), vec![3i32; rows]).into(),
    ];
    for (channel, name) in sensor.channel_columns().iter().enumerate() {
        let values: Vec<f64> = (0..rows)
            .map(|i| 200.0 + channel as f64 + i as f64 * 0.5)
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }

    DataFrame::new(columns).unwrap()
}

fn write_partition(root: &Path, dataset: &str, date: &str, file: &str, mut frame: DataFrame) {
    let dir = root.join(dataset).join(format!("OBS_DATE={date}"));
    fs::create_dir_all(&dir).unwrap();
    let out = File::create(dir.join(file)).unwrap();
    ParquetWriter::new(out).finish(&mut frame).unwrap();
}

fn setup(temp_dir: &TempDir) -> (LocalCatalog, LoaderConfig) {
    let config = LoaderConfig::default().with_catalog_root(temp_dir.path());
    (LocalCatalog::new(&config), config)
}

fn day_one_noon() -> TimeSelection {
    TimeSelection::At(Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap())
}

#[test]
fn test_metadata_width_matches_sensor_channels() {
    let temp_dir = TempDir::new().unwrap();
    for sensor in SensorType::ALL {
        write_partition(
            temp_dir.path(),
            &format!("{sensor}-test"),
            "2021-01-01",
            "part-0.parquet",
            sensor_frame(sensor, DAY_ONE, 3),
        );
    }
    let (catalog, config) = setup(&temp_dir);

    for (sensor, expected) in [
        (SensorType::Amsu, 15),
        (SensorType::Atms, 22),
        (SensorType::Mhs, 5),
        (SensorType::Iasi, 616),
        (SensorType::Cris, 431),
    ] {
        let request = DatasetRequest::new(format!("{sensor}-test"), day_one_noon(), sensor);
        let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.metadata_columns().len(), expected);
        assert_eq!(dataset.get(0).unwrap().metadata.len(), expected);
    }
}

#[test]
fn test_sample_values_follow_row() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE, 4),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("amsua", day_one_noon(), SensorType::Amsu);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    let sample = dataset.get(2).unwrap();
    assert_eq!(sample.timestamp, (DAY_ONE + 120) as f64);
    assert_eq!(sample.latitude, 12.0);
    assert_eq!(sample.longitude, -22.0);
    assert_eq!(sample.metadata[0], 201.0);
    assert_eq!(sample.metadata[14], 215.0);
    assert_eq!(dataset.metadata_columns()[0], "TMBR_00001");
}

#[test]
fn test_same_index_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "atms",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Atms, DAY_ONE, 5),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("atms", day_one_noon(), SensorType::Atms);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.get(3).unwrap(), dataset.get(3).unwrap());

    let samples: Vec<_> = dataset.iter().collect();
    assert_eq!(samples.len(), dataset.len());
    for (index, sample) in samples.iter().enumerate() {
        assert_eq!(*sample, dataset.get(index).unwrap());
    }
}

#[test]
fn test_unsupported_sensor_is_configuration_error() {
    let err = DatasetRequest::from_tag("amsua", day_one_noon(), "SSMIS").unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, SensorError::UnsupportedSensor { .. }));
}

#[test]
fn test_missing_primary_descriptor_fails_construction() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "mhs",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Mhs, DAY_ONE, 2),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("mhs", day_one_noon(), SensorType::Mhs)
        .with_primary_descriptors(["OBS_TIMESTAMP", "LAT", "LON", "SAZA"]);
    let err = SensorDataset::open(&catalog, &config, &request).unwrap_err();

    assert!(err.is_configuration());
    assert!(matches!(err, SensorError::MissingColumn { ref column } if column == "SAZA"));
}

#[test]
fn test_missing_coordinate_column_fails_construction() {
    let temp_dir = TempDir::new().unwrap();
    let frame = sensor_frame(SensorType::Mhs, DAY_ONE, 2).drop("LON").unwrap();
    write_partition(temp_dir.path(), "mhs", "2021-01-01", "part-0.parquet", frame);
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("mhs", day_one_noon(), SensorType::Mhs)
        .with_primary_descriptors(["OBS_TIMESTAMP", "LAT"]);
    let err = SensorDataset::open(&catalog, &config, &request).unwrap_err();

    assert!(matches!(err, SensorError::MissingColumn { ref column } if column == "LON"));
}

#[test]
fn test_missing_timestamp_column_fails_for_every_time_selection() {
    let temp_dir = TempDir::new().unwrap();
    let frame = sensor_frame(SensorType::Mhs, DAY_ONE, 2)
        .drop("OBS_TIMESTAMP")
        .unwrap();
    write_partition(temp_dir.path(), "mhs", "2021-01-01", "part-0.parquet", frame);
    let (catalog, config) = setup(&temp_dir);

    let range: TimeSelection = "2021-01-01..2021-01-02".parse().unwrap();
    for time in [day_one_noon(), range] {
        let request = DatasetRequest::new("mhs", time, SensorType::Mhs);
        let err = SensorDataset::open(&catalog, &config, &request).unwrap_err();

        assert!(err.is_configuration(), "{time}: {err:?}");
        assert!(
            matches!(err, SensorError::MissingColumn { ref column } if column == "OBS_TIMESTAMP")
        );
    }
}

#[test]
fn test_range_filter_reads_unselected_timestamp_column() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "mhs",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Mhs, DAY_ONE, 10),
    );
    let (catalog, config) = setup(&temp_dir);
    let time = TimeSelection::range(
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 2, 0).unwrap(),
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 5, 0).unwrap(),
    )
    .unwrap();

    // The catalog filters on the timestamp column even when it is not selected
    let mut handle = catalog.open("mhs").unwrap();
    handle.load_manifest().unwrap();
    handle
        .sel(
            &time,
            &["LAT".to_string(), "LON".to_string(), "TMBR_00001".to_string()],
        )
        .unwrap();
    let frame = handle.load_dataset().unwrap();

    assert_eq!(frame.height(), 3);
    let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["LAT", "LON", "TMBR_00001"]);
    let latitudes: Vec<Option<f64>> = frame
        .column("LAT")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(latitudes, vec![Some(12.0), Some(13.0), Some(14.0)]);

    // Samples always carry a timestamp, so the adapter still requires it
    let request = DatasetRequest::new("mhs", time, SensorType::Mhs)
        .with_primary_descriptors(["LAT", "LON"]);
    let err = SensorDataset::open(&catalog, &config, &request).unwrap_err();
    assert!(matches!(err, SensorError::MissingColumn { ref column } if column == "OBS_TIMESTAMP"));
}

#[test]
fn test_len_matches_selected_partition() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE, 3),
    );
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-02",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE + DAY_SECONDS, 4),
    );
    let (catalog, config) = setup(&temp_dir);

    let time = TimeSelection::At(Utc.with_ymd_and_hms(2021, 1, 2, 3, 0, 0).unwrap());
    let request = DatasetRequest::new("amsua", time, SensorType::Amsu);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.iter().count(), 4);
    assert_eq!(dataset.summary().partitions_selected, 1);
    assert_eq!(dataset.get(0).unwrap().timestamp, (DAY_ONE + DAY_SECONDS) as f64);
}

#[test]
fn test_range_selection_filters_rows() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE, 10),
    );
    let (catalog, config) = setup(&temp_dir);

    let time = TimeSelection::range(
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 2, 0).unwrap(),
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 5, 0).unwrap(),
    )
    .unwrap();
    let request = DatasetRequest::new("amsua", time, SensorType::Amsu);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    let timestamps: Vec<f64> = dataset.iter().map(|s| s.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![
            (DAY_ONE + 120) as f64,
            (DAY_ONE + 180) as f64,
            (DAY_ONE + 240) as f64
        ]
    );
}

#[test]
fn test_range_selection_spans_partitions() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE + DAY_SECONDS - 180, 3),
    );
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-02",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE + DAY_SECONDS, 3),
    );
    let (catalog, config) = setup(&temp_dir);

    let time: TimeSelection = "2021-01-01T23:58:00Z..2021-01-02T00:02:00Z".parse().unwrap();
    let request = DatasetRequest::new("amsua", time, SensorType::Amsu);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.summary().partitions_selected, 2);
    assert_eq!(dataset.len(), 4);
}

#[test]
fn test_additional_variables_extend_metadata() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE, 2),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("amsua", day_one_noon(), SensorType::Amsu)
        .with_additional_variables(["SAID"]);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.metadata_columns().len(), 16);
    assert_eq!(dataset.metadata_columns().last().unwrap(), "SAID");
    assert_eq!(*dataset.get(1).unwrap().metadata.last().unwrap(), 3.0);
}

#[test]
fn test_absent_channels_are_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let frame = sensor_frame(SensorType::Mhs, DAY_ONE, 2)
        .drop("TMBR_00005")
        .unwrap();
    write_partition(temp_dir.path(), "mhs", "2021-01-01", "part-0.parquet", frame);
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("mhs", day_one_noon(), SensorType::Mhs);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.metadata_columns().len(), 4);
}

#[test]
fn test_partition_files_with_differing_columns() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "mhs",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Mhs, DAY_ONE, 2),
    );
    write_partition(
        temp_dir.path(),
        "mhs",
        "2021-01-01",
        "part-1.parquet",
        sensor_frame(SensorType::Mhs, DAY_ONE + 600, 2)
            .drop("SAID")
            .unwrap(),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("mhs", day_one_noon(), SensorType::Mhs)
        .with_additional_variables(["SAID"]);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert_eq!(dataset.len(), 4);
    assert_eq!(*dataset.get(0).unwrap().metadata.last().unwrap(), 3.0);
    assert!(dataset.get(3).unwrap().metadata.last().unwrap().is_nan());
}

#[test]
fn test_empty_selection() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "amsua",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Amsu, DAY_ONE, 2),
    );
    let (catalog, config) = setup(&temp_dir);

    let time = TimeSelection::At(Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap());
    let request = DatasetRequest::new("amsua", time, SensorType::Amsu);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    assert!(dataset.is_empty());
    assert_eq!(dataset.metadata_columns().len(), 15);
    assert_eq!(dataset.batches(4).unwrap().count(), 0);
    assert!(matches!(
        dataset.get(0),
        Err(SensorError::IndexOutOfRange { index: 0, len: 0 })
    ));
}

#[test]
fn test_batches_stack_in_row_order() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "atms",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Atms, DAY_ONE, 7),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("atms", day_one_noon(), SensorType::Atms);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();

    let batches = dataset.batches(3).unwrap();
    assert_eq!(batches.batch_count(), 3);

    let batches: Vec<_> = batches.map(|b| b.unwrap()).collect();
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(batches[0].metadata.shape(), &[3, 22]);

    let mut index = 0;
    for batch in &batches {
        for i in 0..batch.len() {
            assert_eq!(batch.sample(i).unwrap(), dataset.get(index).unwrap());
            index += 1;
        }
    }
    assert_eq!(index, dataset.len());
}

#[test]
fn test_zero_batch_size_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_partition(
        temp_dir.path(),
        "mhs",
        "2021-01-01",
        "part-0.parquet",
        sensor_frame(SensorType::Mhs, DAY_ONE, 1),
    );
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("mhs", day_one_noon(), SensorType::Mhs);
    let dataset = SensorDataset::open(&catalog, &config, &request).unwrap();
    assert!(dataset.batches(0).unwrap_err().is_configuration());
}

#[test]
fn test_unknown_dataset_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, config) = setup(&temp_dir);

    let request = DatasetRequest::new("does-not-exist", day_one_noon(), SensorType::Amsu);
    let err = SensorDataset::open(&catalog, &config, &request).unwrap_err();
    assert!(matches!(err, SensorError::DatasetNotFound { .. }));
}

#[test]
fn test_catalog_lists_and_manifests() {
    let temp_dir = TempDir::new().unwrap();
    for (dataset, date) in [
        ("mhs", "2021-01-02"),
        ("amsua", "2021-01-01"),
        ("mhs", "2021-01-01"),
    ] {
        write_partition(
            temp_dir.path(),
            dataset,
            date,
            "part-0.parquet",
            sensor_frame(SensorType::Mhs, DAY_ONE, 1),
        );
    }
    fs::create_dir_all(temp_dir.path().join("mhs").join("_scratch")).unwrap();
    let (catalog, _) = setup(&temp_dir);

    assert_eq!(catalog.list().unwrap(), vec!["amsua", "mhs"]);

    let mut handle = catalog.open("mhs").unwrap();
    assert!(handle.variables().is_err());
    assert!(handle.load_dataset().is_err());

    handle.load_manifest().unwrap();
    let variables = handle.variables().unwrap();
    assert!(variables.contains(&"OBS_TIMESTAMP".to_string()));
    assert!(variables.contains(&"TMBR_00005".to_string()));

    let time: TimeSelection = "2021-01-01..2021-01-03".parse().unwrap();
    handle
        .sel(&time, &["LAT".to_string(), "LON".to_string()])
        .unwrap();
    assert_eq!(handle.partitions_selected(), 2);
    assert_eq!(handle.load_dataset().unwrap().width(), 2);
}
