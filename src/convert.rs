//! Column conversions from catalog frames to training-ready numbers.
//!
//! Timestamps become seconds since the Unix epoch (`f64`); every other
//! column becomes `f32`. Nulls become `NaN` in both cases.

use crate::error::{Result, SensorError};
use polars::prelude::*;

/// Seconds since the Unix epoch for every row of `column`
///
/// Accepts datetime columns of any unit and timezone, date columns, and
/// numeric columns already holding epoch seconds.
pub fn timestamp_seconds(frame: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let series = frame.column(column)?.as_materialized_series();

    let (raw, multiplier, divisor) = match series.dtype() {
        DataType::Datetime(unit, _) => {
            let per_second = match unit {
                TimeUnit::Nanoseconds => 1e9,
                TimeUnit::Microseconds => 1e6,
                TimeUnit::Milliseconds => 1e3,
            };
            (series.cast(&DataType::Int64)?, 1.0, per_second)
        }
        DataType::Date => (
            series.cast(&DataType::Int32)?.cast(&DataType::Int64)?,
            86_400.0,
            1.0,
        ),
        DataType::String | DataType::Boolean => {
            return Err(SensorError::InvalidTimestamp {
                column: column.to_string(),
                reason: format!("unsupported dtype {}", series.dtype()),
            });
        }
        _ => {
            let seconds = series.strict_cast(&DataType::Float64).map_err(|e| {
                SensorError::InvalidTimestamp {
                    column: column.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(seconds
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect());
        }
    };

    Ok(raw
        .i64()?
        .into_iter()
        .map(|v| v.map_or(f64::NAN, |v| v as f64 * multiplier / divisor))
        .collect())
}

/// `f32` values of a numeric column
pub fn float_values(frame: &DataFrame, column: &str) -> Result<Vec<f32>> {
    let series = frame.column(column)?.as_materialized_series();

    if matches!(series.dtype(), DataType::String) {
        return Err(SensorError::configuration(format!(
            "column '{column}' is not numeric (dtype {})",
            series.dtype()
        )));
    }

    let values = series.strict_cast(&DataType::Float32)?;
    Ok(values
        .f32()?
        .into_iter()
        .map(|v| v.unwrap_or(f32::NAN))
        .collect())
}
