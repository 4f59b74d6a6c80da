use crate::error::{AnalysisError, AnalysisResult};
use crate::loader::{require_columns, timestamp_column};
use crate::selector::{column_as_text, records_for_resource};
use crate::types::VALUE_COLUMN;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One valid reading of a resource series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Parse a reading value; unparseable text and NaN count as missing
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a reading timestamp. Offsets are normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Numeric `wartosc` values of a table, non-numeric entries dropped
pub fn numeric_values(df: &DataFrame) -> AnalysisResult<Vec<f64>> {
    require_columns(df, &[VALUE_COLUMN])?;
    let raw = column_as_text(df, VALUE_COLUMN)?;
    Ok(raw.into_iter().flatten().filter_map(parse_value).collect())
}

/// Readings of one resource with a valid timestamp and value, sorted by time.
///
/// The sort is stable, so readings sharing a timestamp keep file order.
pub fn resource_series(df: &DataFrame, resource_code: &str) -> AnalysisResult<Vec<Reading>> {
    let target = records_for_resource(df, resource_code)?;
    if target.height() == 0 {
        return Err(AnalysisError::NoRecords(resource_code.to_string()));
    }

    let ts_column = timestamp_column(&target)?;
    require_columns(&target, &[VALUE_COLUMN])?;
    let timestamps = column_as_text(&target, ts_column)?;
    let values = column_as_text(&target, VALUE_COLUMN)?;

    let mut readings: Vec<Reading> = timestamps
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(ts, value)| {
            Some(Reading {
                timestamp: parse_timestamp(ts?)?,
                value: parse_value(value?)?,
            })
        })
        .collect();

    let dropped = target.height() - readings.len();
    if dropped > 0 {
        debug!(resource_code, dropped, "dropped rows with invalid timestamp or value");
    }
    if readings.is_empty() {
        return Err(AnalysisError::NoValidRows(resource_code.to_string()));
    }

    readings.sort_by_key(|reading| reading.timestamp);
    Ok(readings)
}
