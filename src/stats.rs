use crate::error::{AnalysisError, AnalysisResult};
use crate::loader::require_columns;
use crate::selector::{column_as_text, records_for_resource};
use crate::series::{numeric_values, parse_value};
use crate::types::{LowPercentiles, ValueStats, RESOURCE_CODE_COLUMN, VALUE_COLUMN};
use ahash::AHashMap;
use polars::prelude::*;

/// Quantile `q` (0.0..=1.0) by linear interpolation between order statistics.
///
/// Returns `None` for an empty sample.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    Some(sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx]))
}

/// Values strictly greater than zero
pub fn positive_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| *v > 0.0).collect()
}

/// Values not exactly zero; negative readings are kept
pub fn non_zero_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| *v != 0.0).collect()
}

pub fn min_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// 1st, 2nd, 3rd and 5th percentile of the given non-zero values
pub fn low_percentiles(non_zero: &[f64]) -> Option<LowPercentiles> {
    Some(LowPercentiles {
        p1: percentile(non_zero, 0.01)?,
        p2: percentile(non_zero, 0.02)?,
        p3: percentile(non_zero, 0.03)?,
        p5: percentile(non_zero, 0.05)?,
    })
}

/// Minimum positive `wartosc` and 5th percentile of non-zero `wartosc` for one resource
pub fn resource_value_stats(df: &DataFrame, resource_code: &str) -> AnalysisResult<ValueStats> {
    let target = records_for_resource(df, resource_code)?;
    if target.height() == 0 {
        return Err(AnalysisError::NoRecords(resource_code.to_string()));
    }

    let values = numeric_values(&target)?;
    if values.is_empty() {
        return Err(AnalysisError::NoNumericValues(resource_code.to_string()));
    }

    let min_positive = min_value(&positive_values(&values))
        .ok_or_else(|| AnalysisError::NoPositiveValues(resource_code.to_string()))?;
    let p5_non_zero = percentile(&non_zero_values(&values), 0.05)
        .ok_or_else(|| AnalysisError::NoNonZeroValues(resource_code.to_string()))?;

    Ok(ValueStats {
        min_positive,
        p5_non_zero,
    })
}

/// One original row per resource code: the row holding its smallest positive
/// `wartosc` (first occurrence on ties), ordered by resource code.
///
/// Yields an empty table with the input schema when no value is positive.
pub fn min_positive_per_resource(df: &DataFrame) -> AnalysisResult<DataFrame> {
    require_columns(df, &[RESOURCE_CODE_COLUMN, VALUE_COLUMN])?;
    let codes = column_as_text(df, RESOURCE_CODE_COLUMN)?;
    let values = column_as_text(df, VALUE_COLUMN)?;

    let mut minima: AHashMap<&str, (f64, IdxSize)> = AHashMap::new();
    for (idx, (code, raw)) in codes.into_iter().zip(values.into_iter()).enumerate() {
        let (Some(code), Some(value)) = (code, raw.and_then(parse_value)) else {
            continue;
        };
        if value <= 0.0 {
            continue;
        }
        minima
            .entry(code)
            .and_modify(|best| {
                if value < best.0 {
                    *best = (value, idx as IdxSize);
                }
            })
            .or_insert((value, idx as IdxSize));
    }

    if minima.is_empty() {
        return Ok(df.head(Some(0)));
    }

    let mut rows: Vec<(&str, f64, IdxSize)> = minima
        .into_iter()
        .map(|(code, (value, idx))| (code, value, idx))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0).then(a.1.total_cmp(&b.1)));

    let indices = IdxCa::from_vec("idx", rows.into_iter().map(|(_, _, idx)| idx).collect());
    Ok(df.take(&indices)?)
}
