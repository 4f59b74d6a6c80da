use crate::error::AnalysisResult;
use crate::loader::require_columns;
use crate::types::RESOURCE_CODE_COLUMN;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Resource classes that never count toward percentile aggregates
/// (reserve, pumped-storage and network-only units).
pub const EXCLUDED_PERCENTILE_CODE_PREFIXES: [&str; 7] =
    ["ZRN", "PZR", "JW7", "WLC", "ZGR", "SNA", "ZWA"];

/// Read any column as text, whatever dtype it was loaded or built with
pub(crate) fn column_as_text(df: &DataFrame, name: &str) -> AnalysisResult<StringChunked> {
    let series = df.column(name)?.cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

/// Sorted unique non-missing resource codes
pub fn distinct_resource_codes(df: &DataFrame) -> AnalysisResult<Vec<String>> {
    require_columns(df, &[RESOURCE_CODE_COLUMN])?;
    let codes = column_as_text(df, RESOURCE_CODE_COLUMN)?;
    let unique: BTreeSet<&str> = codes.into_iter().flatten().collect();
    Ok(unique.into_iter().map(str::to_string).collect())
}

/// Sorted unique resource codes starting with `prefix`
pub fn codes_with_prefix(df: &DataFrame, prefix: &str) -> AnalysisResult<Vec<String>> {
    Ok(distinct_resource_codes(df)?
        .into_iter()
        .filter(|code| code.starts_with(prefix))
        .collect())
}

pub fn is_excluded_from_percentiles(resource_code: &str) -> bool {
    EXCLUDED_PERCENTILE_CODE_PREFIXES
        .iter()
        .any(|prefix| resource_code.starts_with(prefix))
}

/// Sorted resource codes eligible for percentile calculations
pub fn percentile_base_codes(df: &DataFrame) -> AnalysisResult<Vec<String>> {
    Ok(distinct_resource_codes(df)?
        .into_iter()
        .filter(|code| !is_excluded_from_percentiles(code))
        .collect())
}

/// All rows whose resource code matches exactly
pub fn records_for_resource(df: &DataFrame, resource_code: &str) -> AnalysisResult<DataFrame> {
    require_columns(df, &[RESOURCE_CODE_COLUMN])?;
    let codes = column_as_text(df, RESOURCE_CODE_COLUMN)?;
    let mask = codes.equal(resource_code);
    Ok(df.filter(&mask)?)
}
