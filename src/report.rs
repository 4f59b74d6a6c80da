use crate::error::AnalysisResult;
use crate::types::{format_hours, FamilySubtotal, ResourceStats, ZeroStreak};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which columns of a statistics table are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Family-scoped table: minimum and 5th percentile only
    Family,
    /// Global table with the percentile-base flag and all low percentiles
    AllCodes,
}

/// Build a printable DataFrame from statistics records
pub fn records_to_dataframe(records: &[ResourceStats], layout: RecordLayout) -> AnalysisResult<DataFrame> {
    let mut columns = vec![Series::new(
        "resource_code",
        records.iter().map(|r| r.resource_code.clone()).collect::<Vec<_>>(),
    )];

    if layout == RecordLayout::AllCodes {
        columns.push(Series::new(
            "percentile_base_included",
            records.iter().map(|r| r.percentile_base_included).collect::<Vec<_>>(),
        ));
    }
    columns.push(Series::new(
        "min_non_zero_wartosc",
        records.iter().map(|r| r.min_positive).collect::<Vec<_>>(),
    ));
    if layout == RecordLayout::AllCodes {
        columns.push(Series::new("p1_non_zero_wartosc", records.iter().map(|r| r.p1).collect::<Vec<_>>()));
        columns.push(Series::new("p2_non_zero_wartosc", records.iter().map(|r| r.p2).collect::<Vec<_>>()));
        columns.push(Series::new("p3_non_zero_wartosc", records.iter().map(|r| r.p3).collect::<Vec<_>>()));
    }
    columns.push(Series::new("p5_non_zero_wartosc", records.iter().map(|r| r.p5).collect::<Vec<_>>()));
    columns.push(Series::new(
        "zero_streak_count",
        records.iter().map(|r| r.zero_streak_count as u64).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        "longest_zero_streak_h",
        records.iter().map(|r| r.longest_zero_streak_hours).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        "zero_streak_hours",
        records.iter().map(|r| format_hours(&r.zero_streak_hours)).collect::<Vec<_>>(),
    ));

    Ok(DataFrame::new(columns)?)
}

pub fn streaks_to_dataframe(streaks: &[ZeroStreak]) -> AnalysisResult<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new("streak_id", streaks.iter().map(|s| s.streak_id as u64).collect::<Vec<_>>()),
        Series::new(
            "start_ts",
            streaks
                .iter()
                .map(|s| s.start_ts.format(TIMESTAMP_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "end_ts",
            streaks
                .iter()
                .map(|s| s.end_ts.format(TIMESTAMP_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Series::new("intervals", streaks.iter().map(|s| s.intervals as u64).collect::<Vec<_>>()),
        Series::new("hours", streaks.iter().map(|s| s.hours).collect::<Vec<_>>()),
    ])?)
}

pub fn subtotals_to_dataframe(subtotals: &[FamilySubtotal]) -> AnalysisResult<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(
            "code_family",
            subtotals.iter().map(|s| s.code_family.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "resource_code_count",
            subtotals.iter().map(|s| s.resource_code_count as u64).collect::<Vec<_>>(),
        ),
        Series::new(
            "percentile_base_code_count",
            subtotals.iter().map(|s| s.percentile_base_code_count as u64).collect::<Vec<_>>(),
        ),
        Series::new("p1_non_zero_wartosc_subtotal", subtotals.iter().map(|s| s.p1_subtotal).collect::<Vec<_>>()),
        Series::new("p2_non_zero_wartosc_subtotal", subtotals.iter().map(|s| s.p2_subtotal).collect::<Vec<_>>()),
        Series::new("p3_non_zero_wartosc_subtotal", subtotals.iter().map(|s| s.p3_subtotal).collect::<Vec<_>>()),
        Series::new("p5_non_zero_wartosc_subtotal", subtotals.iter().map(|s| s.p5_subtotal).collect::<Vec<_>>()),
    ])?)
}

fn write_rows_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> AnalysisResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write statistics records as CSV; missing values become empty fields
pub fn write_records_csv<P: AsRef<Path>>(path: P, records: &[ResourceStats]) -> AnalysisResult<()> {
    write_rows_csv(path, records)
}

pub fn write_subtotals_csv<P: AsRef<Path>>(path: P, subtotals: &[FamilySubtotal]) -> AnalysisResult<()> {
    write_rows_csv(path, subtotals)
}
