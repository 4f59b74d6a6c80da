use crate::error::AnalysisResult;
use crate::selector::{
    codes_with_prefix, distinct_resource_codes, is_excluded_from_percentiles,
    percentile_base_codes, records_for_resource,
};
use crate::series::numeric_values;
use crate::stats::{low_percentiles, min_value, non_zero_values, positive_values, resource_value_stats};
use crate::streaks::{longest_streak_hours, zero_streaks};
use crate::types::{AggregationMode, FamilySubtotal, ResourceStats, ZeroStreak, UNKNOWN_FAMILY};
use ahash::AHashSet;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Streak durations as reported: hours rounded to 2 decimal places
fn rounded_streak_hours(streaks: &[ZeroStreak]) -> Vec<f64> {
    streaks
        .iter()
        .map(|s| (s.hours * 100.0).round_ties_even() / 100.0)
        .collect()
}

/// Run `evaluate` for every code, in code order, sequentially or on a rayon pool
fn evaluate_codes<F>(
    codes: &[String],
    mode: AggregationMode,
    evaluate: F,
) -> AnalysisResult<Vec<ResourceStats>>
where
    F: Fn(&str) -> AnalysisResult<ResourceStats> + Send + Sync,
{
    let start_time = Instant::now();

    let mut rows = match mode {
        AggregationMode::Sequential => codes
            .iter()
            .map(|code| evaluate(code.as_str()))
            .collect::<AnalysisResult<Vec<_>>>()?,
        AggregationMode::Parallel { workers } => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?;
            info!(workers, resources = codes.len(), "evaluating resources in parallel");
            pool.install(|| {
                codes
                    .par_iter()
                    .map(|code| evaluate(code.as_str()))
                    .collect::<AnalysisResult<Vec<_>>>()
            })?
        }
    };
    rows.sort_by(|a, b| a.resource_code.cmp(&b.resource_code));

    info!(
        resources = rows.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "resource statistics computed"
    );
    Ok(rows)
}

/// Statistics for every resource code starting with `prefix` (one plant family).
///
/// Every matching resource must have positive and non-zero values; only the
/// 5th percentile is filled in.
pub fn family_stats(
    df: &DataFrame,
    prefix: &str,
    mode: AggregationMode,
) -> AnalysisResult<Vec<ResourceStats>> {
    let codes = codes_with_prefix(df, prefix)?;

    evaluate_codes(&codes, mode, |code| {
        let value_stats = resource_value_stats(df, code)?;
        let streaks = zero_streaks(df, code)?;

        Ok(ResourceStats {
            resource_code: code.to_string(),
            percentile_base_included: !is_excluded_from_percentiles(code),
            min_positive: Some(value_stats.min_positive),
            p1: None,
            p2: None,
            p3: None,
            p5: Some(value_stats.p5_non_zero),
            zero_streak_count: streaks.len(),
            longest_zero_streak_hours: longest_streak_hours(&streaks),
            zero_streak_hours: rounded_streak_hours(&streaks),
        })
    })
}

/// Statistics for every distinct resource code.
///
/// Missing values replace errors for value statistics: a resource without
/// positive readings has no minimum, and percentiles are only computed for
/// percentile-base resources with at least one non-zero reading.
pub fn all_codes_stats(df: &DataFrame, mode: AggregationMode) -> AnalysisResult<Vec<ResourceStats>> {
    let codes = distinct_resource_codes(df)?;
    let percentile_base: AHashSet<String> = percentile_base_codes(df)?.into_iter().collect();

    evaluate_codes(&codes, mode, |code| {
        let subset = records_for_resource(df, code)?;
        let values = numeric_values(&subset)?;
        let included = percentile_base.contains(code);
        let percentiles = if included {
            low_percentiles(&non_zero_values(&values))
        } else {
            None
        };
        let streaks = zero_streaks(df, code)?;

        Ok(ResourceStats {
            resource_code: code.to_string(),
            percentile_base_included: included,
            min_positive: min_value(&positive_values(&values)),
            p1: percentiles.map(|p| p.p1),
            p2: percentiles.map(|p| p.p2),
            p3: percentiles.map(|p| p.p3),
            p5: percentiles.map(|p| p.p5),
            zero_streak_count: streaks.len(),
            longest_zero_streak_hours: longest_streak_hours(&streaks),
            zero_streak_hours: rounded_streak_hours(&streaks),
        })
    })
}

/// Leading run of ASCII letters of a resource code, `UNKNOWN` when there is none
pub fn code_family(resource_code: &str) -> String {
    let family: String = resource_code
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if family.is_empty() {
        UNKNOWN_FAMILY.to_string()
    } else {
        family
    }
}

/// Percentile subtotals grouped by code family, sorted by family
pub fn family_subtotals(records: &[ResourceStats]) -> Vec<FamilySubtotal> {
    let mut families: BTreeMap<String, FamilySubtotal> = BTreeMap::new();

    for record in records {
        let family = code_family(&record.resource_code);
        let entry = families
            .entry(family.clone())
            .or_insert_with(|| FamilySubtotal {
                code_family: family,
                resource_code_count: 0,
                percentile_base_code_count: 0,
                p1_subtotal: 0.0,
                p2_subtotal: 0.0,
                p3_subtotal: 0.0,
                p5_subtotal: 0.0,
            });

        entry.resource_code_count += 1;
        if record.percentile_base_included {
            entry.percentile_base_code_count += 1;
        }
        entry.p1_subtotal += record.p1.unwrap_or(0.0);
        entry.p2_subtotal += record.p2.unwrap_or(0.0);
        entry.p3_subtotal += record.p3.unwrap_or(0.0);
        entry.p5_subtotal += record.p5.unwrap_or(0.0);
    }

    families.into_values().collect()
}

/// Counts and grand totals printed after an aggregate table
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub record_count: usize,
    pub percentile_base_count: usize,
    pub p1_total: f64,
    pub p2_total: f64,
    pub p3_total: f64,
    pub p5_total: f64,
}

impl AggregateSummary {
    /// Missing percentiles are skipped in the totals
    pub fn from_records(records: &[ResourceStats]) -> Self {
        let total = |pick: fn(&ResourceStats) -> Option<f64>| -> f64 {
            records.iter().filter_map(pick).sum()
        };

        Self {
            record_count: records.len(),
            percentile_base_count: records
                .iter()
                .filter(|r| r.percentile_base_included)
                .count(),
            p1_total: total(|r| r.p1),
            p2_total: total(|r| r.p2),
            p3_total: total(|r| r.p3),
            p5_total: total(|r| r.p5),
        }
    }
}
