use crate::error::AnalysisResult;
use crate::series::{resource_series, Reading};
use crate::types::{ZeroStreak, FALLBACK_STEP_HOURS};
use ahash::AHashMap;
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::debug;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const GAP_EPSILON_HOURS: f64 = 1e-9;
const GAP_RELATIVE_TOLERANCE: f64 = 0.01;

fn delta_millis(prev: NaiveDateTime, next: NaiveDateTime) -> i64 {
    (next - prev).num_milliseconds()
}

/// Most frequent positive interval between consecutive readings, in hours.
///
/// Ties go to the shortest interval. Falls back to 15 minutes when the
/// series has no positive interval at all.
pub fn dominant_step_hours(series: &[Reading]) -> f64 {
    let mut counts: AHashMap<i64, usize> = AHashMap::new();
    for pair in series.windows(2) {
        let delta = delta_millis(pair[0].timestamp, pair[1].timestamp);
        if delta > 0 {
            *counts.entry(delta).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(delta, _)| delta as f64 / MILLIS_PER_HOUR)
        .unwrap_or(FALLBACK_STEP_HOURS)
}

/// True when the interval ending at `next` is not the expected step.
/// Non-positive intervals (duplicate timestamps) never break a streak.
fn is_gap(prev: NaiveDateTime, next: NaiveDateTime, step_hours: f64, tolerance: f64) -> bool {
    let delta = delta_millis(prev, next);
    delta > 0 && (delta as f64 / MILLIS_PER_HOUR - step_hours).abs() > tolerance
}

/// Maximal runs of exact-zero readings in a time-sorted series.
///
/// A streak starts at a zero reading that follows a non-zero reading or a
/// gap; a gap splits a run even when every reading around it is zero.
pub fn detect_zero_streaks(series: &[Reading]) -> Vec<ZeroStreak> {
    let step_hours = dominant_step_hours(series);
    let tolerance = GAP_EPSILON_HOURS.max(step_hours * GAP_RELATIVE_TOLERANCE);

    let mut streaks: Vec<ZeroStreak> = Vec::new();
    let mut prev: Option<&Reading> = None;

    for reading in series {
        let is_zero = reading.value == 0.0;
        let (prev_zero, gap_break) = match prev {
            Some(p) => (
                p.value == 0.0,
                is_gap(p.timestamp, reading.timestamp, step_hours, tolerance),
            ),
            None => (false, false),
        };

        if is_zero && prev_zero && !gap_break {
            // a zero predecessor always opened a streak
            if let Some(current) = streaks.last_mut() {
                current.end_ts = reading.timestamp;
                current.intervals += 1;
            }
        } else if is_zero {
            streaks.push(ZeroStreak {
                streak_id: streaks.len() + 1,
                start_ts: reading.timestamp,
                end_ts: reading.timestamp,
                intervals: 1,
                hours: 0.0,
            });
        }
        prev = Some(reading);
    }

    for streak in &mut streaks {
        streak.hours = streak.intervals as f64 * step_hours;
    }
    streaks
}

/// Zero-value streaks of one resource with their lengths in hours.
///
/// A resource without zero readings yields an empty list.
pub fn zero_streaks(df: &DataFrame, resource_code: &str) -> AnalysisResult<Vec<ZeroStreak>> {
    let series = resource_series(df, resource_code)?;
    let streaks = detect_zero_streaks(&series);
    debug!(
        resource_code,
        readings = series.len(),
        streaks = streaks.len(),
        step_hours = dominant_step_hours(&series),
        "zero streaks detected"
    );
    Ok(streaks)
}

/// Longest streak duration in hours, 0.0 when there is none
pub fn longest_streak_hours(streaks: &[ZeroStreak]) -> f64 {
    streaks.iter().map(|s| s.hours).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use chrono::{Duration, NaiveDate};
    use polars::prelude::*;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series_at(points: &[(i64, f64)]) -> Vec<Reading> {
        points
            .iter()
            .map(|&(minutes, value)| Reading {
                timestamp: t0() + Duration::minutes(minutes),
                value,
            })
            .collect()
    }

    #[test]
    fn test_uniform_series_example() {
        let series = series_at(&[(0, 5.0), (15, 0.0), (30, 0.0), (45, 0.0), (60, 3.0), (75, 0.0)]);
        let streaks = detect_zero_streaks(&series);

        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[0].streak_id, 1);
        assert_eq!(streaks[0].intervals, 3);
        assert_eq!(streaks[0].start_ts, t0() + Duration::minutes(15));
        assert_eq!(streaks[0].end_ts, t0() + Duration::minutes(45));
        assert!((streaks[0].hours - 0.75).abs() < 1e-12);

        assert_eq!(streaks[1].streak_id, 2);
        assert_eq!(streaks[1].intervals, 1);
        assert!((streaks[1].hours - 0.25).abs() < 1e-12);
        assert!((longest_streak_hours(&streaks) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_gap_splits_zero_run() {
        // 15-minute step; the third reading arrives after a long gap
        let series = series_at(&[(0, 0.0), (15, 0.0), (150, 0.0), (165, 4.0), (180, 0.0)]);
        let streaks = detect_zero_streaks(&series);

        let lengths: Vec<usize> = streaks.iter().map(|s| s.intervals).collect();
        assert_eq!(lengths, vec![2, 1, 1]);
    }

    #[test]
    fn test_minimal_gap_case() {
        // three readings only: both deltas differ, the smaller wins the mode tie
        let series = series_at(&[(0, 0.0), (15, 0.0), (150, 0.0)]);
        assert!((dominant_step_hours(&series) - 0.25).abs() < 1e-12);

        let streaks = detect_zero_streaks(&series);
        let lengths: Vec<usize> = streaks.iter().map(|s| s.intervals).collect();
        assert_eq!(lengths, vec![2, 1]);
    }

    #[test]
    fn test_jitter_within_tolerance_does_not_split() {
        let base = t0();
        let series = vec![
            Reading { timestamp: base, value: 0.0 },
            Reading { timestamp: base + Duration::minutes(15), value: 0.0 },
            Reading { timestamp: base + Duration::minutes(30) + Duration::seconds(1), value: 0.0 },
            Reading { timestamp: base + Duration::minutes(45), value: 0.0 },
            Reading { timestamp: base + Duration::minutes(60), value: 0.0 },
        ];
        let streaks = detect_zero_streaks(&series);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].intervals, 5);
    }

    #[test]
    fn test_duplicate_timestamps_do_not_break() {
        let series = series_at(&[(0, 0.0), (15, 0.0), (15, 0.0), (30, 0.0)]);
        let streaks = detect_zero_streaks(&series);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].intervals, 4);
        assert!((streaks[0].hours - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hourly_series_uses_its_own_step() {
        let series = series_at(&[(0, 1.0), (60, 0.0), (120, 0.0), (180, 0.0), (240, 2.0)]);
        let streaks = detect_zero_streaks(&series);
        assert_eq!(streaks.len(), 1);
        assert!((streaks[0].hours - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_reading_falls_back_to_quarter_hour() {
        let series = series_at(&[(0, 0.0)]);
        assert_eq!(dominant_step_hours(&series), FALLBACK_STEP_HOURS);
        let streaks = detect_zero_streaks(&series);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].hours, 0.25);
    }

    #[test]
    fn test_no_zero_readings_yields_empty_result() {
        let series = series_at(&[(0, 1.0), (15, 2.0), (30, 3.0)]);
        assert!(detect_zero_streaks(&series).is_empty());
        assert_eq!(longest_streak_hours(&[]), 0.0);
    }

    #[test]
    fn test_total_intervals_equal_zero_count() {
        let pattern = [0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 5.0, 0.0];
        let points: Vec<(i64, f64)> = pattern
            .iter()
            .enumerate()
            .map(|(i, v)| {
                // a hole between readings 5 and 6
                let minutes = if i >= 6 { i as i64 * 15 + 45 } else { i as i64 * 15 };
                (minutes, *v)
            })
            .collect();
        let series = series_at(&points);
        let streaks = detect_zero_streaks(&series);

        let total: usize = streaks.iter().map(|s| s.intervals).sum();
        let zeros = pattern.iter().filter(|v| **v == 0.0).count();
        assert_eq!(total, zeros);
        assert_eq!(streaks.len(), 5);
    }

    #[test]
    fn test_zero_streaks_from_table() -> anyhow::Result<()> {
        let df = df!(
            "resource_code" => &["X1", "X1", "X1", "X1", "X1", "X1", "OTHER"],
            "dtime_utc" => &[
                "2024-01-01 00:45:00",
                "2024-01-01 00:00:00",
                "2024-01-01 00:15:00",
                "2024-01-01 00:30:00",
                "2024-01-01 01:00:00",
                "2024-01-01 01:15:00",
                "2024-01-01 00:00:00",
            ],
            "wartosc" => &["0", "5", "0", "0", "3", "0", "0"]
        )?;
        let streaks = zero_streaks(&df, "X1")?;
        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[0].intervals, 3);
        assert_eq!(streaks[1].intervals, 1);

        // same input, same answer
        assert_eq!(zero_streaks(&df, "X1")?, streaks);

        assert!(matches!(
            zero_streaks(&df, "NOPE"),
            Err(AnalysisError::NoRecords(_))
        ));
        Ok(())
    }
}
