use crate::error::{AnalysisError, AnalysisResult};
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Column holding the unit identifier
pub const RESOURCE_CODE_COLUMN: &str = "resource_code";
/// Column holding the reading value
pub const VALUE_COLUMN: &str = "wartosc";
/// Preferred timestamp column
pub const UTC_TIMESTAMP_COLUMN: &str = "dtime_utc";
/// Local-time fallback timestamp column
pub const LOCAL_TIMESTAMP_COLUMN: &str = "dtime";

/// Family key used when a resource code has no leading letters
pub const UNKNOWN_FAMILY: &str = "UNKNOWN";

/// Step assumed when a series has no positive timestamp delta (15 minutes)
pub const FALLBACK_STEP_HOURS: f64 = 0.25;

/// One maximal run of exact-zero readings in a resource series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroStreak {
    pub streak_id: usize,
    pub start_ts: NaiveDateTime,
    pub end_ts: NaiveDateTime,
    pub intervals: usize,
    pub hours: f64,
}

/// Minimum positive value and 5th percentile of non-zero values for one resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub min_positive: f64,
    pub p5_non_zero: f64,
}

/// Low percentiles of the non-zero values of one resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPercentiles {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p5: f64,
}

/// One row of an aggregate statistics table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStats {
    pub resource_code: String,
    pub percentile_base_included: bool,
    #[serde(rename = "min_non_zero_wartosc")]
    pub min_positive: Option<f64>,
    #[serde(rename = "p1_non_zero_wartosc")]
    pub p1: Option<f64>,
    #[serde(rename = "p2_non_zero_wartosc")]
    pub p2: Option<f64>,
    #[serde(rename = "p3_non_zero_wartosc")]
    pub p3: Option<f64>,
    #[serde(rename = "p5_non_zero_wartosc")]
    pub p5: Option<f64>,
    pub zero_streak_count: usize,
    #[serde(rename = "longest_zero_streak_h")]
    pub longest_zero_streak_hours: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub zero_streak_hours: Vec<f64>,
}

/// Percentile subtotals for one resource-code family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilySubtotal {
    pub code_family: String,
    pub resource_code_count: usize,
    pub percentile_base_code_count: usize,
    #[serde(rename = "p1_non_zero_wartosc_subtotal")]
    pub p1_subtotal: f64,
    #[serde(rename = "p2_non_zero_wartosc_subtotal")]
    pub p2_subtotal: f64,
    #[serde(rename = "p3_non_zero_wartosc_subtotal")]
    pub p3_subtotal: f64,
    #[serde(rename = "p5_non_zero_wartosc_subtotal")]
    pub p5_subtotal: f64,
}

/// How the aggregator walks the resource codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    Sequential,
    /// Evaluate resources on a rayon pool; output order is unchanged
    Parallel { workers: usize },
}

/// Configuration for a statistics run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Path to the generation CSV file
    pub file_path: PathBuf,
    /// CSV delimiter (default: ",")
    pub delimiter: char,
    /// Resource inspected in detail (default: "BEL 2-02")
    pub target_resource: String,
    /// Prefix selecting the family-scoped statistics (default: "BEL")
    pub family_prefix: String,
    /// Evaluate resources in parallel
    pub parallel: bool,
    /// Number of worker threads used in parallel mode
    pub num_workers: usize,
    /// Directory receiving CSV exports, if any
    pub output_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::new(),
            delimiter: ',',
            target_resource: "BEL 2-02".to_string(),
            family_prefix: "BEL".to_string(),
            parallel: false,
            num_workers: num_cpus::get(),
            output_dir: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.delimiter.is_ascii() {
            return Err(AnalysisError::Configuration(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        if self.parallel && self.num_workers == 0 {
            return Err(AnalysisError::Configuration(
                "num_workers must be at least 1 in parallel mode".to_string(),
            ));
        }
        if self.family_prefix.is_empty() {
            return Err(AnalysisError::Configuration(
                "family prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub fn aggregation_mode(&self) -> AggregationMode {
        if self.parallel {
            AggregationMode::Parallel {
                workers: self.num_workers,
            }
        } else {
            AggregationMode::Sequential
        }
    }
}

/// Render streak durations the way they appear in reports: `[0.75, 0.25]`
pub fn format_hours(hours: &[f64]) -> String {
    let items: Vec<String> = hours.iter().map(|h| format!("{}", h)).collect();
    format!("[{}]", items.join(", "))
}

fn serialize_hours<S: Serializer>(hours: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(&[]), "[]");
        assert_eq!(format_hours(&[0.75, 0.25]), "[0.75, 0.25]");
        assert_eq!(format_hours(&[2.0]), "[2]");
    }

    #[test]
    fn test_config_validation() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());

        let config = AnalysisConfig {
            delimiter: 'ł',
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::Configuration(_))
        ));

        let config = AnalysisConfig {
            parallel: true,
            num_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aggregation_mode_follows_parallel_flag() {
        let config = AnalysisConfig {
            parallel: true,
            num_workers: 3,
            ..Default::default()
        };
        assert_eq!(
            config.aggregation_mode(),
            AggregationMode::Parallel { workers: 3 }
        );
        assert_eq!(
            AnalysisConfig::default().aggregation_mode(),
            AggregationMode::Sequential
        );
    }
}
