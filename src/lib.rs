// Re-export modules for external use
pub mod aggregator;
pub mod error;
pub mod loader;
pub mod report;
pub mod selector;
pub mod series;
pub mod stats;
pub mod streaks;
pub mod types;

pub use aggregator::{all_codes_stats, code_family, family_stats, family_subtotals, AggregateSummary};
pub use error::{AnalysisError, AnalysisResult};
pub use loader::{load_readings, validate_csv_extension};
pub use selector::{distinct_resource_codes, percentile_base_codes, records_for_resource};
pub use stats::{min_positive_per_resource, resource_value_stats};
pub use streaks::zero_streaks;
pub use types::{AggregationMode, AnalysisConfig, FamilySubtotal, ResourceStats, ZeroStreak};
