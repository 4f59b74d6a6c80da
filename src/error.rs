use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Missing timestamp column: expected dtime_utc or dtime")]
    MissingTimestampColumn,

    #[error("No records found for resource_code='{0}'")]
    NoRecords(String),

    #[error("No numeric wartosc values for resource_code='{0}'")]
    NoNumericValues(String),

    #[error("No positive wartosc values for resource_code='{0}'")]
    NoPositiveValues(String),

    #[error("No non-zero wartosc values for resource_code='{0}'")]
    NoNonZeroValues(String),

    #[error("No valid timestamp/wartosc rows for resource_code='{0}'")]
    NoValidRows(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    pub(crate) fn missing_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        AnalysisError::MissingColumns(names)
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
