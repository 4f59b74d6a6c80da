use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{LOCAL_TIMESTAMP_COLUMN, UTC_TIMESTAMP_COLUMN};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Load a generation CSV file into a DataFrame.
///
/// Every column is read as text so the table keeps its original values;
/// numeric and timestamp coercion happens in the operations that need it.
pub fn load_readings<P: AsRef<Path>>(file_path: P, delimiter: u8) -> AnalysisResult<DataFrame> {
    let path = file_path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::FileNotFound(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        rows = df.height(),
        columns = df.width(),
        "loaded {}",
        path.display()
    );
    Ok(df)
}

/// Column names of a loaded table, in file order
pub fn header_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Fail with every missing column named when any of `required` is absent
pub fn require_columns(df: &DataFrame, required: &[&str]) -> AnalysisResult<()> {
    let present = df.get_column_names();
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| !present.contains(*name))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::missing_columns(missing))
    }
}

/// Pick the timestamp column: `dtime_utc` when present, otherwise `dtime`
pub fn timestamp_column(df: &DataFrame) -> AnalysisResult<&'static str> {
    let present = df.get_column_names();
    if present.contains(&UTC_TIMESTAMP_COLUMN) {
        Ok(UTC_TIMESTAMP_COLUMN)
    } else if present.contains(&LOCAL_TIMESTAMP_COLUMN) {
        Ok(LOCAL_TIMESTAMP_COLUMN)
    } else {
        Err(AnalysisError::MissingTimestampColumn)
    }
}

/// Validate that the file has a .csv extension
pub fn validate_csv_extension<P: AsRef<Path>>(file_path: P) -> bool {
    file_path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_extension_validation() {
        assert!(validate_csv_extension("PSE_gen-jw_2025-01.csv"));
        assert!(validate_csv_extension("test.CSV"));
        assert!(!validate_csv_extension("test.txt"));
        assert!(!validate_csv_extension("test"));
    }

    #[test]
    fn test_load_keeps_columns_as_text() -> anyhow::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "dtime_utc,resource_code,wartosc,power_plant")?;
        writeln!(temp_file, "2025-01-01 00:15:00,BEL 2-02,12.5,Belchatow")?;
        writeln!(temp_file, "2025-01-01 00:30:00,BEL 2-02,abc,Belchatow")?;

        let df = load_readings(temp_file.path(), b',')?;

        assert_eq!(df.height(), 2);
        assert_eq!(
            header_columns(&df),
            vec!["dtime_utc", "resource_code", "wartosc", "power_plant"]
        );
        let values = df.column("wartosc")?.str()?;
        assert_eq!(values.get(0), Some("12.5"));
        assert_eq!(values.get(1), Some("abc"));
        Ok(())
    }

    #[test]
    fn test_load_with_custom_delimiter() -> anyhow::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "dtime;resource_code;wartosc")?;
        writeln!(temp_file, "2025-01-01 00:15;KOZ 1-01;0")?;

        let df = load_readings(temp_file.path(), b';')?;

        assert_eq!(df.width(), 3);
        assert_eq!(timestamp_column(&df)?, "dtime");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = load_readings("/definitely/not/here.csv", b',');
        assert!(matches!(result, Err(AnalysisError::FileNotFound(_))));
    }

    #[test]
    fn test_require_columns_lists_all_missing() -> anyhow::Result<()> {
        let df = df!("dtime" => &["2025-01-01 00:00"])?;
        match require_columns(&df, &["wartosc", "resource_code", "dtime"]) {
            Err(AnalysisError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["resource_code", "wartosc"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_timestamp_column_prefers_utc() -> anyhow::Result<()> {
        let df = df!(
            "dtime" => &["2025-01-01 01:00"],
            "dtime_utc" => &["2025-01-01 00:00"]
        )?;
        assert_eq!(timestamp_column(&df)?, "dtime_utc");

        let df = df!("period" => &["00:00 - 00:15"])?;
        assert!(matches!(
            timestamp_column(&df),
            Err(AnalysisError::MissingTimestampColumn)
        ));
        Ok(())
    }
}
