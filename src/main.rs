use anyhow::{Context, Result};
use clap::Parser;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

use gen_jw_stats::aggregator::{all_codes_stats, family_stats, family_subtotals, AggregateSummary};
use gen_jw_stats::loader::{header_columns, load_readings, validate_csv_extension};
use gen_jw_stats::report::{
    records_to_dataframe, streaks_to_dataframe, subtotals_to_dataframe, write_records_csv,
    write_subtotals_csv, RecordLayout,
};
use gen_jw_stats::selector::{records_for_resource, EXCLUDED_PERCENTILE_CODE_PREFIXES};
use gen_jw_stats::stats::{min_positive_per_resource, resource_value_stats};
use gen_jw_stats::streaks::{longest_streak_hours, zero_streaks};
use gen_jw_stats::types::AnalysisConfig;

/// Columns shown for the minimum-positive rows, when present
const MINIMA_COLUMNS: [&str; 5] = ["resource_code", "wartosc", "dtime", "period", "power_plant"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the generation CSV file to analyse
    file_path: PathBuf,

    /// CSV delimiter character (default: ",")
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Resource code inspected in detail
    #[arg(short, long, default_value = "BEL 2-02")]
    resource: String,

    /// Resource-code prefix of the family-scoped statistics
    #[arg(short, long, default_value = "BEL")]
    family: String,

    /// Evaluate resource codes on a worker pool
    #[arg(long)]
    parallel: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    num_workers: Option<usize>,

    /// Directory for CSV exports of the aggregate tables
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Diagnostic log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

fn print_table(title: &str, df: &DataFrame, empty_message: &str) {
    println!("\n{}", title);
    if df.height() == 0 {
        println!("{}", empty_message);
    } else {
        println!("{}", df);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    // Print whole tables, as the report is read top to bottom
    std::env::set_var("POLARS_FMT_MAX_ROWS", "-1");
    std::env::set_var("POLARS_FMT_MAX_COLS", "-1");
    std::env::set_var("POLARS_FMT_STR_LEN", "200");

    let config = AnalysisConfig {
        file_path: args.file_path.clone(),
        delimiter: args.delimiter,
        target_resource: args.resource.clone(),
        family_prefix: args.family.clone(),
        parallel: args.parallel,
        num_workers: args.num_workers.unwrap_or_else(num_cpus::get),
        output_dir: args.output_dir.clone(),
    };
    config.validate().with_context(|| "Invalid arguments")?;

    if !validate_csv_extension(&config.file_path) {
        warn!("{} does not have a .csv extension", config.file_path.display());
    }

    let total_start = Instant::now();
    let mode = config.aggregation_mode();
    let target = config.target_resource.as_str();

    // Phase 1: load
    println!("[PHASE 1] Loading generation CSV...");
    let df = load_readings(&config.file_path, config.delimiter_byte())
        .with_context(|| format!("Failed to load file: {}", config.file_path.display()))?;

    println!(
        "[PHASE 1] ✅ Loaded {} rows x {} columns from: {}",
        df.height(),
        df.width(),
        config.file_path.display()
    );
    println!("\nHeaders:");
    println!("{:?}", header_columns(&df));
    println!("\nFirst rows:");
    println!("{}", df.head(Some(5)));

    // Phase 2: minimum positive value per resource
    println!("\n[PHASE 2] Minimum positive wartosc per resource_code...");
    let minima = min_positive_per_resource(&df).with_context(|| "Failed to compute minima")?;
    if minima.height() == 0 {
        println!("No positive values found.");
    } else {
        let present = header_columns(&minima);
        let shown: Vec<&str> = MINIMA_COLUMNS
            .iter()
            .filter(|name| present.iter().any(|col| col == *name))
            .copied()
            .collect();
        println!("{}", minima.select(shown)?);
    }

    // Phase 3: one resource in detail
    println!("\n[PHASE 3] Inspecting resource {}...", target);
    let target_df = records_for_resource(&df, target)?;
    println!("\nAll records for {}: {} rows", target, target_df.height());
    if target_df.height() == 0 {
        println!("No matching records found.");
    } else {
        println!("{}", target_df);
    }

    let value_stats = resource_value_stats(&df, target)
        .with_context(|| format!("Failed to compute value statistics for {}", target))?;
    println!("\n{} minimum non-zero wartosc: {:.4}", target, value_stats.min_positive);
    println!(
        "{} wartosc 5th percentile (bottom, excluding zeros): {:.4}",
        target, value_stats.p5_non_zero
    );

    let streaks = zero_streaks(&df, target)
        .with_context(|| format!("Failed to detect zero streaks for {}", target))?;
    print_table(
        &format!("{} zero-value streaks: {}", target, streaks.len()),
        &streaks_to_dataframe(&streaks)?,
        "No zero-value streaks found.",
    );
    if !streaks.is_empty() {
        println!("\nLongest zero streak (hours): {:.2}", longest_streak_hours(&streaks));
    }

    // Phase 4: family-scoped statistics
    println!("\n[PHASE 4] Statistics for {} codes...", config.family_prefix);
    let family = family_stats(&df, &config.family_prefix, mode)
        .with_context(|| format!("Failed to compute {} family statistics", config.family_prefix))?;
    print_table(
        &format!("All {} codes stats:", config.family_prefix),
        &records_to_dataframe(&family, RecordLayout::Family)?,
        &format!("No {} resource_code values found.", config.family_prefix),
    );
    if !family.is_empty() {
        let p5_total = AggregateSummary::from_records(&family).p5_total;
        println!(
            "\nTotal p5_non_zero_wartosc across {} codes: {:.4}",
            config.family_prefix, p5_total
        );
    }

    // Phase 5: all codes and family subtotals
    println!("\n[PHASE 5] Statistics for all resource codes...");
    let all = all_codes_stats(&df, mode).with_context(|| "Failed to compute statistics for all codes")?;
    print_table(
        "All resource_code stats:",
        &records_to_dataframe(&all, RecordLayout::AllCodes)?,
        "No resource_code values found.",
    );

    let subtotals = family_subtotals(&all);
    if !all.is_empty() {
        let summary = AggregateSummary::from_records(&all);
        println!(
            "\nPercentile base codes: {}/{} (excluded prefixes: {:?})",
            summary.percentile_base_count, summary.record_count, EXCLUDED_PERCENTILE_CODE_PREFIXES
        );
        println!("\nGrand total p1_non_zero_wartosc across all codes: {:.4}", summary.p1_total);
        println!("Grand total p2_non_zero_wartosc across all codes: {:.4}", summary.p2_total);
        println!("Grand total p3_non_zero_wartosc across all codes: {:.4}", summary.p3_total);
        println!("Grand total p5_non_zero_wartosc across all codes: {:.4}", summary.p5_total);

        print_table(
            "Subtotals by code family:",
            &subtotals_to_dataframe(&subtotals)?,
            "No families found.",
        );
    }

    // Phase 6: exports
    if let Some(output_dir) = &config.output_dir {
        println!("\n[PHASE 6] Writing results to {}...", output_dir.display());
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

        let stats_path = output_dir.join("all_codes_stats.csv");
        write_records_csv(&stats_path, &all)
            .with_context(|| format!("Failed to write {}", stats_path.display()))?;
        let subtotals_path = output_dir.join("family_subtotals.csv");
        write_subtotals_csv(&subtotals_path, &subtotals)
            .with_context(|| format!("Failed to write {}", subtotals_path.display()))?;

        println!("[PHASE 6] ✅ Wrote {} and {}", stats_path.display(), subtotals_path.display());
    }

    println!("\n========================");
    println!("TOTAL EXECUTION TIME:   {:.2}s", total_start.elapsed().as_secs_f64());
    println!("========================");

    Ok(())
}
