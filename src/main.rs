use orderlens::aggregate;
use orderlens::config::AnalysisConfig;
use orderlens::correlation;
use orderlens::dataset::{self, RowFilter};
use orderlens::report::{EdaReport, PreparedDataset};

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orderlens")]
#[command(about = "Derived revenue metrics and summaries for order datasets")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and emit a JSON report
    Report {
        /// Orders CSV file
        csv: PathBuf,

        /// JSON analysis config (defaults apply for missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep only rows where COLUMN equals VALUE (repeatable)
        #[arg(long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,

        /// First order date to keep (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last order date to keep (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Net revenue summed by a categorical column
    Revenue {
        /// Orders CSV file
        csv: PathBuf,

        /// Column to group by (e.g. category, region, payment_method)
        #[arg(long)]
        by: String,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Net revenue per calendar day
    Daily {
        /// Orders CSV file
        csv: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Correlation matrix over numeric, non-identifier columns
    Corr {
        /// Orders CSV file
        csv: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Report { csv, config, output, filters, from, to, pretty } => {
            run_report(&csv, config.as_deref(), output, &filters, from, to, pretty)
        }
        Commands::Revenue { csv, by, config } => run_revenue(&csv, &by, config.as_deref()),
        Commands::Daily { csv, config } => run_daily(&csv, config.as_deref()),
        Commands::Corr { csv, config } => run_corr(&csv, config.as_deref()),
    }
}

fn prepare(
    csv: &Path,
    config: &AnalysisConfig,
    filter: Option<&RowFilter>,
) -> Result<PreparedDataset> {
    let df = dataset::load_csv(csv, config)?;
    Ok(PreparedDataset::prepare(&df, config, filter)?)
}

fn run_report(
    csv: &Path,
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    filters: &[String],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    pretty: bool,
) -> Result<()> {
    let config = AnalysisConfig::resolve(config_path)?;

    let mut filter = RowFilter::new().with_date_range(from, to);
    for assignment in filters {
        filter.add_assignment(assignment)?;
    }
    let filter = (!filter.is_empty()).then_some(filter);

    let prepared = prepare(csv, &config, filter.as_ref())?;
    let report = EdaReport::from_prepared(&prepared, &config)?;
    let json = report.to_json(pretty)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_revenue(csv: &Path, by: &str, config_path: Option<&Path>) -> Result<()> {
    let config = AnalysisConfig::resolve(config_path)?;
    let prepared = prepare(csv, &config, None)?;
    if !prepared.has_measure {
        bail!(
            "'{}' and '{}' are required to compute '{}'",
            config.quantity_column,
            config.price_column,
            config.measure_column
        );
    }
    if !prepared.measure_usable(&config)? {
        bail!("'{}' has no values", config.measure_column);
    }

    let result = aggregate::group_sum(&prepared.frame, by, &config.measure_column)?;
    println!("{}\t{}", by, config.measure_column);
    for group in &result.groups {
        println!("{}\t{:.2}", group.key, group.total);
    }
    Ok(())
}

fn run_daily(csv: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = AnalysisConfig::resolve(config_path)?;
    let prepared = prepare(csv, &config, None)?;
    if !prepared.has_dates || !prepared.has_measure {
        bail!(
            "a valid '{}' and a computed '{}' are required",
            config.date_column,
            config.measure_column
        );
    }

    let daily =
        aggregate::daily_aggregate(&prepared.frame, &config.date_column, &config.measure_column)?;
    println!("date\t{}", config.measure_column);
    for day in &daily {
        println!("{}\t{:.2}", day.date, day.total);
    }
    Ok(())
}

fn run_corr(csv: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = AnalysisConfig::resolve(config_path)?;
    let prepared = prepare(csv, &config, None)?;
    let columns = &prepared.roles.numeric;
    if columns.len() < 2 {
        bail!(
            "need at least two numeric columns for correlation, found [{}]",
            columns.iter().join(", ")
        );
    }

    let matrix = correlation::correlation_matrix(&prepared.frame, columns)?;
    println!("\t{}", matrix.columns.iter().join("\t"));
    for (name, row) in matrix.columns.iter().zip(&matrix.values) {
        let cells = row
            .iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |r| format!("{:.3}", r)))
            .join("\t");
        println!("{}\t{}", name, cells);
    }
    Ok(())
}
