//! Dataset Access
//!
//! Loading order data from delimited text, typed column extraction with
//! lenient coercion, column role classification and row filtering.

use crate::config::AnalysisConfig;
use crate::dates;
use crate::error::{EdaError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Cell texts read as missing in any column.
const NULL_MARKERS: &[&str] = &["NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None"];

/// Load a CSV file with a header row. Dates are left as text here;
/// `dates::normalize_date` parses them.
///
/// A cell that does not fit its column's inferred type is read as missing,
/// so one bad value past the inference window never fails the load.
pub fn load_csv(path: impl AsRef<Path>, config: &AnalysisConfig) -> Result<DataFrame> {
    let path = path.as_ref();
    let null_values = NULL_MARKERS.iter().map(|m| m.to_string()).collect();
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(config.infer_schema_length))
        .with_null_values(Some(NullValues::AllColumns(null_values)))
        .with_ignore_errors(true)
        .finish()
        .map_err(|e| EdaError::Polars(format!("Failed to scan CSV {}: {}", path.display(), e)))?
        .collect()
        .map_err(|e| EdaError::Polars(format!("Failed to collect CSV {}: {}", path.display(), e)))?;

    info!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

pub fn require_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map_err(|_| EdaError::ColumnNotFound(column.to_string()))
}

pub fn has_column(df: &DataFrame, column: &str) -> bool {
    df.column(column).is_ok()
}

/// Column values as numbers. Text is trimmed and parsed, anything that does
/// not parse (and any NaN) is missing.
pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    series_numeric_values(require_column(df, column)?)
}

pub fn series_numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let values: Vec<Option<f64>> = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        DataType::Null => vec![None; series.len()],
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect(),
    };
    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Column values rendered as text, nulls kept as `None`.
pub fn text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    series_text_values(require_column(df, column)?)
}

pub fn series_text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let as_text = match series.dtype() {
        DataType::String => series.clone(),
        _ => series.cast(&DataType::String)?,
    };
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// How each column takes part in the analysis, in dataset order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Configured identifier columns present in the data
    pub identifiers: Vec<String>,

    /// Numeric, non-identifier columns
    pub numeric: Vec<String>,

    /// Non-numeric, non-identifier, non-temporal columns other than the date column
    pub categorical: Vec<String>,
}

impl ColumnRoles {
    pub fn classify(df: &DataFrame, config: &AnalysisConfig) -> Self {
        let mut roles = Self::default();

        for series in df.get_columns() {
            let name = series.name();
            if config.is_id_column(name) {
                roles.identifiers.push(name.to_string());
                continue;
            }
            let dtype = series.dtype();
            if dtype.is_numeric() {
                roles.numeric.push(name.to_string());
            } else if name != config.date_column
                && !matches!(dtype, DataType::Date | DataType::Datetime(_, _))
            {
                roles.categorical.push(name.to_string());
            }
        }

        debug!(
            "Column roles: {} identifier, {} numeric, {} categorical",
            roles.identifiers.len(),
            roles.numeric.len(),
            roles.categorical.len()
        );
        roles
    }
}

/// Restricts an analysis pass to a subset of rows.
///
/// Column filters AND together; an empty value list places no restriction on
/// its column. Date bounds are inclusive and compare calendar dates of the
/// normalized date column, dropping rows whose date is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub include: BTreeMap<String, Vec<String>>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an allowed value from a `column=value` assignment
    pub fn add_assignment(&mut self, assignment: &str) -> Result<()> {
        let (column, value) = assignment
            .split_once('=')
            .ok_or_else(|| {
                EdaError::InvalidFilter(format!("expected COLUMN=VALUE, got '{}'", assignment))
            })?;
        let column = column.trim();
        if column.is_empty() {
            return Err(EdaError::InvalidFilter(format!("missing column name in '{}'", assignment)));
        }
        self.include
            .entry(column.to_string())
            .or_default()
            .push(value.trim().to_string());
        Ok(())
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.values().all(|v| v.is_empty())
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn apply(&self, df: &DataFrame, date_column: &str) -> Result<DataFrame> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(EdaError::InvalidFilter(format!(
                    "date range is empty: {} > {}",
                    from, to
                )));
            }
        }
        if self.is_empty() {
            return Ok(df.clone());
        }

        let mut keep = vec![true; df.height()];

        for (column, allowed) in &self.include {
            if allowed.is_empty() {
                continue;
            }
            let values = text_values(df, column)?;
            for (flag, value) in keep.iter_mut().zip(values) {
                *flag = *flag && value.map_or(false, |v| allowed.contains(&v));
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let series = require_column(df, date_column)?;
            let values = dates::datetime_values(series)?;
            for (flag, value) in keep.iter_mut().zip(values) {
                let in_range = value.map_or(false, |dt| {
                    let day = dt.date();
                    self.date_from.map_or(true, |from| day >= from)
                        && self.date_to.map_or(true, |to| day <= to)
                });
                *flag = *flag && in_range;
            }
        }

        let mask: BooleanChunked = keep.into_iter().collect();
        let filtered = df.filter(&mask)?;
        info!("Filter kept {} of {} rows", filtered.height(), df.height());
        Ok(filtered)
    }
}
