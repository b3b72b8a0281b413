//! Data Quality & Summary Statistics
//!
//! Dataset shape, missing values, duplicate rows and describe-style numeric
//! statistics.

use crate::dataset::{numeric_values, series_numeric_values, series_text_values};
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataOverview {
    pub rows: usize,
    pub columns: usize,
    pub dtypes: Vec<ColumnType>,
}

impl DataOverview {
    pub fn of(df: &DataFrame) -> Self {
        Self {
            rows: df.height(),
            columns: df.width(),
            dtypes: df
                .get_columns()
                .iter()
                .map(|s| ColumnType {
                    name: s.name().to_string(),
                    dtype: s.dtype().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumn {
    pub name: String,
    pub missing_count: usize,
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSummary {
    pub total_missing_cells: usize,
    pub columns: Vec<MissingColumn>,
}

fn missing_in(series: &Series) -> Result<usize> {
    // NaN counts as missing in float columns
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            Ok(series_numeric_values(series)?.iter().filter(|v| v.is_none()).count())
        }
        _ => Ok(series.null_count()),
    }
}

pub fn missing_by_column(df: &DataFrame) -> Result<MissingSummary> {
    let rows = df.height();
    let mut columns = Vec::with_capacity(df.width());
    for series in df.get_columns() {
        let missing_count = missing_in(series)?;
        let missing_pct = if rows == 0 {
            0.0
        } else {
            round2(missing_count as f64 / rows as f64 * 100.0)
        };
        columns.push(MissingColumn {
            name: series.name().to_string(),
            missing_count,
            missing_pct,
        });
    }

    Ok(MissingSummary {
        total_missing_cells: columns.iter().map(|c| c.missing_count).sum(),
        columns,
    })
}

/// Rows identical in every column to an earlier row.
pub fn duplicate_rows(df: &DataFrame) -> Result<usize> {
    let rendered = df
        .get_columns()
        .iter()
        .map(series_text_values)
        .collect::<Result<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    for row in 0..df.height() {
        let key: Vec<Option<&str>> = rendered.iter().map(|col| col[row].as_deref()).collect();
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1)
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn summarize_values(column: &str, values: &[Option<f64>]) -> NumericSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    let std = match mean {
        Some(m) if count > 1 => {
            let ss: f64 = present.iter().map(|v| (v - m) * (v - m)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: present.first().copied(),
        p25: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        p75: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

pub fn numeric_summary(df: &DataFrame, columns: &[String]) -> Result<Vec<NumericSummary>> {
    columns
        .iter()
        .map(|c| numeric_values(df, c).map(|values| summarize_values(c, &values)))
        .collect()
}
