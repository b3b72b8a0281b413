//! Pairwise Correlation
//!
//! Pearson correlation between numeric columns using pairwise-complete
//! observations: a row missing one of the two columns is left out of that
//! pair only.

use crate::dataset::numeric_values;
use crate::error::Result;
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Symmetric correlation matrix with a unit diagonal. Cells are `None` when
/// a pair has fewer than two complete rows or no variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// One row per column: a `column` label followed by one cell per column
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut series = Vec::with_capacity(self.len() + 1);
        series.push(Series::new("column", self.columns.clone()));
        for (j, name) in self.columns.iter().enumerate() {
            let cells: Vec<Option<f64>> = self.values.iter().map(|row| row[j]).collect();
            series.push(Series::new(name, cells));
        }
        Ok(DataFrame::new(series)?)
    }
}

/// Pearson correlation of the rows where both sides are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation matrix over `columns`. Callers pass at least two numeric,
/// non-identifier columns.
pub fn correlation_matrix(df: &DataFrame, columns: &[String]) -> Result<CorrelationMatrix> {
    let data = columns
        .iter()
        .map(|c| numeric_values(df, c))
        .collect::<Result<Vec<_>>>()?;

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for (i, row) in values.iter_mut().enumerate() {
        row[i] = Some(1.0);
    }
    for (i, j) in (0..n).tuple_combinations() {
        let r = pearson(&data[i], &data[j]);
        values[i][j] = r;
        values[j][i] = r;
    }

    debug!("Correlation over [{}]", columns.iter().join(", "));
    Ok(CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    })
}
