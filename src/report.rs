//! Analysis Report
//!
//! One full pass over a dataset snapshot: filter, normalize dates, derive
//! net revenue, then every summary and aggregate the data supports. Sections
//! the data cannot support are left empty with a note saying why.

use crate::aggregate::{self, DailyTotal, GroupSum, ValueCounts};
use crate::config::AnalysisConfig;
use crate::correlation::{self, CorrelationMatrix};
use crate::dataset::{has_column, numeric_values, ColumnRoles, RowFilter};
use crate::dates;
use crate::error::Result;
use crate::quality::{self, DataOverview, MissingSummary, NumericSummary};
use crate::revenue;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A dataset ready for analysis: filtered, dates normalized, measure attached.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub frame: DataFrame,
    pub roles: ColumnRoles,
    /// The measure column was derived (quantity and price exist)
    pub has_measure: bool,
    /// The date column exists and holds at least one valid date
    pub has_dates: bool,
}

impl PreparedDataset {
    pub fn prepare(
        df: &DataFrame,
        config: &AnalysisConfig,
        filter: Option<&RowFilter>,
    ) -> Result<Self> {
        let frame = match filter {
            Some(f) => f.apply(df, &config.date_column)?,
            None => df.clone(),
        };

        let frame = dates::with_normalized_date(&frame, &config.date_column)?;
        let has_dates = match frame.column(&config.date_column) {
            Ok(series) => series.null_count() < series.len(),
            Err(_) => false,
        };

        let (frame, has_measure) = match revenue::with_net_revenue(&frame, config)? {
            Some(with_measure) => (with_measure, true),
            None => (frame, false),
        };

        let roles = ColumnRoles::classify(&frame, config);
        Ok(Self {
            frame,
            roles,
            has_measure,
            has_dates,
        })
    }

    /// The measure exists and at least one row has a value
    pub fn measure_usable(&self, config: &AnalysisConfig) -> Result<bool> {
        if !self.has_measure {
            return Ok(false);
        }
        Ok(numeric_values(&self.frame, &config.measure_column)?
            .iter()
            .any(Option::is_some))
    }

    /// The filtered rows without the derived measure, for quality checks
    pub fn source_frame(&self, config: &AnalysisConfig) -> Result<DataFrame> {
        if self.has_measure {
            Ok(self.frame.drop(&config.measure_column)?)
        } else {
            Ok(self.frame.clone())
        }
    }

    /// Configured group columns present in the data, in configured order
    pub fn group_columns(&self, config: &AnalysisConfig) -> Vec<String> {
        config
            .group_candidates
            .iter()
            .filter(|c| has_column(&self.frame, c))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaReport {
    pub overview: DataOverview,
    pub missing: MissingSummary,
    pub duplicate_rows: usize,
    pub roles: ColumnRoles,
    pub numeric_summary: Vec<NumericSummary>,
    pub value_counts: Vec<ValueCounts>,
    pub revenue_by_group: Option<Vec<GroupSum>>,
    pub daily: Option<Vec<DailyTotal>>,
    pub correlation: Option<CorrelationMatrix>,
    pub notes: Vec<String>,
}

impl EdaReport {
    pub fn build(
        df: &DataFrame,
        config: &AnalysisConfig,
        filter: Option<&RowFilter>,
    ) -> Result<Self> {
        let prepared = PreparedDataset::prepare(df, config, filter)?;
        Self::from_prepared(&prepared, config)
    }

    pub fn from_prepared(prepared: &PreparedDataset, config: &AnalysisConfig) -> Result<Self> {
        let df = &prepared.frame;
        let roles = &prepared.roles;
        let mut notes = Vec::new();

        let source = prepared.source_frame(config)?;
        let overview = DataOverview::of(&source);
        let missing = quality::missing_by_column(&source)?;
        let duplicate_rows = quality::duplicate_rows(&source)?;
        info!(
            "Overview: {} rows, {} columns, {} missing cells, {} duplicate rows",
            overview.rows, overview.columns, missing.total_missing_cells, duplicate_rows
        );

        let numeric_summary = quality::numeric_summary(df, &roles.numeric)?;
        if roles.numeric.is_empty() {
            notes.push("No numeric columns available (excluding identifier columns).".to_string());
        }

        let value_counts = roles
            .categorical
            .iter()
            .map(|c| aggregate::value_counts(df, c, Some(config.top_categories)))
            .collect::<Result<Vec<_>>>()?;
        if roles.categorical.is_empty() {
            notes.push("No categorical columns to count.".to_string());
        }

        if !prepared.has_measure {
            notes.push(format!(
                "'{}' and '{}' are required to compute '{}'.",
                config.quantity_column, config.price_column, config.measure_column
            ));
        }

        let revenue_by_group = Self::revenue_breakdowns(prepared, config, &mut notes)?;
        let daily = Self::daily_series(prepared, config, &mut notes)?;

        let correlation = if roles.numeric.len() >= 2 {
            Some(correlation::correlation_matrix(df, &roles.numeric)?)
        } else {
            notes.push("Need at least two numeric columns for correlation.".to_string());
            None
        };

        for note in &notes {
            warn!("{}", note);
        }

        Ok(Self {
            overview,
            missing,
            duplicate_rows,
            roles: roles.clone(),
            numeric_summary,
            value_counts,
            revenue_by_group,
            daily,
            correlation,
            notes,
        })
    }

    fn revenue_breakdowns(
        prepared: &PreparedDataset,
        config: &AnalysisConfig,
        notes: &mut Vec<String>,
    ) -> Result<Option<Vec<GroupSum>>> {
        if !prepared.has_measure {
            return Ok(None);
        }
        if !prepared.measure_usable(config)? {
            notes.push(format!(
                "'{}' has no values; revenue breakdowns skipped.",
                config.measure_column
            ));
            return Ok(None);
        }
        let group_columns = prepared.group_columns(config);
        if group_columns.is_empty() {
            notes.push(format!(
                "None of the group columns [{}] exist; revenue breakdowns skipped.",
                config.group_candidates.join(", ")
            ));
            return Ok(None);
        }

        let breakdowns = group_columns
            .iter()
            .map(|c| aggregate::group_sum(&prepared.frame, c, &config.measure_column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(breakdowns))
    }

    fn daily_series(
        prepared: &PreparedDataset,
        config: &AnalysisConfig,
        notes: &mut Vec<String>,
    ) -> Result<Option<Vec<DailyTotal>>> {
        if !prepared.has_dates || !prepared.has_measure {
            notes.push(format!(
                "A valid '{}' and a computed '{}' are required for the daily series.",
                config.date_column, config.measure_column
            ));
            return Ok(None);
        }
        Ok(Some(aggregate::daily_aggregate(
            &prepared.frame,
            &config.date_column,
            &config.measure_column,
        )?))
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
