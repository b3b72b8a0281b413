//! Derived metrics and aggregates for e-commerce order datasets.
//!
//! Load a CSV of orders, normalize its date column, derive `net_revenue`
//! from quantity, price and discount, then produce grouped sums, a daily
//! series, a correlation matrix and data-quality summaries.

pub mod aggregate;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod quality;
pub mod report;
pub mod revenue;

pub use aggregate::{
    daily_aggregate, group_sum, value_counts, DailyTotal, GroupKey, GroupSum, ValueCounts,
};
pub use config::AnalysisConfig;
pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use dataset::{load_csv, ColumnRoles, RowFilter};
pub use dates::normalize_date;
pub use error::{EdaError, Result};
pub use report::{EdaReport, PreparedDataset};
pub use revenue::{compute_net_revenue, normalize_discount};
