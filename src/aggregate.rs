//! Grouped Aggregates
//!
//! Sum of a measure per categorical key, per calendar day, and plain value
//! counts. Results are ordered for presentation and can be turned back into
//! a `DataFrame` for charting.

use crate::dataset::{numeric_values, require_column, series_text_values};
use crate::dates;
use crate::error::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Partition key. Missing values form their own group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Value(String),
    Missing,
}

impl GroupKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GroupKey::Value(v) => Some(v),
            GroupKey::Missing => None,
        }
    }
}

impl From<Option<String>> for GroupKey {
    fn from(value: Option<String>) -> Self {
        value.map_or(GroupKey::Missing, GroupKey::Value)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Value(v) => write!(f, "{}", v),
            GroupKey::Missing => write!(f, "(missing)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: GroupKey,
    pub total: f64,
    /// Rows in the partition, including those with a missing measure
    pub rows: usize,
}

/// Measure summed per key, largest total first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSum {
    pub key_column: String,
    pub measure_column: String,
    pub groups: Vec<GroupTotal>,
}

impl GroupSum {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.groups
            .iter()
            .find(|g| g.key.as_str() == Some(key))
            .map(|g| g.total)
    }

    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.total).sum()
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let keys: Vec<Option<String>> = self
            .groups
            .iter()
            .map(|g| g.key.as_str().map(str::to_string))
            .collect();
        let totals: Vec<f64> = self.groups.iter().map(|g| g.total).collect();
        Ok(DataFrame::new(vec![
            Series::new(&self.key_column, keys),
            Series::new(&self.measure_column, totals),
        ])?)
    }
}

/// Sum `measures` per distinct key. Missing measures add nothing to their
/// group. Ordered by descending total; equal totals keep first-seen order.
pub fn group_sum_values(keys: &[Option<String>], measures: &[Option<f64>]) -> Vec<GroupTotal> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();

    for (key, measure) in keys.iter().zip(measures) {
        let key = GroupKey::from(key.clone());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupTotal { key, total: 0.0, rows: 0 });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += measure.unwrap_or(0.0);
        group.rows += 1;
    }

    groups.sort_by(|a, b| b.total.total_cmp(&a.total));
    groups
}

/// Sum `measure_column` per distinct value of `key_column`.
///
/// Callers skip this when the measure is entirely missing.
pub fn group_sum(df: &DataFrame, key_column: &str, measure_column: &str) -> Result<GroupSum> {
    let keys = series_text_values(require_column(df, key_column)?)?;
    let measures = numeric_values(df, measure_column)?;
    let groups = group_sum_values(&keys, &measures);
    debug!("{} by {}: {} groups", measure_column, key_column, groups.len());

    Ok(GroupSum {
        key_column: key_column.to_string(),
        measure_column: measure_column.to_string(),
        groups,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

/// Measure summed per calendar day, oldest first. Rows whose date is
/// missing or unparseable are dropped.
pub fn daily_aggregate(
    df: &DataFrame,
    date_column: &str,
    measure_column: &str,
) -> Result<Vec<DailyTotal>> {
    let stamps = dates::datetime_values(require_column(df, date_column)?)?;
    let measures = numeric_values(df, measure_column)?;

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (stamp, measure) in stamps.into_iter().zip(measures) {
        if let Some(stamp) = stamp {
            *by_day.entry(stamp.date()).or_insert(0.0) += measure.unwrap_or(0.0);
        }
    }

    debug!("Daily {}: {} days", measure_column, by_day.len());
    Ok(by_day
        .into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect())
}

pub fn daily_to_frame(
    daily: &[DailyTotal],
    date_column: &str,
    measure_column: &str,
) -> Result<DataFrame> {
    let days: Vec<NaiveDate> = daily.iter().map(|d| d.date).collect();
    let totals: Vec<f64> = daily.iter().map(|d| d.total).collect();
    Ok(DataFrame::new(vec![
        Series::new(date_column, days),
        Series::new(measure_column, totals),
    ])?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub key: GroupKey,
    pub count: usize,
    /// Share of all rows, rounded to two decimals
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCounts {
    pub column: String,
    pub distinct: usize,
    pub entries: Vec<ValueCount>,
}

/// Rows per distinct value, most frequent first, cut to `limit` entries.
pub fn value_counts(df: &DataFrame, column: &str, limit: Option<usize>) -> Result<ValueCounts> {
    let keys = series_text_values(require_column(df, column)?)?;
    let rows = keys.len();
    let ones = vec![Some(1.0); rows];

    let groups = group_sum_values(&keys, &ones);
    let distinct = groups.len();
    let entries = groups
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|g| ValueCount {
            key: g.key,
            count: g.rows,
            percent: crate::quality::round2(g.rows as f64 / rows as f64 * 100.0),
        })
        .collect();

    Ok(ValueCounts {
        column: column.to_string(),
        distinct,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(v: &[Option<&str>]) -> Vec<Option<String>> {
        v.iter().map(|k| k.map(str::to_string)).collect()
    }

    #[test]
    fn test_group_sum_orders_descending() {
        let groups = group_sum_values(
            &keys(&[Some("A"), Some("B"), Some("A")]),
            &[Some(10.0), Some(5.0), Some(3.0)],
        );
        let flat: Vec<(String, f64)> =
            groups.iter().map(|g| (g.key.to_string(), g.total)).collect();
        assert_eq!(flat, vec![("A".to_string(), 13.0), ("B".to_string(), 5.0)]);
    }

    #[test]
    fn test_missing_keys_and_measures() {
        let groups = group_sum_values(
            &keys(&[Some("A"), None, Some("A"), None]),
            &[Some(1.0), Some(2.0), None, Some(4.0)],
        );
        assert_eq!(groups[0].key, GroupKey::Missing);
        assert_eq!(groups[0].total, 6.0);
        assert_eq!(groups[1].key, GroupKey::Value("A".to_string()));
        assert_eq!(groups[1].total, 1.0);
        assert_eq!(groups[1].rows, 2);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let groups = group_sum_values(
            &keys(&[Some("z"), Some("a"), Some("m")]),
            &[Some(1.0), Some(1.0), Some(1.0)],
        );
        let order: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(order, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_group_sum_preserves_total() {
        let measures = [Some(1.25), None, Some(2.5), Some(-0.75), Some(10.0), None];
        let groups = group_sum_values(
            &keys(&[Some("x"), Some("y"), None, Some("x"), Some("z"), Some("z")]),
            &measures,
        );
        let grouped: f64 = groups.iter().map(|g| g.total).sum();
        let direct: f64 = measures.iter().flatten().sum();
        assert!((grouped - direct).abs() < 1e-9);
    }

    #[test]
    fn test_group_sum_orders_nan_totals() {
        // inf + -inf leaves group "w" with a NaN total
        let groups = group_sum_values(
            &keys(&[Some("w"), Some("b"), Some("w"), Some("c")]),
            &[Some(f64::INFINITY), Some(1.0), Some(f64::NEG_INFINITY), Some(2.0)],
        );
        assert_eq!(groups.len(), 3);
        let wild = GroupKey::Value("w".to_string());
        assert!(groups.iter().any(|g| g.key == wild && g.total.is_nan()));

        let finite: Vec<&GroupKey> = groups
            .iter()
            .filter(|g| !g.total.is_nan())
            .map(|g| &g.key)
            .collect();
        assert_eq!(
            finite,
            vec![&GroupKey::Value("c".to_string()), &GroupKey::Value("b".to_string())]
        );
    }

    #[test]
    fn test_group_sum_frame() {
        let df = df! [
            "category" => ["A", "B", "A"],
            "net_revenue" => [10.0, 5.0, 3.0]
        ]
        .unwrap();
        let result = group_sum(&df, "category", "net_revenue").unwrap();
        assert_eq!(result.get("A"), Some(13.0));
        assert_eq!(result.get("B"), Some(5.0));
        assert_eq!(result.total(), 18.0);

        let frame = result.to_frame().unwrap();
        assert_eq!(frame.shape(), (2, 2));
    }

    #[test]
    fn test_daily_aggregate_sorted_unique() {
        let df = df! [
            "order_date" => [
                Some("2024-01-03 09:00:00"),
                Some("2024-01-01"),
                None,
                Some("2024-01-03T18:30:00"),
                Some("junk"),
                Some("2024-01-02"),
            ],
            "net_revenue" => [Some(1.0), Some(2.0), Some(100.0), Some(3.0), Some(100.0), None]
        ]
        .unwrap();

        let daily = daily_aggregate(&df, "order_date", "net_revenue").unwrap();
        let days: Vec<String> = daily.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(daily[0].total, 2.0);
        assert_eq!(daily[1].total, 0.0);
        assert_eq!(daily[2].total, 4.0);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_value_counts() {
        let df = df! [
            "payment_method" => [Some("card"), Some("cash"), Some("card"), None, Some("card")]
        ]
        .unwrap();

        let counts = value_counts(&df, "payment_method", None).unwrap();
        assert_eq!(counts.distinct, 3);
        assert_eq!(counts.entries[0].key, GroupKey::Value("card".to_string()));
        assert_eq!(counts.entries[0].count, 3);
        assert_eq!(counts.entries[0].percent, 60.0);
        assert_eq!(counts.entries.iter().map(|e| e.count).sum::<usize>(), 5);

        let top = value_counts(&df, "payment_method", Some(1)).unwrap();
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.distinct, 3);
    }

    #[test]
    fn test_missing_key_serializes_as_null() {
        let json = serde_json::to_string(&GroupKey::Missing).unwrap();
        assert_eq!(json, "null");
        let json = serde_json::to_string(&GroupKey::Value("A".to_string())).unwrap();
        assert_eq!(json, "\"A\"");
    }
}
