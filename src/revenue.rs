//! Net Revenue
//!
//! `net_revenue = quantity * price * (1 - normalized_discount)`.
//!
//! Discounts arrive either as fractions (0.15) or percentages (15). Any value
//! above 1 is read as a percentage. This is a heuristic: a discount of exactly
//! 1.0 means 100 %, and a true discount above 100 % is indistinguishable from a
//! percentage. It is kept as is.

use crate::config::AnalysisConfig;
use crate::dataset::{has_column, numeric_values};
use crate::error::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Normalize one discount value to a fraction. Missing means no discount.
pub fn normalize_discount_value(value: Option<f64>) -> f64 {
    match value {
        Some(d) if d > 1.0 => d / 100.0,
        Some(d) => d,
        None => 0.0,
    }
}

pub fn normalize_discount(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().copied().map(normalize_discount_value).collect()
}

/// Row-wise net revenue. `discount` is `None` when the dataset has no
/// discount column. Rows missing quantity or price yield `None`.
pub fn compute_net_revenue(
    quantity: &[Option<f64>],
    price: &[Option<f64>],
    discount: Option<&[Option<f64>]>,
) -> Vec<Option<f64>> {
    quantity
        .iter()
        .zip(price)
        .enumerate()
        .map(|(row, (q, p))| {
            let d = discount.and_then(|d| d.get(row).copied().flatten());
            let fraction = normalize_discount_value(d);
            match (q, p) {
                (Some(q), Some(p)) => Some(q * p * (1.0 - fraction)),
                _ => None,
            }
        })
        .collect()
}

/// Net revenue for every row of `df`, or `None` when quantity or price is absent.
pub fn net_revenue_series(df: &DataFrame, config: &AnalysisConfig) -> Result<Option<Series>> {
    if !has_column(df, &config.quantity_column) || !has_column(df, &config.price_column) {
        debug!(
            "Skipping {}: needs '{}' and '{}'",
            config.measure_column, config.quantity_column, config.price_column
        );
        return Ok(None);
    }

    let quantity = numeric_values(df, &config.quantity_column)?;
    let price = numeric_values(df, &config.price_column)?;
    let discount = if has_column(df, &config.discount_column) {
        Some(numeric_values(df, &config.discount_column)?)
    } else {
        None
    };

    let values = compute_net_revenue(&quantity, &price, discount.as_deref());
    Ok(Some(Series::new(&config.measure_column, values)))
}

/// Attach the measure column to a copy of `df`, replacing any earlier one.
pub fn with_net_revenue(df: &DataFrame, config: &AnalysisConfig) -> Result<Option<DataFrame>> {
    let series = match net_revenue_series(df, config)? {
        Some(s) => s,
        None => return Ok(None),
    };

    let missing = series.null_count();
    let mut out = df.clone();
    out.with_column(series)?;
    info!(
        "Computed {} for {} rows ({} missing)",
        config.measure_column,
        out.height(),
        missing
    );
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_discount_rule() {
        assert_eq!(normalize_discount_value(None), 0.0);
        assert_eq!(normalize_discount_value(Some(0.0)), 0.0);
        assert_eq!(normalize_discount_value(Some(0.25)), 0.25);
        // exactly 1.0 is a full discount, not 1 %
        assert_eq!(normalize_discount_value(Some(1.0)), 1.0);
        assert!(close(normalize_discount_value(Some(15.0)), 0.15));
        assert!(close(normalize_discount_value(Some(100.0)), 1.0));
        assert!(close(normalize_discount_value(Some(150.0)), 1.5));
    }

    #[test]
    fn test_normalized_discount_in_unit_range() {
        for i in 0..=1000 {
            let d = i as f64 / 10.0;
            let n = normalize_discount_value(Some(d));
            assert!((0.0..=1.0).contains(&n), "{} normalized to {}", d, n);
        }
    }

    #[test]
    fn test_mixed_units() {
        let out = compute_net_revenue(
            &[Some(2.0), Some(1.0)],
            &[Some(100.0), Some(50.0)],
            Some(&[Some(0.1), Some(15.0)][..]),
        );
        assert!(close(out[0].unwrap(), 180.0));
        assert!(close(out[1].unwrap(), 42.5));
    }

    #[test]
    fn test_missing_operands() {
        let out = compute_net_revenue(
            &[None, Some(3.0), Some(4.0)],
            &[Some(10.0), None, Some(5.0)],
            Some(&[Some(0.5), Some(0.5), None][..]),
        );
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(close(out[2].unwrap(), 20.0));
    }

    #[test]
    fn test_without_discount_column() {
        let out = compute_net_revenue(&[Some(3.0)], &[Some(2.5)], None);
        assert_eq!(out, vec![Some(7.5)]);
    }

    #[test]
    fn test_with_net_revenue_attaches_column() {
        let df = df! [
            "quantity" => [2i64, 1],
            "price" => [100.0, 50.0],
            "discount" => ["0.1", "oops"]
        ]
        .unwrap();
        let out = with_net_revenue(&df, &AnalysisConfig::default()).unwrap().unwrap();
        let revenue = numeric_values(&out, "net_revenue").unwrap();
        assert!(close(revenue[0].unwrap(), 180.0));
        // unparseable discount counts as no discount
        assert!(close(revenue[1].unwrap(), 50.0));
    }

    #[test]
    fn test_with_net_revenue_needs_quantity_and_price() {
        let df = df! [ "price" => [1.0, 2.0] ].unwrap();
        assert!(with_net_revenue(&df, &AnalysisConfig::default()).unwrap().is_none());
    }
}
