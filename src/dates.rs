//! Date Normalization
//!
//! Turns a heterogeneous date-like column into timezone-naive date-times.
//! Values that cannot be parsed become null; nothing here fails on bad data.

use crate::error::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone as _};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;
use tracing::warn;

lazy_static! {
    // Trailing zero-offset markers: "...10:00:00Z", "... 10:00 UTC", "2024-01-05 GMT"
    static ref UTC_MARKER: Regex = Regex::new(r"(?i)(\d)\s*(?:z|utc|gmt)$").unwrap();
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

/// Parse a single textual value into a naive date-time.
///
/// Offset-carrying values keep their local wall-clock time and lose the
/// offset, so "2024-03-01T23:30:00+05:00" becomes 2024-03-01 23:30:00.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_local());
        }
    }

    let value = UTC_MARKER.replace(value, "$1");
    let value = value.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Time zone attached to a typed `Datetime` column.
enum ColumnZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl ColumnZone {
    fn parse(name: &str) -> Option<Self> {
        if let Ok(tz) = name.parse::<Tz>() {
            return Some(Self::Named(tz));
        }
        name.parse::<FixedOffset>().ok().map(Self::Fixed)
    }

    fn local(&self, utc: &NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Named(tz) => tz.from_utc_datetime(utc).naive_local(),
            Self::Fixed(offset) => offset.from_utc_datetime(utc).naive_local(),
        }
    }
}

/// Read any column as naive date-times, one entry per row.
///
/// A zoned `Datetime` column yields its local wall-clock time in that zone,
/// matching how offset-carrying strings are read.
pub fn datetime_values(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    let values: Vec<Option<NaiveDateTime>> = match series.dtype() {
        DataType::Datetime(_, Some(tz)) => {
            let instants = series.datetime()?.as_datetime_iter();
            match ColumnZone::parse(tz) {
                Some(zone) => instants.map(|v| v.map(|utc| zone.local(&utc))).collect(),
                None => {
                    warn!("Unknown time zone '{}' on {}, reading as UTC", tz, series.name());
                    instants.collect()
                }
            }
        }
        DataType::Datetime(_, None) => series.datetime()?.as_datetime_iter().collect(),
        DataType::Date => series
            .date()?
            .as_date_iter()
            .map(|d| d.and_then(|d| d.and_hms_opt(0, 0, 0)))
            .collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_datetime))
            .collect(),
        DataType::Null => vec![None; series.len()],
        _ => {
            let as_text = series.cast(&DataType::String)?;
            as_text
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_datetime))
                .collect()
        }
    };
    Ok(values)
}

/// Normalize a date-like column to timezone-naive date-times under the same name.
pub fn normalize_date(column: &Series) -> Result<Series> {
    let values = datetime_values(column)?;
    Ok(Series::new(column.name(), values))
}

/// Replace `column` in `df` with its normalized form. A frame without the
/// column is returned unchanged.
pub fn with_normalized_date(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let mut out = df.clone();
    if let Ok(series) = df.column(column) {
        let normalized = normalize_date(series)?;
        out.with_column(normalized)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn test_parse_plain_forms() {
        assert_eq!(parse_datetime("2024-01-05"), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parse_datetime("2024/01/05"), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parse_datetime("01/05/2024"), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parse_datetime("2024-01-05 14:30:00"), Some(dt(2024, 1, 5, 14, 30, 0)));
        assert_eq!(parse_datetime("2024-01-05T14:30"), Some(dt(2024, 1, 5, 14, 30, 0)));
        assert_eq!(parse_datetime("5 Jan 2024"), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parse_datetime("Jan 5, 2024"), Some(dt(2024, 1, 5, 0, 0, 0)));
    }

    #[test]
    fn test_offsets_keep_wall_clock() {
        assert_eq!(
            parse_datetime("2024-03-01T23:30:00+05:00"),
            Some(dt(2024, 3, 1, 23, 30, 0))
        );
        assert_eq!(
            parse_datetime("2024-03-01 23:30:00-0800"),
            Some(dt(2024, 3, 1, 23, 30, 0))
        );
        assert_eq!(parse_datetime("2024-03-01T08:00:00Z"), Some(dt(2024, 3, 1, 8, 0, 0)));
        assert_eq!(parse_datetime("2024-03-01 08:00:00 UTC"), Some(dt(2024, 3, 1, 8, 0, 0)));
    }

    #[test]
    fn test_offsets_without_seconds() {
        assert_eq!(parse_datetime("2024-03-01T08:00+05:30"), Some(dt(2024, 3, 1, 8, 0, 0)));
        assert_eq!(parse_datetime("2024-03-01 22:15-04:00"), Some(dt(2024, 3, 1, 22, 15, 0)));
        assert_eq!(parse_datetime("2024-03-01T08:00+0530"), Some(dt(2024, 3, 1, 8, 0, 0)));
    }

    fn zoned(utc: NaiveDateTime, tz: &str) -> Series {
        let nanos = utc.and_utc().timestamp_nanos_opt().unwrap();
        Int64Chunked::from_slice_options("order_date", &[Some(nanos), None])
            .into_datetime(TimeUnit::Nanoseconds, Some(tz.to_string()))
            .into_series()
    }

    #[test]
    fn test_zoned_column_keeps_local_time() {
        // 23:30 UTC is 05:00 the next morning in Kolkata
        let s = zoned(dt(2024, 3, 1, 23, 30, 0), "Asia/Kolkata");
        let out = normalize_date(&s).unwrap();

        assert!(matches!(out.dtype(), DataType::Datetime(_, None)));
        assert_eq!(datetime_values(&out).unwrap(), vec![Some(dt(2024, 3, 2, 5, 0, 0)), None]);

        let fixed = zoned(dt(2024, 3, 1, 23, 30, 0), "-08:00");
        assert_eq!(datetime_values(&fixed).unwrap()[0], Some(dt(2024, 3, 1, 15, 30, 0)));
    }

    #[test]
    fn test_garbage_is_missing() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
    }

    #[test]
    fn test_normalize_string_column() {
        let s = Series::new(
            "order_date",
            &[Some("2024-01-05"), None, Some("bogus"), Some("2024-01-06T10:00:00+02:00")],
        );
        let out = normalize_date(&s).unwrap();

        assert_eq!(out.name(), "order_date");
        assert!(matches!(out.dtype(), DataType::Datetime(_, None)));
        let values = datetime_values(&out).unwrap();
        assert_eq!(
            values,
            vec![Some(dt(2024, 1, 5, 0, 0, 0)), None, None, Some(dt(2024, 1, 6, 10, 0, 0))]
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let s = Series::new("d", &[Some("2024-02-29 12:00:00"), None]);
        let once = normalize_date(&s).unwrap();
        let twice = normalize_date(&once).unwrap();
        assert_eq!(datetime_values(&once).unwrap(), datetime_values(&twice).unwrap());
    }

    #[test]
    fn test_numeric_column_is_mostly_missing() {
        let s = Series::new("d", &[1.5f64, 2.0]);
        let out = normalize_date(&s).unwrap();
        assert_eq!(out.null_count(), 2);
    }
}
