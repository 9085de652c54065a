//! Period aggregation for trend and forecast inputs.
//!
//! Turns raw (possibly unsorted, duplicate-timestamped) transaction rows into
//! one summed row per calendar period. Rows whose date or value fails to
//! coerce are dropped silently; only the aggregate dropped count is logged.
//! Periods with zero activity are not synthesized — gaps stay absent.

use crate::dataset::Dataset;
use crate::resolver::{ColumnMap, Role};
use crate::AnalyticsError;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar bucket width for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(Granularity::Day),
            "month" => Some(Granularity::Month),
            _ => None,
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the period immediately after the one starting at `period`.
    pub fn next_period(&self, period: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => period.succ_opt().unwrap_or(period),
            Granularity::Month => period
                .checked_add_months(Months::new(1))
                .unwrap_or(period),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One aggregated (period, value) pair. `period` is the first day of the
/// calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period: NaiveDate,
    pub value: f64,
}

/// Aggregate a date + value column pair into one summed row per period,
/// ascending by period.
///
/// Requires the date and value roles to be resolved; an empty dataset (or one
/// where every row drops) yields an empty series rather than an error so trend
/// pages can render a "no data" state.
pub fn prepare_time_series(
    dataset: &Dataset,
    columns: &ColumnMap,
    value_role: Role,
    granularity: Granularity,
) -> Result<Vec<PeriodValue>, AnalyticsError> {
    let date_col = columns.require(Role::Date)?;
    let value_col = columns.require(value_role)?;

    let dates = dataset
        .column(date_col)
        .ok_or(AnalyticsError::MissingColumn(Role::Date))?;
    let values = dataset
        .column(value_col)
        .ok_or(AnalyticsError::MissingColumn(value_role))?;

    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut dropped: usize = 0;

    for (date_cell, value_cell) in dates.values.iter().zip(values.values.iter()) {
        match (date_cell.as_date(), value_cell.as_f64()) {
            (Some(date), Some(value)) => {
                *buckets.entry(granularity.period_start(date)).or_insert(0.0) += value;
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(
            dropped,
            granularity = granularity.as_str(),
            "rows dropped during time-series preparation"
        );
    }

    Ok(buckets
        .into_iter()
        .map(|(period, value)| PeriodValue { period, value })
        .collect())
}

/// (year, month) of the latest parseable date in the resolved date column.
/// Used as the reference point for month-over-month KPIs.
pub fn latest_month(dataset: &Dataset, columns: &ColumnMap) -> Option<(i32, u32)> {
    let date_col = columns.get(Role::Date)?;
    let column = dataset.column(date_col)?;
    column
        .values
        .iter()
        .filter_map(|v| v.as_date())
        .max()
        .map(|d| (d.year(), d.month()))
}

/// Latest parseable date in the resolved date column.
pub fn max_date(dataset: &Dataset, columns: &ColumnMap) -> Option<NaiveDate> {
    let date_col = columns.get(Role::Date)?;
    let column = dataset.column(date_col)?;
    column.values.iter().filter_map(|v| v.as_date()).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::resolver::resolve_columns;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sales_dataset() -> Dataset {
        Dataset::from_columns(vec![
            (
                "date",
                vec![
                    Value::Date(ymd(2024, 1, 5)),
                    Value::Date(ymd(2024, 1, 20)),
                    Value::Date(ymd(2024, 2, 10)),
                ],
            ),
            (
                "sales",
                vec![Value::Float(100.0), Value::Float(50.0), Value::Float(200.0)],
            ),
        ])
    }

    #[test]
    fn test_monthly_aggregation() {
        let ds = sales_dataset();
        let map = resolve_columns(&ds);
        let series = prepare_time_series(&ds, &map, Role::Sales, Granularity::Month).unwrap();
        assert_eq!(
            series,
            vec![
                PeriodValue {
                    period: ymd(2024, 1, 1),
                    value: 150.0
                },
                PeriodValue {
                    period: ymd(2024, 2, 1),
                    value: 200.0
                },
            ]
        );
    }

    #[test]
    fn test_daily_aggregation_sums_duplicates() {
        let ds = Dataset::from_columns(vec![
            (
                "date",
                vec![
                    Value::Date(ymd(2024, 3, 1)),
                    Value::Date(ymd(2024, 3, 1)),
                    Value::Date(ymd(2024, 2, 28)),
                ],
            ),
            (
                "sales",
                vec![Value::Float(10.0), Value::Float(15.0), Value::Float(5.0)],
            ),
        ]);
        let map = resolve_columns(&ds);
        let series = prepare_time_series(&ds, &map, Role::Sales, Granularity::Day).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].period, ymd(2024, 2, 28));
        assert_eq!(series[1].value, 25.0);
    }

    #[test]
    fn test_unparseable_rows_are_dropped() {
        let ds = Dataset::from_columns(vec![
            (
                "date",
                vec![
                    Value::Str("2024-01-05".into()),
                    Value::Str("not a date".into()),
                ],
            ),
            ("sales", vec![Value::Float(100.0), Value::Float(999.0)]),
        ]);
        let map = resolve_columns(&ds);
        let series = prepare_time_series(&ds, &map, Role::Sales, Granularity::Month).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 100.0);
    }

    #[test]
    fn test_preparation_is_idempotent() {
        let ds = sales_dataset();
        let map = resolve_columns(&ds);
        let once = prepare_time_series(&ds, &map, Role::Sales, Granularity::Month).unwrap();

        let again_input = Dataset::from_columns(vec![
            (
                "date",
                once.iter().map(|p| Value::Date(p.period)).collect::<Vec<_>>(),
            ),
            (
                "sales",
                once.iter().map(|p| Value::Float(p.value)).collect::<Vec<_>>(),
            ),
        ]);
        let again_map = resolve_columns(&again_input);
        let twice =
            prepare_time_series(&again_input, &again_map, Role::Sales, Granularity::Month)
                .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_roles_error() {
        let ds = Dataset::from_columns(vec![("sales", vec![Value::Float(1.0)])]);
        let map = resolve_columns(&ds);
        let err = prepare_time_series(&ds, &map, Role::Sales, Granularity::Month).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn(Role::Date)));
    }

    #[test]
    fn test_empty_dataset_yields_empty_series() {
        let ds = Dataset::from_columns(vec![
            ("date", Vec::<Value>::new()),
            ("sales", Vec::new()),
        ]);
        let map = resolve_columns(&ds);
        let series = prepare_time_series(&ds, &map, Role::Sales, Granularity::Month).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_period_arithmetic() {
        assert_eq!(
            Granularity::Month.period_start(ymd(2024, 12, 31)),
            ymd(2024, 12, 1)
        );
        assert_eq!(
            Granularity::Month.next_period(ymd(2024, 12, 1)),
            ymd(2025, 1, 1)
        );
        assert_eq!(Granularity::Day.next_period(ymd(2024, 2, 28)), ymd(2024, 2, 29));
        assert_eq!(Granularity::Day.period_start(ymd(2024, 2, 28)), ymd(2024, 2, 28));
    }

    #[test]
    fn test_latest_month_and_max_date() {
        let ds = sales_dataset();
        let map = resolve_columns(&ds);
        assert_eq!(latest_month(&ds, &map), Some((2024, 2)));
        assert_eq!(max_date(&ds, &map), Some(ymd(2024, 2, 10)));
    }
}
