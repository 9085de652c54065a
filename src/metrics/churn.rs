//! Churn / inactivity risk scoring.
//!
//! For each group (outlet, warehouse) the days since its most recent record
//! are measured against configurable thresholds and bucketed into risk tiers.
//! The reference "today" defaults to the dataset's own maximum date so runs
//! are reproducible; wall-clock time is a configurable alternative.

use crate::dataset::Dataset;
use crate::resolver::{ColumnMap, Role};
use crate::timeseries;
use crate::AnalyticsError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete risk tier. Ordering is by severity: Low < Medium < High.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }

    /// Numeric severity score: Low 1, Medium 2, High 3.
    pub fn score(&self) -> u8 {
        match self {
            RiskTier::Low => 1,
            RiskTier::Medium => 2,
            RiskTier::High => 3,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day thresholds for churn bucketing. More than `high_days` of inactivity is
/// High, more than `medium_days` is Medium, anything else Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnThresholds {
    pub high_days: i64,
    pub medium_days: i64,
}

impl Default for ChurnThresholds {
    fn default() -> Self {
        Self {
            high_days: 60,
            medium_days: 30,
        }
    }
}

impl ChurnThresholds {
    /// Bucket a number of inactive days. Monotonic: more days never lowers
    /// the tier.
    pub fn classify(&self, days_inactive: i64) -> RiskTier {
        if days_inactive > self.high_days {
            RiskTier::High
        } else if days_inactive > self.medium_days {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Which "today" to measure inactivity against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    /// The dataset's own maximum date. Reproducible; the default.
    #[default]
    DatasetMax,
    /// The wall clock at computation time.
    WallClock,
}

impl ReferencePoint {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dataset_max" => Some(ReferencePoint::DatasetMax),
            "wall_clock" => Some(ReferencePoint::WallClock),
            _ => None,
        }
    }

    fn resolve(&self, dataset: &Dataset, columns: &ColumnMap) -> Option<NaiveDate> {
        match self {
            ReferencePoint::DatasetMax => timeseries::max_date(dataset, columns),
            ReferencePoint::WallClock => Some(chrono::Utc::now().date_naive()),
        }
    }
}

/// Inactivity record for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnRecord {
    pub group: String,
    pub last_seen: NaiveDate,
    pub days_inactive: i64,
    pub tier: RiskTier,
}

/// Extended outlet risk record combining inactivity with sales volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutletRisk {
    pub outlet: String,
    pub total_sales: f64,
    pub last_order: NaiveDate,
    pub orders: usize,
    pub days_inactive: i64,
    pub tier: RiskTier,
}

/// Warehouse risk record: flagged when total sales fall in the bottom
/// quartile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseRisk {
    pub warehouse: String,
    pub total_sales: f64,
    pub total_quantity: f64,
    pub orders: usize,
    pub tier: RiskTier,
}

/// Days since each outlet's most recent record, bucketed into risk tiers.
/// Rows with unparseable dates are dropped; an all-dropped dataset yields an
/// empty result rather than an error.
pub fn churn_by_outlet(
    dataset: &Dataset,
    columns: &ColumnMap,
    thresholds: ChurnThresholds,
    reference: ReferencePoint,
) -> Result<Vec<ChurnRecord>, AnalyticsError> {
    let outlet_name = columns.require(Role::Outlet)?;
    let date_name = columns.require(Role::Date)?;
    let outlets = dataset
        .column(outlet_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Outlet))?;
    let dates = dataset
        .column(date_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Date))?;

    let Some(today) = reference.resolve(dataset, columns) else {
        return Ok(Vec::new());
    };

    let mut last_seen: BTreeMap<String, NaiveDate> = BTreeMap::new();
    for (key_cell, date_cell) in outlets.values.iter().zip(dates.values.iter()) {
        if key_cell.is_null() {
            continue;
        }
        let Some(date) = date_cell.as_date() else {
            continue;
        };
        let entry = last_seen.entry(key_cell.to_string()).or_insert(date);
        if date > *entry {
            *entry = date;
        }
    }

    Ok(last_seen
        .into_iter()
        .map(|(group, last)| {
            let days_inactive = (today - last).num_days();
            ChurnRecord {
                group,
                last_seen: last,
                days_inactive,
                tier: thresholds.classify(days_inactive),
            }
        })
        .collect())
}

/// Outlet risk scoring: High when inactive beyond the high threshold OR total
/// sales fall in the bottom quintile, Medium when inactive beyond the medium
/// threshold, else Low.
pub fn outlet_risk(
    dataset: &Dataset,
    columns: &ColumnMap,
    thresholds: ChurnThresholds,
    reference: ReferencePoint,
) -> Result<Vec<OutletRisk>, AnalyticsError> {
    let outlet_name = columns.require(Role::Outlet)?;
    let date_name = columns.require(Role::Date)?;
    let sales_name = columns.require(Role::Sales)?;
    let outlets = dataset
        .column(outlet_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Outlet))?;
    let dates = dataset
        .column(date_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Date))?;
    let sales = dataset
        .column(sales_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Sales))?;

    let Some(today) = reference.resolve(dataset, columns) else {
        return Ok(Vec::new());
    };

    struct Acc {
        total_sales: f64,
        last_order: NaiveDate,
        orders: usize,
    }

    let mut rollup: BTreeMap<String, Acc> = BTreeMap::new();
    for (i, key_cell) in outlets.values.iter().enumerate() {
        if key_cell.is_null() {
            continue;
        }
        let Some(date) = dates.values.get(i).and_then(|v| v.as_date()) else {
            continue;
        };
        let value = sales
            .values
            .get(i)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let entry = rollup.entry(key_cell.to_string()).or_insert(Acc {
            total_sales: 0.0,
            last_order: date,
            orders: 0,
        });
        entry.total_sales += value;
        entry.orders += 1;
        if date > entry.last_order {
            entry.last_order = date;
        }
    }

    let mut totals: Vec<f64> = rollup.values().map(|a| a.total_sales).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let low_sales_cutoff = quantile(&totals, 0.2);

    Ok(rollup
        .into_iter()
        .map(|(outlet, acc)| {
            let days_inactive = (today - acc.last_order).num_days();
            let tier = if days_inactive > thresholds.high_days
                || acc.total_sales < low_sales_cutoff
            {
                RiskTier::High
            } else if days_inactive > thresholds.medium_days {
                RiskTier::Medium
            } else {
                RiskTier::Low
            };
            OutletRisk {
                outlet,
                total_sales: acc.total_sales,
                last_order: acc.last_order,
                orders: acc.orders,
                days_inactive,
                tier,
            }
        })
        .collect())
}

/// Warehouse risk: High for warehouses whose total sales sit below the
/// bottom-quartile cutoff, Low otherwise.
pub fn warehouse_risk(
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<Vec<WarehouseRisk>, AnalyticsError> {
    let summaries = super::group_summary(dataset, columns, Role::Warehouse)?;

    let mut totals: Vec<f64> = summaries.iter().map(|g| g.total_sales).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let cutoff = quantile(&totals, 0.25);

    Ok(summaries
        .into_iter()
        .map(|g| {
            let tier = if g.total_sales < cutoff {
                RiskTier::High
            } else {
                RiskTier::Low
            };
            WarehouseRisk {
                warehouse: g.key,
                total_sales: g.total_sales,
                total_quantity: g.total_quantity,
                orders: g.records,
                tier,
            }
        })
        .collect())
}

/// Linearly interpolated quantile of an ascending-sorted slice. 0.0 for an
/// empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
