//! Aggregate metric layer.
//!
//! Pure, stateless functions computing dashboard numbers from a dataset plus
//! a resolved [`ColumnMap`]. Simple metrics degrade to neutral zeros on
//! missing or empty data so rendering never crashes on partial schemas;
//! grouped metrics that are meaningless without their columns surface a
//! missing-column error instead.

pub mod churn;

pub use churn::{
    churn_by_outlet, outlet_risk, warehouse_risk, ChurnRecord, ChurnThresholds, OutletRisk,
    ReferencePoint, RiskTier, WarehouseRisk,
};

use crate::dataset::Dataset;
use crate::resolver::{ColumnMap, Role};
use crate::timeseries;
use crate::AnalyticsError;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Concentration share (percent of total value in the single largest group)
/// above which a dependency risk is flagged.
pub const CONCENTRATION_RISK_THRESHOLD_PCT: f64 = 40.0;

/// A small presentation-ready record: what was computed, the headline value,
/// and a one-line rationale. Ephemeral, recomputed on every render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub title: String,
    pub value: String,
    pub rationale: String,
}

impl MetricResult {
    pub fn new(
        title: impl Into<String>,
        value: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            rationale: rationale.into(),
        }
    }
}

/// Aggregated total for one group, as produced by [`top_n`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

/// Per-group rollup of sales, quantity and record count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub total_sales: f64,
    pub total_quantity: f64,
    pub records: usize,
}

/// SKU-level pricing rollup. Discount percentages are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingSummary {
    pub sku: String,
    pub gross_sales: f64,
    pub discount_amount: f64,
    pub net_sales: f64,
    pub avg_discount_pct: f64,
}

/// Month-over-month KPI snapshot anchored on the dataset's latest month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub current_month_sales: f64,
    pub previous_month_sales: f64,
    pub mom_growth_pct: f64,
    pub ytd_sales: f64,
}

/// Sum of the column resolved for `role`. 0.0 for an absent, empty or
/// non-numeric column.
pub fn total_value(dataset: &Dataset, columns: &ColumnMap, role: Role) -> f64 {
    let Some(name) = columns.get(role) else {
        return 0.0;
    };
    let Some(column) = dataset.column(name) else {
        return 0.0;
    };
    column.values.iter().filter_map(|v| v.as_f64()).sum()
}

/// Arithmetic mean of the column resolved for `role`. 0.0 when no numeric
/// cells exist.
pub fn average_value(dataset: &Dataset, columns: &ColumnMap, role: Role) -> f64 {
    let Some(name) = columns.get(role) else {
        return 0.0;
    };
    let Some(column) = dataset.column(name) else {
        return 0.0;
    };
    let numeric: Vec<f64> = column.values.iter().filter_map(|v| v.as_f64()).collect();
    if numeric.is_empty() {
        return 0.0;
    }
    numeric.iter().sum::<f64>() / numeric.len() as f64
}

/// Record count: distinct non-null values of the identifier column when one
/// is given and present, otherwise the plain row count.
pub fn record_count(dataset: &Dataset, id_column: Option<&str>) -> usize {
    if let Some(column) = id_column.and_then(|name| dataset.column(name)) {
        let distinct: std::collections::BTreeSet<String> = column
            .values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        return distinct.len();
    }
    dataset.num_rows()
}

/// Distinct non-null values of the column resolved for `role`.
pub fn distinct_count(dataset: &Dataset, columns: &ColumnMap, role: Role) -> usize {
    match columns.get(role) {
        Some(name) => record_count(dataset, Some(name)),
        None => 0,
    }
}

/// Sum `value_col` per distinct value of `group_col`. Null group keys are
/// skipped; non-numeric value cells contribute nothing but keep the group.
fn group_sums(
    dataset: &Dataset,
    columns: &ColumnMap,
    group_role: Role,
    value_role: Role,
) -> Result<BTreeMap<String, f64>, AnalyticsError> {
    let group_name = columns.require(group_role)?;
    let value_name = columns.require(value_role)?;
    let group = dataset
        .column(group_name)
        .ok_or(AnalyticsError::MissingColumn(group_role))?;
    let value = dataset
        .column(value_name)
        .ok_or(AnalyticsError::MissingColumn(value_role))?;

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for (key_cell, value_cell) in group.values.iter().zip(value.values.iter()) {
        if key_cell.is_null() {
            continue;
        }
        let entry = sums.entry(key_cell.to_string()).or_insert(0.0);
        if let Some(v) = value_cell.as_f64() {
            *entry += v;
        }
    }
    Ok(sums)
}

/// Top contributors: group by `group_role`, sum `value_role`, sorted by
/// (value desc, key asc) so ties break deterministically, truncated to `n`.
///
/// Missing roles are a caller-visible error rather than an empty result: a
/// top-N over an undetected category is meaningless.
pub fn top_n(
    dataset: &Dataset,
    columns: &ColumnMap,
    group_role: Role,
    value_role: Role,
    n: usize,
) -> Result<Vec<GroupTotal>, AnalyticsError> {
    let sums = group_sums(dataset, columns, group_role, value_role)?;
    let mut totals: Vec<GroupTotal> = sums
        .into_iter()
        .map(|(key, value)| GroupTotal { key, value })
        .collect();
    totals.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    totals.truncate(n);
    Ok(totals)
}

/// Share of total value held by the single largest group, in percent.
/// 0.0 when the total is zero.
pub fn concentration_ratio(
    dataset: &Dataset,
    columns: &ColumnMap,
    group_role: Role,
    value_role: Role,
) -> Result<f64, AnalyticsError> {
    let sums = group_sums(dataset, columns, group_role, value_role)?;
    let total: f64 = sums.values().sum();
    if total == 0.0 {
        return Ok(0.0);
    }
    let max = sums.values().cloned().fold(f64::MIN, f64::max);
    Ok(max / total * 100.0)
}

/// Whether a concentration share crosses the dependency-risk threshold.
pub fn is_concentration_risk(share_pct: f64) -> bool {
    share_pct > CONCENTRATION_RISK_THRESHOLD_PCT
}

/// Per-group rollup over the resolved sales and quantity columns. Sales and
/// quantity default to zero when their roles are absent; only the grouping
/// role is required.
pub fn group_summary(
    dataset: &Dataset,
    columns: &ColumnMap,
    group_role: Role,
) -> Result<Vec<GroupSummary>, AnalyticsError> {
    let group_name = columns.require(group_role)?;
    let group = dataset
        .column(group_name)
        .ok_or(AnalyticsError::MissingColumn(group_role))?;

    let sales = columns.get(Role::Sales).and_then(|n| dataset.column(n));
    let quantity = columns.get(Role::Quantity).and_then(|n| dataset.column(n));

    let mut rollup: BTreeMap<String, GroupSummary> = BTreeMap::new();
    for (i, key_cell) in group.values.iter().enumerate() {
        if key_cell.is_null() {
            continue;
        }
        let key = key_cell.to_string();
        let entry = rollup.entry(key.clone()).or_insert_with(|| GroupSummary {
            key,
            total_sales: 0.0,
            total_quantity: 0.0,
            records: 0,
        });
        entry.records += 1;
        if let Some(v) = sales.and_then(|c| c.values.get(i)).and_then(|v| v.as_f64()) {
            entry.total_sales += v;
        }
        if let Some(v) = quantity
            .and_then(|c| c.values.get(i))
            .and_then(|v| v.as_f64())
        {
            entry.total_quantity += v;
        }
    }
    Ok(rollup.into_values().collect())
}

/// SKU-level pricing: gross = price x quantity per row, discount cells
/// default to zero, net = gross - discount. Discount percent is reported on
/// a 0-100 scale, averaged over the SKU's rows with non-zero gross.
pub fn pricing_by_sku(
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<Vec<PricingSummary>, AnalyticsError> {
    let sku_name = columns.require(Role::Sku)?;
    let price_name = columns.require(Role::Price)?;
    let qty_name = columns.require(Role::Quantity)?;

    let sku = dataset
        .column(sku_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Sku))?;
    let price = dataset
        .column(price_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Price))?;
    let qty = dataset
        .column(qty_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Quantity))?;
    let discount = columns.get(Role::Discount).and_then(|n| dataset.column(n));

    struct Acc {
        gross: f64,
        discount: f64,
        pct_sum: f64,
        pct_rows: usize,
    }

    let mut rollup: BTreeMap<String, Acc> = BTreeMap::new();
    for (i, key_cell) in sku.values.iter().enumerate() {
        if key_cell.is_null() {
            continue;
        }
        let row_price = price.values.get(i).and_then(|v| v.as_f64());
        let row_qty = qty.values.get(i).and_then(|v| v.as_f64());
        let (Some(p), Some(q)) = (row_price, row_qty) else {
            continue;
        };
        let gross = p * q;
        let disc = discount
            .and_then(|c| c.values.get(i))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let entry = rollup.entry(key_cell.to_string()).or_insert(Acc {
            gross: 0.0,
            discount: 0.0,
            pct_sum: 0.0,
            pct_rows: 0,
        });
        entry.gross += gross;
        entry.discount += disc;
        if gross != 0.0 {
            entry.pct_sum += disc / gross * 100.0;
            entry.pct_rows += 1;
        }
    }

    Ok(rollup
        .into_iter()
        .map(|(sku, acc)| PricingSummary {
            sku,
            gross_sales: acc.gross,
            discount_amount: acc.discount,
            net_sales: acc.gross - acc.discount,
            avg_discount_pct: if acc.pct_rows == 0 {
                0.0
            } else {
                acc.pct_sum / acc.pct_rows as f64
            },
        })
        .collect())
}

/// Month-over-month KPI snapshot anchored on the latest month present in the
/// data (not wall-clock), so results are reproducible.
pub fn kpi_snapshot(
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<KpiSnapshot, AnalyticsError> {
    let date_name = columns.require(Role::Date)?;
    let sales_name = columns.require(Role::Sales)?;
    let dates = dataset
        .column(date_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Date))?;
    let sales = dataset
        .column(sales_name)
        .ok_or(AnalyticsError::MissingColumn(Role::Sales))?;

    let (latest_year, latest_month) =
        timeseries::latest_month(dataset, columns).ok_or(AnalyticsError::EmptyDataset)?;
    let (prev_year, prev_month) = if latest_month == 1 {
        (latest_year - 1, 12)
    } else {
        (latest_year, latest_month - 1)
    };

    let mut current = 0.0;
    let mut previous = 0.0;
    let mut ytd = 0.0;
    for (date_cell, sales_cell) in dates.values.iter().zip(sales.values.iter()) {
        let (Some(date), Some(value)) = (date_cell.as_date(), sales_cell.as_f64()) else {
            continue;
        };
        let ym = (date.year(), date.month());
        if ym == (latest_year, latest_month) {
            current += value;
        } else if ym == (prev_year, prev_month) {
            previous += value;
        }
        if date.year() == latest_year {
            ytd += value;
        }
    }

    Ok(KpiSnapshot {
        current_month_sales: current,
        previous_month_sales: previous,
        mom_growth_pct: growth_pct(current, previous),
        ytd_sales: ytd,
    })
}

/// Percentage growth of `current` over `previous`, rounded to two decimals.
/// 0.0 when there is no previous value to compare against.
pub fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    ((current - previous) / previous * 10000.0).round() / 100.0
}

/// Safe percentage share: `part / whole * 100`, 0.0 when the whole is zero.
pub fn safe_pct(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    (part / whole * 10000.0).round() / 100.0
}

/// Render an amount with thousands separators and no decimals, for headline
/// KPI strings. Unit-agnostic: the presentation layer adds currency symbols.
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}
