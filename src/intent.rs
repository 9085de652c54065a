//! Closed intent dispatch for the executive Q&A surface.
//!
//! A query is lower-cased and matched against keyword groups in a fixed
//! priority order; each intent has exactly one handler that computes its
//! answer through the metric layer. The mapping is a closed enumeration so
//! the whole dispatch is testable and exhaustive, and unknown queries land on
//! a help response instead of an error.

use crate::dataset::Dataset;
use crate::metrics::{self, MetricResult};
use crate::resolver::{ColumnMap, Role};
use crate::AnalyticsError;
use serde::Serialize;

/// Question categories the dispatch can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TotalSales,
    TotalOrders,
    Performance,
    SkuAnalysis,
    OutletAnalysis,
    GeoAnalysis,
    DiscountAnalysis,
    FieldForce,
    RiskAnalysis,
    Help,
}

impl Intent {
    pub const ALL: [Intent; 10] = [
        Intent::TotalSales,
        Intent::TotalOrders,
        Intent::Performance,
        Intent::SkuAnalysis,
        Intent::OutletAnalysis,
        Intent::GeoAnalysis,
        Intent::DiscountAnalysis,
        Intent::FieldForce,
        Intent::RiskAnalysis,
        Intent::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::TotalSales => "total_sales",
            Intent::TotalOrders => "total_orders",
            Intent::Performance => "performance",
            Intent::SkuAnalysis => "sku_analysis",
            Intent::OutletAnalysis => "outlet_analysis",
            Intent::GeoAnalysis => "geo_analysis",
            Intent::DiscountAnalysis => "discount_analysis",
            Intent::FieldForce => "field_force",
            Intent::RiskAnalysis => "risk_analysis",
            Intent::Help => "help",
        }
    }

    /// Keywords that trigger this intent. Checked in [`Intent::ALL`] order;
    /// the first intent with a matching keyword wins.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Intent::TotalSales => &["total sales", "revenue"],
            Intent::TotalOrders => &["orders"],
            Intent::Performance => &["performance"],
            Intent::SkuAnalysis => &["sku", "brand"],
            Intent::OutletAnalysis => &["outlet"],
            Intent::GeoAnalysis => &["zone", "state", "city"],
            Intent::DiscountAnalysis => &["discount"],
            // Bare "rep" is avoided: it would match inside "report".
            Intent::FieldForce => &["salesman", "field force", "sales rep", "agent"],
            Intent::RiskAnalysis => &["risk", "drop"],
            Intent::Help => &[],
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a free-text query into an intent. Never fails; anything
/// unrecognized becomes [`Intent::Help`].
pub fn detect_intent(query: &str) -> Intent {
    let q = query.to_lowercase();
    for intent in Intent::ALL {
        if intent.keywords().iter().any(|k| q.contains(k)) {
            return intent;
        }
    }
    Intent::Help
}

/// Presentation wrapper around a metric result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub header: String,
    pub main: String,
    pub explain: String,
    pub note: String,
}

impl From<MetricResult> for ChatResponse {
    fn from(result: MetricResult) -> Self {
        Self {
            header: result.title,
            main: result.value,
            explain: result.rationale,
            note: "Derived directly from current dataset signals.".to_string(),
        }
    }
}

/// Compute the canned answer for an intent.
///
/// Missing roles surface as missing-column errors so the caller can explain
/// which column the question needs; nothing here panics on partial schemas.
pub fn respond(
    intent: Intent,
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<MetricResult, AnalyticsError> {
    match intent {
        Intent::TotalSales => {
            columns.require(Role::Sales)?;
            let total = metrics::total_value(dataset, columns, Role::Sales);
            Ok(MetricResult::new(
                "Total Sales Overview",
                metrics::format_amount(total),
                "Sum of the sales column across all records",
            ))
        }
        Intent::TotalOrders => {
            // No order-id role exists, so every row counts as one order line.
            let orders = metrics::record_count(dataset, None);
            Ok(MetricResult::new(
                "Total Orders",
                metrics::format_amount(orders as f64),
                "One order per dataset row",
            ))
        }
        Intent::Performance => {
            columns.require(Role::Sales)?;
            let total = metrics::total_value(dataset, columns, Role::Sales);
            let outlets = metrics::distinct_count(dataset, columns, Role::Outlet);
            let skus = metrics::distinct_count(dataset, columns, Role::Sku);
            Ok(MetricResult::new(
                "Business Performance Summary",
                format!(
                    "Sales: {} | Outlets: {} | SKUs: {}",
                    metrics::format_amount(total),
                    outlets,
                    skus
                ),
                "Scale, coverage and assortment indicators",
            ))
        }
        Intent::SkuAnalysis => {
            let top = metrics::top_n(dataset, columns, Role::Brand, Role::Sales, 1)?;
            let leader = top.first().ok_or(AnalyticsError::EmptyDataset)?;
            Ok(MetricResult::new(
                "Product Performance",
                format!("Top brand by revenue: {}", leader.key),
                "Brand-wise revenue aggregation",
            ))
        }
        Intent::OutletAnalysis => {
            let summaries = metrics::group_summary(dataset, columns, Role::Outlet)?;
            let inactive = summaries.iter().filter(|g| g.records <= 1).count();
            Ok(MetricResult::new(
                "Outlet Health",
                format!("Outlets with a single record: {}", inactive),
                "Outlets with at most one order are likely dormant",
            ))
        }
        Intent::GeoAnalysis => {
            let geo_role = [Role::State, Role::City]
                .into_iter()
                .find(|r| columns.get(*r).is_some())
                .ok_or(AnalyticsError::MissingColumn(Role::State))?;
            let top = metrics::top_n(dataset, columns, geo_role, Role::Sales, 1)?;
            let leader = top.first().ok_or(AnalyticsError::EmptyDataset)?;
            Ok(MetricResult::new(
                "Geographic Performance",
                format!(
                    "Top {} by sales: {} ({})",
                    geo_role,
                    leader.key,
                    metrics::format_amount(leader.value)
                ),
                "Region-wise revenue aggregation",
            ))
        }
        Intent::DiscountAnalysis => {
            columns.require(Role::Discount)?;
            columns.require(Role::Sales)?;
            let discount = metrics::total_value(dataset, columns, Role::Discount);
            let sales = metrics::total_value(dataset, columns, Role::Sales);
            Ok(MetricResult::new(
                "Discount Impact",
                format!(
                    "Total discount: {} ({}% of sales)",
                    metrics::format_amount(discount),
                    metrics::safe_pct(discount, sales)
                ),
                "Discount leakage assessment",
            ))
        }
        Intent::FieldForce => {
            let top = metrics::top_n(dataset, columns, Role::Rep, Role::Sales, 1)?;
            let leader = top.first().ok_or(AnalyticsError::EmptyDataset)?;
            let reps = metrics::distinct_count(dataset, columns, Role::Rep);
            Ok(MetricResult::new(
                "Field Force Performance",
                format!("Top rep by sales: {} ({} reps active)", leader.key, reps),
                "Rep-wise revenue aggregation",
            ))
        }
        Intent::RiskAnalysis => {
            let share = metrics::concentration_ratio(dataset, columns, Role::Sku, Role::Sales)?;
            let verdict = if metrics::is_concentration_risk(share) {
                "above the dependency threshold"
            } else {
                "within tolerance"
            };
            Ok(MetricResult::new(
                "Business Risk Signals",
                format!("Revenue concentration: {:.2}% ({})", share, verdict),
                "Share of revenue held by the single largest SKU",
            ))
        }
        Intent::Help => Ok(MetricResult::new(
            "Executive Intelligence Ready",
            "Ask about sales, orders, SKUs, outlets, risks, discounts or geography.",
            "Dataset-supported questions only",
        )),
    }
}

/// Detect and answer in one step, wrapping the result for presentation.
pub fn answer(
    query: &str,
    dataset: &Dataset,
    columns: &ColumnMap,
) -> Result<ChatResponse, AnalyticsError> {
    let intent = detect_intent(query);
    tracing::debug!(intent = intent.as_str(), "query classified");
    respond(intent, dataset, columns).map(ChatResponse::from)
}
