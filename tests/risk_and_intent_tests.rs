//! Integration tests for the risk surfaces: churn tiers, warehouse risk,
//! outlet segmentation, volatility signals and the chat intent layer, all
//! driven from raw CSV input.

use chrono::NaiveDate;
use shelfpulse::dataset::read_csv;
use shelfpulse::intent::{answer, detect_intent, Intent};
use shelfpulse::metrics::{
    churn_by_outlet, outlet_risk, warehouse_risk, ChurnThresholds, ReferencePoint, RiskTier,
};
use shelfpulse::segment::{prepare_outlet_features, segment_outlets};
use shelfpulse::signals::detect_signals;
use shelfpulse::resolve_columns;

const OUTLET_CSV: &str = "\
order_date,outlet,sales
2024-04-15,Alpha,500
2024-04-01,Alpha,300
2024-03-06,Beta,120
2024-02-05,Gamma,80
";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn churn_tiers_from_csv() {
    let dataset = read_csv(OUTLET_CSV.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    // Reference date is the dataset max, 2024-04-15. Alpha is 0 days
    // inactive, Beta 40, Gamma 70.
    let records = churn_by_outlet(
        &dataset,
        &columns,
        ChurnThresholds::default(),
        ReferencePoint::DatasetMax,
    )
    .unwrap();
    assert_eq!(records.len(), 3);

    let alpha = records.iter().find(|r| r.group == "Alpha").unwrap();
    assert_eq!(alpha.days_inactive, 0);
    assert_eq!(alpha.last_seen, ymd(2024, 4, 15));
    assert_eq!(alpha.tier, RiskTier::Low);

    let beta = records.iter().find(|r| r.group == "Beta").unwrap();
    assert_eq!(beta.days_inactive, 40);
    assert_eq!(beta.tier, RiskTier::Medium);

    let gamma = records.iter().find(|r| r.group == "Gamma").unwrap();
    assert_eq!(gamma.days_inactive, 70);
    assert_eq!(gamma.tier, RiskTier::High);
}

#[test]
fn outlet_risk_flags_low_volume_even_when_recent() {
    let csv = "\
order_date,outlet,sales
2024-04-15,Big,1000
2024-04-14,Mid,500
2024-04-13,Small,10
2024-04-12,Tiny,5
2024-04-11,Med2,400
";
    let dataset = read_csv(csv.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    let risks = outlet_risk(
        &dataset,
        &columns,
        ChurnThresholds::default(),
        ReferencePoint::DatasetMax,
    )
    .unwrap();

    // Everyone ordered within the last week, so any High tier comes from the
    // bottom-quintile sales cutoff.
    let tiny = risks.iter().find(|r| r.outlet == "Tiny").unwrap();
    assert_eq!(tiny.tier, RiskTier::High);
    let big = risks.iter().find(|r| r.outlet == "Big").unwrap();
    assert_eq!(big.tier, RiskTier::Low);
}

#[test]
fn warehouse_risk_bottom_quartile() {
    let csv = "\
warehouse,sales,qty
North,400,10
South,300,8
East,200,5
West,10,1
";
    let dataset = read_csv(csv.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    let risks = warehouse_risk(&dataset, &columns).unwrap();
    let west = risks.iter().find(|r| r.warehouse == "West").unwrap();
    assert_eq!(west.tier, RiskTier::High);
    let north = risks.iter().find(|r| r.warehouse == "North").unwrap();
    assert_eq!(north.tier, RiskTier::Low);
}

#[test]
fn segmentation_from_csv_orders_segments_by_size() {
    let csv = "\
outlet,sales,qty
A1,10,1
A2,12,1
A3,14,2
B1,500,40
B2,520,42
B3,540,44
";
    let dataset = read_csv(csv.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    let features = prepare_outlet_features(&dataset, &columns).unwrap();
    assert_eq!(features.len(), 6);

    let segmented = segment_outlets(&features, 2);
    for outlet in &segmented {
        if outlet.total_sales < 100.0 {
            assert_eq!(outlet.segment, 0, "small outlet {}", outlet.outlet);
        } else {
            assert_eq!(outlet.segment, 1, "large outlet {}", outlet.outlet);
        }
    }
}

#[test]
fn volatility_signals_on_unstable_column() {
    let csv = "\
steady,swingy
100,10
100,500
100,20
100,480
";
    let dataset = read_csv(csv.as_bytes()).unwrap();
    let signals = detect_signals(&dataset);
    assert_eq!(signals.len(), 2);

    let steady = signals.iter().find(|s| s.metric == "steady").unwrap();
    assert_eq!(steady.severity, RiskTier::Low);
    let swingy = signals.iter().find(|s| s.metric == "swingy").unwrap();
    assert_eq!(swingy.severity, RiskTier::High);
    assert!(swingy.volatility > 0.8);
}

#[test]
fn intent_detection_routes_common_questions() {
    assert_eq!(detect_intent("what is the total sales?"), Intent::TotalSales);
    assert_eq!(detect_intent("show me revenue"), Intent::TotalSales);
    assert_eq!(detect_intent("how many orders came in"), Intent::TotalOrders);
    assert_eq!(detect_intent("top brand by sku"), Intent::SkuAnalysis);
    assert_eq!(detect_intent("any risk of a drop?"), Intent::RiskAnalysis);
    assert_eq!(detect_intent("tell me a joke"), Intent::Help);
}

#[test]
fn order_count_is_row_count_not_distinct_skus() {
    let csv = "\
order_date,sku,sales
2024-01-05,S1,10
2024-01-06,S1,20
2024-01-07,S2,30
";
    let dataset = read_csv(csv.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    // Two distinct SKUs across three order lines; the order count is three.
    let response = answer("how many orders", &dataset, &columns).unwrap();
    assert_eq!(response.main, "3");
}

#[test]
fn intent_answers_use_the_ingested_data() {
    let dataset = read_csv(OUTLET_CSV.as_bytes()).unwrap();
    let columns = resolve_columns(&dataset);

    let response = answer("what is total sales", &dataset, &columns).unwrap();
    assert!(response.main.contains("1,000"));

    let response = answer("how many orders", &dataset, &columns).unwrap();
    assert!(response.main.contains('4'));
}
