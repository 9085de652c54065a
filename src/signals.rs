//! Volatility-based business signals.
//!
//! Scans numeric columns and grades each by its coefficient of variation
//! (sample standard deviation over absolute mean). Erratic metrics surface as
//! high-severity signals with a suggested action; stable metrics are reported
//! too so a dashboard can show a complete scan.

use crate::dataset::Dataset;
use crate::metrics::RiskTier;
use serde::Serialize;

/// Coefficient-of-variation cutoffs for signal severity.
pub const SEVERE_VOLATILITY: f64 = 0.8;
pub const ELEVATED_VOLATILITY: f64 = 0.4;

/// One graded observation about a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub metric: String,
    pub severity: RiskTier,
    pub volatility: f64,
    pub summary: String,
    pub reason: String,
    pub action: String,
}

/// Grade every mostly-numeric column of the dataset. Columns with no numeric
/// cells or a zero mean are skipped (volatility is undefined there).
pub fn detect_signals(dataset: &Dataset) -> Vec<Signal> {
    let mut signals = Vec::new();

    for name in dataset.numeric_column_names() {
        let Some(column) = dataset.column(name) else {
            continue;
        };
        let values: Vec<f64> = column.values.iter().filter_map(|v| v.as_f64()).collect();
        if values.len() < 2 {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean == 0.0 {
            continue;
        }
        let variance = values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (values.len() - 1) as f64;
        let volatility = variance.sqrt() / mean.abs();

        signals.push(grade(name, volatility));
    }

    signals
}

fn grade(metric: &str, volatility: f64) -> Signal {
    if volatility >= SEVERE_VOLATILITY {
        Signal {
            metric: metric.to_string(),
            severity: RiskTier::High,
            volatility,
            summary: format!("Severe instability detected in {}", metric),
            reason: "Extreme fluctuations indicate execution or demand breakdown".to_string(),
            action: "Immediate leadership review and corrective intervention required"
                .to_string(),
        }
    } else if volatility >= ELEVATED_VOLATILITY {
        Signal {
            metric: metric.to_string(),
            severity: RiskTier::Medium,
            volatility,
            summary: format!("Inconsistent performance observed in {}", metric),
            reason: "Performance variability impacting predictability".to_string(),
            action: "Operational optimization and monitoring advised".to_string(),
        }
    } else {
        Signal {
            metric: metric.to_string(),
            severity: RiskTier::Low,
            volatility,
            summary: format!("Stable trend observed in {}", metric),
            reason: "Metric performance within acceptable variance".to_string(),
            action: "Maintain current execution strategy".to_string(),
        }
    }
}
