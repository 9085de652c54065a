//! Naive forecasting over a prepared time series.
//!
//! The built-in model is an ordinary least-squares line fitted against the
//! integer time index of the history. A richer external model can be plugged
//! in through [`Forecaster`]; when it is absent or fails, the linear model
//! takes over without surfacing the failure to the caller.

use crate::timeseries::{Granularity, PeriodValue};
use crate::AnalyticsError;
use serde::Serialize;

/// Minimum number of historical periods required to extrapolate.
pub const MIN_HISTORY: usize = 2;

/// Seam for external forecasting collaborators.
pub trait Forecaster {
    /// Human-readable model name for logs and output.
    fn name(&self) -> &'static str;

    /// Predict `horizon` periods beyond the end of `history`.
    fn forecast(
        &self,
        history: &[PeriodValue],
        horizon: usize,
        granularity: Granularity,
    ) -> Result<Vec<PeriodValue>, AnalyticsError>;
}

/// Fallback model: OLS on the time index 0, 1, 2, ...
///
/// No seasonality, no confidence intervals, no clamping of negative
/// predictions. Intentionally simple.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

impl LinearTrend {
    /// Slope and intercept of the least-squares line through
    /// (0, y0), (1, y1), ...
    fn fit(history: &[PeriodValue]) -> (f64, f64) {
        let n = history.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = history.iter().map(|p| p.value).sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var = 0.0;
        for (i, point) in history.iter().enumerate() {
            let dx = i as f64 - mean_x;
            cov += dx * (point.value - mean_y);
            var += dx * dx;
        }

        let slope = if var == 0.0 { 0.0 } else { cov / var };
        let intercept = mean_y - slope * mean_x;
        (slope, intercept)
    }
}

impl Forecaster for LinearTrend {
    fn name(&self) -> &'static str {
        "linear_trend"
    }

    fn forecast(
        &self,
        history: &[PeriodValue],
        horizon: usize,
        granularity: Granularity,
    ) -> Result<Vec<PeriodValue>, AnalyticsError> {
        if history.len() < MIN_HISTORY {
            return Err(AnalyticsError::InsufficientHistory {
                needed: MIN_HISTORY,
                have: history.len(),
            });
        }

        let (slope, intercept) = Self::fit(history);
        let last = &history[history.len() - 1];

        let mut points = Vec::with_capacity(horizon);
        let mut period = last.period;
        for offset in 0..horizon {
            period = granularity.next_period(period);
            let index = (history.len() + offset) as f64;
            points.push(PeriodValue {
                period,
                value: slope * index + intercept,
            });
        }
        Ok(points)
    }
}

/// Which model produced a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    External,
    LinearTrend,
}

/// A forecast plus the model that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastOutcome {
    pub points: Vec<PeriodValue>,
    pub model: ModelKind,
}

/// Forecast with the primary model when available, falling back to
/// [`LinearTrend`] when it is absent or fails.
///
/// External-model failure is logged and swallowed; insufficient history is a
/// hard error from either path because nothing can be extrapolated from it.
pub fn forecast_with_fallback(
    primary: Option<&dyn Forecaster>,
    history: &[PeriodValue],
    horizon: usize,
    granularity: Granularity,
) -> Result<ForecastOutcome, AnalyticsError> {
    if history.len() < MIN_HISTORY {
        return Err(AnalyticsError::InsufficientHistory {
            needed: MIN_HISTORY,
            have: history.len(),
        });
    }

    if let Some(model) = primary {
        match model.forecast(history, horizon, granularity) {
            Ok(points) => {
                return Ok(ForecastOutcome {
                    points,
                    model: ModelKind::External,
                })
            }
            Err(e) => {
                tracing::warn!(
                    model = model.name(),
                    error = %e,
                    "primary forecaster failed, falling back to linear trend"
                );
            }
        }
    }

    let points = LinearTrend.forecast(history, horizon, granularity)?;
    Ok(ForecastOutcome {
        points,
        model: ModelKind::LinearTrend,
    })
}
