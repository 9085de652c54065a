use crate::metrics::{ChurnThresholds, ReferencePoint};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration, loaded from an optional file plus
/// SHELFPULSE_-prefixed environment variables.
/// Example: SHELFPULSE_FORECAST_HORIZON=6
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub churn: ChurnConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Cap on rows shown in previews; ingestion itself is not capped.
    #[serde(default = "default_max_preview_rows")]
    pub max_preview_rows: usize,
}

fn default_max_preview_rows() -> usize {
    50_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_preview_rows: default_max_preview_rows(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastConfig {
    /// Default number of periods to extrapolate.
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_min_horizon")]
    pub min_horizon: usize,
    #[serde(default = "default_max_horizon")]
    pub max_horizon: usize,
}

fn default_horizon() -> usize {
    12
}

fn default_min_horizon() -> usize {
    3
}

fn default_max_horizon() -> usize {
    24
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            min_horizon: default_min_horizon(),
            max_horizon: default_max_horizon(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChurnConfig {
    /// Days of inactivity above which an outlet is High risk.
    #[serde(default = "default_high_days")]
    pub high_days: i64,
    /// Days of inactivity above which an outlet is Medium risk.
    #[serde(default = "default_medium_days")]
    pub medium_days: i64,
    /// Reference "today": "dataset_max" (reproducible, default) or
    /// "wall_clock".
    #[serde(default = "default_reference")]
    pub reference: String,
}

fn default_high_days() -> i64 {
    60
}

fn default_medium_days() -> i64 {
    30
}

fn default_reference() -> String {
    "dataset_max".to_string()
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            high_days: default_high_days(),
            medium_days: default_medium_days(),
            reference: default_reference(),
        }
    }
}

impl ChurnConfig {
    pub fn thresholds(&self) -> ChurnThresholds {
        ChurnThresholds {
            high_days: self.high_days,
            medium_days: self.medium_days,
        }
    }

    pub fn reference_point(&self) -> Option<ReferencePoint> {
        ReferencePoint::parse(&self.reference)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_clusters")]
    pub clusters: usize,
    #[serde(default = "default_min_clusters")]
    pub min_clusters: usize,
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
}

fn default_clusters() -> usize {
    3
}

fn default_min_clusters() -> usize {
    2
}

fn default_max_clusters() -> usize {
    6
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            clusters: default_clusters(),
            min_clusters: default_min_clusters(),
            max_clusters: default_max_clusters(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file and environment variables.
    pub fn load(config_path: &str) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .add_source(
                config::Environment::with_prefix("SHELFPULSE")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.forecast.min_horizon == 0 {
            anyhow::bail!("forecast.min_horizon must be at least 1");
        }
        if self.forecast.min_horizon > self.forecast.max_horizon {
            anyhow::bail!("forecast.min_horizon exceeds forecast.max_horizon");
        }
        if self.forecast.horizon < self.forecast.min_horizon
            || self.forecast.horizon > self.forecast.max_horizon
        {
            anyhow::bail!(
                "forecast.horizon {} outside [{}, {}]",
                self.forecast.horizon,
                self.forecast.min_horizon,
                self.forecast.max_horizon
            );
        }
        if self.churn.medium_days >= self.churn.high_days {
            anyhow::bail!("churn.medium_days must be below churn.high_days");
        }
        if self.churn.reference_point().is_none() {
            anyhow::bail!("invalid churn.reference: {}", self.churn.reference);
        }
        if self.segmentation.min_clusters < 2 {
            anyhow::bail!("segmentation.min_clusters must be at least 2");
        }
        if self.segmentation.clusters < self.segmentation.min_clusters
            || self.segmentation.clusters > self.segmentation.max_clusters
        {
            anyhow::bail!(
                "segmentation.clusters {} outside [{}, {}]",
                self.segmentation.clusters,
                self.segmentation.min_clusters,
                self.segmentation.max_clusters
            );
        }
        Ok(())
    }
}
