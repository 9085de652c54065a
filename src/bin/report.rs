use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use shelfpulse::config::AppConfig;
use shelfpulse::dataset::read_csv_path;
use shelfpulse::forecast::{forecast_with_fallback, ForecastOutcome};
use shelfpulse::metrics::{self, churn_by_outlet, ChurnRecord};
use shelfpulse::timeseries::{prepare_time_series, Granularity};
use shelfpulse::{resolve_columns, telemetry, AnalyticsError, Role};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelfpulse", about = "FMCG sales intelligence report", version)]
struct Cli {
    /// Path to a headered CSV file with sales data
    input: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Period granularity for trend and forecast
    #[arg(short, long, default_value = "month")]
    granularity: GranularityArg,

    /// Forecast horizon in periods (defaults to the configured value)
    #[arg(long)]
    horizon: Option<usize>,

    /// Raw rows to show in the preview section, capped by the configured
    /// ingest.max_preview_rows
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Optional configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(ValueEnum, Clone, Copy)]
enum GranularityArg {
    Day,
    Month,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Day => Granularity::Day,
            GranularityArg::Month => Granularity::Month,
        }
    }
}

#[derive(serde::Serialize)]
struct Report {
    rows: usize,
    headers: Vec<String>,
    preview: Vec<Vec<String>>,
    detected_columns: shelfpulse::ColumnMap,
    total_sales: f64,
    average_sale: f64,
    top_brands: Option<Vec<metrics::GroupTotal>>,
    churn: Option<Vec<ChurnRecord>>,
    forecast: Option<ForecastOutcome>,
}

fn main() -> Result<()> {
    if let Err(e) = telemetry::init_telemetry() {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let config = AppConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path))?;
            config.validate()?;
            config
        }
        None => AppConfig::default(),
    };

    let dataset = read_csv_path(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let columns = resolve_columns(&dataset);

    let missing = columns.missing(&[Role::Date, Role::Sales]);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
        anyhow::bail!("required columns not detected: {}", names.join(", "));
    }

    let granularity: Granularity = cli.granularity.into();
    let horizon = cli.horizon.unwrap_or(config.forecast.horizon);

    let series = prepare_time_series(&dataset, &columns, Role::Sales, granularity)?;
    let forecast = match forecast_with_fallback(None, &series, horizon, granularity) {
        Ok(outcome) => Some(outcome),
        Err(AnalyticsError::InsufficientHistory { .. }) => {
            tracing::warn!("not enough history to forecast, skipping");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let preview_limit = clamp_preview(cli.preview, &config);

    let report = Report {
        rows: dataset.num_rows(),
        headers: dataset.column_names().map(str::to_string).collect(),
        preview: preview_rows(&dataset, preview_limit),
        total_sales: metrics::total_value(&dataset, &columns, Role::Sales),
        average_sale: metrics::average_value(&dataset, &columns, Role::Sales),
        top_brands: metrics::top_n(&dataset, &columns, Role::Brand, Role::Sales, 10).ok(),
        churn: churn_by_outlet(
            &dataset,
            &columns,
            config.churn.thresholds(),
            config.churn.reference_point().unwrap_or_default(),
        )
        .ok(),
        detected_columns: columns,
        forecast,
    };

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&report),
    }

    Ok(())
}

/// Requested preview size bounded by the configured ingest cap.
fn clamp_preview(requested: usize, config: &AppConfig) -> usize {
    requested.min(config.ingest.max_preview_rows)
}

/// First `limit` rows of the dataset rendered as display strings, one inner
/// vector per row in column order.
fn preview_rows(dataset: &shelfpulse::Dataset, limit: usize) -> Vec<Vec<String>> {
    (0..dataset.num_rows().min(limit))
        .map(|i| {
            dataset
                .columns()
                .iter()
                .map(|c| c.values[i].to_string())
                .collect()
        })
        .collect()
}

fn print_table(report: &Report) {
    println!("Rows ingested:   {}", report.rows);
    if !report.preview.is_empty() {
        println!("Preview:");
        println!("  {}", report.headers.join(" | "));
        for row in &report.preview {
            println!("  {}", row.join(" | "));
        }
    }
    println!("Detected columns:");
    for (role, column) in report.detected_columns.iter() {
        println!("  {:<10} -> {}", role.as_str(), column);
    }
    println!();
    println!("Total sales:     {}", metrics::format_amount(report.total_sales));
    println!("Average sale:    {:.2}", report.average_sale);

    if let Some(brands) = &report.top_brands {
        println!();
        println!("Top brands:");
        for brand in brands {
            println!("  {:<20} {}", brand.key, metrics::format_amount(brand.value));
        }
    }

    if let Some(churn) = &report.churn {
        let high = churn.iter().filter(|c| c.tier.score() == 3).count();
        let medium = churn.iter().filter(|c| c.tier.score() == 2).count();
        println!();
        println!(
            "Outlet churn:    {} high risk, {} medium risk, {} total",
            high,
            medium,
            churn.len()
        );
    }

    if let Some(forecast) = &report.forecast {
        println!();
        println!("Forecast ({:?}):", forecast.model);
        for point in &forecast.points {
            println!(
                "  {}  {}",
                point.period,
                metrics::format_amount(point.value)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfpulse::dataset::read_csv;

    #[test]
    fn test_preview_respects_limit() {
        let csv = "a,b\n1,x\n2,y\n3,z\n";
        let dataset = read_csv(csv.as_bytes()).unwrap();

        let preview = preview_rows(&dataset, 2);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0], vec!["1".to_string(), "x".to_string()]);

        // Limits past the end and a zero limit both stay in bounds.
        assert_eq!(preview_rows(&dataset, 10).len(), 3);
        assert!(preview_rows(&dataset, 0).is_empty());
    }

    #[test]
    fn test_preview_cap_comes_from_config() {
        let mut config = AppConfig::default();
        config.ingest.max_preview_rows = 2;
        assert_eq!(clamp_preview(7, &config), 2);
        assert_eq!(clamp_preview(1, &config), 1);
    }
}
