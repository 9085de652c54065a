pub mod config;
pub mod dataset;
mod error;
pub mod forecast;
pub mod intent;
pub mod metrics;
pub mod resolver;
pub mod segment;
pub mod signals;
pub mod telemetry;
pub mod timeseries;

pub use dataset::{DataSource, Dataset, SessionState, Value};
pub use error::AnalyticsError;
pub use resolver::{resolve_columns, ColumnMap, Role};
