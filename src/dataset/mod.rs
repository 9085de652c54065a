//! In-memory tabular dataset model.
//!
//! A [`Dataset`] is an immutable-per-request, column-oriented table with no
//! guaranteed schema: columns are typed independently and cells may be null.
//! Row order carries no meaning except for date columns once one is resolved.

mod ingest;

pub use ingest::{read_csv, read_csv_path};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single cell value. Heterogeneous files parse into the narrowest type
/// the whole column supports; anything else stays a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Str(String),
}

impl Value {
    /// Numeric view of the cell. Strings are coerced when they parse as a
    /// number after stripping thousands separators; dates and nulls do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(s) => {
                let cleaned = s.trim().replace(',', "");
                cleaned.parse::<f64>().ok()
            }
            Value::Null | Value::Date(_) => None,
        }
    }

    /// Date view of the cell. Strings are coerced through the ingest-time
    /// format list; numbers and nulls do not coerce.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Str(s) => ingest::parse_date(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Date(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A named column of cells. All rows of a dataset have the same length.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Whether a majority of non-null cells coerce to a number.
    pub fn is_numeric(&self) -> bool {
        let non_null = self.values.iter().filter(|v| !v.is_null()).count();
        if non_null == 0 {
            return false;
        }
        let numeric = self.values.iter().filter(|v| v.as_f64().is_some()).count();
        numeric * 2 > non_null
    }
}

/// Column-oriented table held in session state for the duration of a user's
/// interaction. Created once at ingestion; every page re-derives from it.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a dataset from (name, cells) pairs. Test and ingest convenience.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Names of columns whose cells are mostly numeric.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Where the current dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Upload,
    Warehouse,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Upload => "upload",
            DataSource::Warehouse => "warehouse",
        }
    }
}

/// Session-scoped application state.
///
/// All writes go through [`SessionState::ingest`]; readers get cheap
/// `Arc<Dataset>` handles and never observe partial mutation.
#[derive(Debug, Default)]
pub struct SessionState {
    dataset: Option<Arc<Dataset>>,
    source: Option<DataSource>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current dataset. The single ingestion entry point.
    pub fn ingest(&mut self, dataset: Dataset, source: DataSource) -> Arc<Dataset> {
        tracing::info!(
            rows = dataset.num_rows(),
            columns = dataset.num_columns(),
            source = source.as_str(),
            "dataset ingested into session"
        );
        let handle = Arc::new(dataset);
        self.dataset = Some(Arc::clone(&handle));
        self.source = Some(source);
        handle
    }

    /// Read handle to the current dataset, if any.
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.as_ref().map(Arc::clone)
    }

    pub fn source(&self) -> Option<DataSource> {
        self.source
    }

    /// Drop the current dataset (logout / reset).
    pub fn reset(&mut self) {
        self.dataset = None;
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_columns(vec![
            (
                "sales",
                vec![Value::Float(10.0), Value::Float(20.5), Value::Null],
            ),
            (
                "outlet",
                vec![
                    Value::Str("A".into()),
                    Value::Str("B".into()),
                    Value::Str("A".into()),
                ],
            ),
        ])
    }

    #[test]
    fn test_value_numeric_coercion() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Str("1,200.50".into()).as_f64(), Some(1200.50));
        assert_eq!(Value::Str("n/a".into()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_value_date_coercion() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(Value::Date(d).as_date(), Some(d));
        assert_eq!(Value::Str("2024-01-05".into()).as_date(), Some(d));
        assert_eq!(Value::Str("not a date".into()).as_date(), None);
        assert_eq!(Value::Int(20240105).as_date(), None);
    }

    #[test]
    fn test_dataset_shape() {
        let ds = sample();
        assert_eq!(ds.num_rows(), 3);
        assert_eq!(ds.num_columns(), 2);
        assert!(ds.column("sales").is_some());
        assert!(ds.column("missing").is_none());
    }

    #[test]
    fn test_numeric_column_detection() {
        let ds = sample();
        assert_eq!(ds.numeric_column_names(), vec!["sales"]);
    }

    #[test]
    fn test_empty_dataset() {
        let ds = Dataset::default();
        assert!(ds.is_empty());
        assert_eq!(ds.num_rows(), 0);
        assert_eq!(ds.column_names().count(), 0);
    }

    #[test]
    fn test_session_single_writer() {
        let mut session = SessionState::new();
        assert!(session.dataset().is_none());

        session.ingest(sample(), DataSource::Upload);
        let first = session.dataset().unwrap();
        assert_eq!(first.num_rows(), 3);
        assert_eq!(session.source(), Some(DataSource::Upload));

        // A reader's handle survives re-ingestion unchanged.
        session.ingest(Dataset::default(), DataSource::Warehouse);
        assert_eq!(first.num_rows(), 3);
        assert_eq!(session.dataset().unwrap().num_rows(), 0);

        session.reset();
        assert!(session.dataset().is_none());
        assert!(session.source().is_none());
    }
}
