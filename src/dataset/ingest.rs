//! CSV ingestion for the dataset boundary.
//!
//! The core only needs named columns with consistently typed cells, so the
//! reader infers one type per column: Int if every non-empty cell parses as an
//! integer, else Float, else Date, else Str. Empty cells become nulls.

use super::{Column, Dataset, Value};
use crate::AnalyticsError;
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

/// Date formats tried in order. Day-first forms come before month-first so
/// ambiguous cells resolve consistently; ISO dates always win.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell against the supported format list.
pub(super) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredType {
    Int,
    Float,
    Date,
    Str,
}

/// Narrowest type every non-empty cell of the column supports.
fn infer_type(cells: &[String]) -> InferredType {
    let mut seen_any = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_date = true;

    for cell in cells {
        let s = cell.trim();
        if s.is_empty() {
            continue;
        }
        seen_any = true;
        if all_int && s.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && s.replace(',', "").parse::<f64>().is_err() {
            all_float = false;
        }
        if all_date && parse_date(s).is_none() {
            all_date = false;
        }
        if !all_int && !all_float && !all_date {
            return InferredType::Str;
        }
    }

    if !seen_any {
        return InferredType::Str;
    }
    if all_int {
        InferredType::Int
    } else if all_float {
        InferredType::Float
    } else if all_date {
        InferredType::Date
    } else {
        InferredType::Str
    }
}

fn coerce(cell: &str, ty: InferredType) -> Value {
    let s = cell.trim();
    if s.is_empty() {
        return Value::Null;
    }
    match ty {
        InferredType::Int => s.parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        InferredType::Float => s
            .replace(',', "")
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        InferredType::Date => parse_date(s).map(Value::Date).unwrap_or(Value::Null),
        InferredType::Str => Value::Str(s.to_string()),
    }
}

/// Read a headered CSV into a [`Dataset`].
///
/// Short rows are padded with nulls and long rows truncated to the header
/// width; the reader never fails on ragged data, only on unreadable input.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset, AnalyticsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(AnalyticsError::Ingest("no header row found".to_string()));
    }

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut row_count: usize = 0;
    for record in csv_reader.records() {
        let record = record?;
        for (i, raw) in raw_columns.iter_mut().enumerate() {
            raw.push(record.get(i).unwrap_or("").to_string());
        }
        row_count += 1;
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, cells)| {
            let ty = infer_type(&cells);
            let values = cells.iter().map(|c| coerce(c, ty)).collect();
            Column::new(name, values)
        })
        .collect();

    tracing::info!(rows = row_count, columns = columns.len(), "csv parsed");
    Ok(Dataset::new(columns))
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Dataset, AnalyticsError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_date("2024-01-05"), Some(expected));
        assert_eq!(parse_date("2024/01/05"), Some(expected));
        assert_eq!(parse_date("05-01-2024"), Some(expected));
        assert_eq!(parse_date("05/01/2024"), Some(expected));
        assert_eq!(parse_date("2024-01-05 13:30:00"), Some(expected));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_read_csv_infers_types() {
        let data = "Order_Date,Total_Amount,Outlet_Name,Units\n\
                    2024-01-05,100.5,Alpha Store,3\n\
                    2024-01-20,50,Beta Mart,1\n";
        let ds = read_csv(data.as_bytes()).unwrap();
        assert_eq!(ds.num_rows(), 2);

        let date = ds.column("Order_Date").unwrap();
        assert!(matches!(date.values[0], Value::Date(_)));

        let amount = ds.column("Total_Amount").unwrap();
        assert_eq!(amount.values[0], Value::Float(100.5));

        let outlet = ds.column("Outlet_Name").unwrap();
        assert_eq!(outlet.values[1], Value::Str("Beta Mart".into()));

        let units = ds.column("Units").unwrap();
        assert_eq!(units.values[0], Value::Int(3));
    }

    #[test]
    fn test_read_csv_empty_cells_become_null() {
        let data = "a,b\n1,\n,2\n";
        let ds = read_csv(data.as_bytes()).unwrap();
        assert_eq!(ds.column("a").unwrap().values[1], Value::Null);
        assert_eq!(ds.column("b").unwrap().values[0], Value::Null);
    }

    #[test]
    fn test_read_csv_ragged_rows() {
        let data = "a,b,c\n1,2,3\n4,5\n";
        let ds = read_csv(data.as_bytes()).unwrap();
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.column("c").unwrap().values[1], Value::Null);
    }

    #[test]
    fn test_read_csv_mixed_column_stays_string() {
        let data = "code\n12\nAB-7\n";
        let ds = read_csv(data.as_bytes()).unwrap();
        assert_eq!(ds.column("code").unwrap().values[0], Value::Str("12".into()));
    }

    #[test]
    fn test_read_csv_thousands_separator() {
        let data = "sales\n\"1,200\"\n\"2,400.50\"\n";
        let ds = read_csv(data.as_bytes()).unwrap();
        let col = ds.column("sales").unwrap();
        assert_eq!(col.values[0], Value::Float(1200.0));
        assert_eq!(col.values[1], Value::Float(2400.5));
    }
}
