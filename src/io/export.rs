//! CSV export for forecast tables and evaluation tables.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::evaluation::EvaluationTable;
use crate::sim::types::ForecastTable;

/// Writes a forecast table to a CSV file at the given path.
///
/// Header is `date` followed by one column per model in table order.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_forecast_csv(table: &ForecastTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_forecast_csv(table, io::BufWriter::new(file))
}

/// Writes a forecast table as CSV to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_forecast_csv(table: &ForecastTable, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["date".to_string()];
    header.extend(table.model_names().map(str::to_string));
    wtr.write_record(&header)?;

    for (i, date) in table.dates.iter().enumerate() {
        let mut row = Vec::with_capacity(table.columns.len() + 1);
        row.push(date.format("%Y-%m-%d").to_string());
        for (_, values) in &table.columns {
            row.push(format_value(values.get(i).copied().unwrap_or(f64::NAN)));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes an evaluation table to a CSV file at the given path.
///
/// Columns are the table's feature schema, then `rfh`, then `date`.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_evaluation_csv(table: &EvaluationTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_evaluation_csv(table, io::BufWriter::new(file))
}

/// Writes an evaluation table as CSV to any writer.
///
/// # Errors
///
/// Returns an error if writing fails or a row cannot be aligned to the
/// table schema.
pub fn write_evaluation_csv(table: &EvaluationTable, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<&str> = table.schema.names().iter().map(String::as_str).collect();
    header.extend(["rfh", "date"]);
    wtr.write_record(&header)?;

    for row in &table.rows {
        let input = table.schema.reconcile(&row.features)?;
        let mut record: Vec<String> = input.values().iter().map(|v| format_value(*v)).collect();
        record.push(format_value(row.target));
        record.push(row.features.date.format("%Y-%m-%d").to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::ForecastPoint;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn table() -> ForecastTable {
        let dates: Vec<NaiveDate> = (1..=3).map(|m| ymd(2025, m)).collect();
        let mut t = ForecastTable::new("D1", dates.clone());
        let a: Vec<ForecastPoint> = dates
            .iter()
            .map(|&date| ForecastPoint { date, value: 1.5 })
            .collect();
        t.push_column("XGBoost", &a);
        t.push_column("LightGBM", &a[..2]);
        t
    }

    #[test]
    fn header_lists_models_in_order() {
        let mut buf = Vec::new();
        write_forecast_csv(&table(), &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let first_line = output.as_deref().unwrap_or("").lines().next().unwrap_or("");
        assert_eq!(first_line, "date,XGBoost,LightGBM");
    }

    #[test]
    fn row_count_matches_dates_and_missing_is_blank() {
        let mut buf = Vec::new();
        write_forecast_csv(&table(), &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        // 1 header + 3 data rows
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2025-01-01,1.5,1.5");
        assert_eq!(lines[3], "2025-03-01,1.5,");
    }

    #[test]
    fn values_keep_full_precision() {
        let value = 0.1 + 0.2;
        let mut t = ForecastTable::new("D1", vec![ymd(2025, 1)]);
        t.push_column("Linear", &[ForecastPoint { date: ymd(2025, 1), value }]);
        let mut buf = Vec::new();
        write_forecast_csv(&t, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let cell = output.lines().nth(1).and_then(|l| l.split(',').nth(1)).unwrap();
        assert_eq!(cell.parse::<f64>().unwrap(), value);
    }

    #[test]
    fn deterministic_output() {
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_forecast_csv(&table(), &mut buf1).ok();
        write_forecast_csv(&table(), &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }
}
