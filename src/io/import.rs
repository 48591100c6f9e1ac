//! CSV loading of historical monthly rainfall.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::{Aggregation, DataConfig, parse_month};
use crate::error::{ForecastError, Result};
use crate::series::{HistoricalData, Series, TimePoint};

/// Loaded data plus row accounting.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub data: HistoricalData,
    /// Data rows read, including skipped ones.
    pub rows_read: usize,
    /// Rows dropped for an unparseable date, value, or district.
    pub skipped: usize,
}

/// Loads historical data from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, a configured column is
/// missing, or the CSV is malformed.
pub fn load_csv(path: &Path, layout: &DataConfig) -> Result<ImportReport> {
    let file = File::open(path).map_err(|e| {
        ForecastError::Io(io::Error::new(
            e.kind(),
            format!("cannot open \"{}\": {e}", path.display()),
        ))
    })?;
    let report = read_csv(io::BufReader::new(file), layout)?;
    info!(
        path = %path.display(),
        districts = report.data.len(),
        rows = report.rows_read,
        skipped = report.skipped,
        "historical data loaded"
    );
    Ok(report)
}

/// Reads historical data from any CSV source.
///
/// Dates are truncated to month start; duplicate months within a district
/// are combined per `layout.aggregation`.
///
/// # Errors
///
/// Same as [`load_csv`], minus file opening.
pub fn read_csv(reader: impl Read, layout: &DataConfig) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ForecastError::InvalidInput(format!("CSV has no \"{name}\" column"))
        })
    };
    let date_idx = column(&layout.date_column)?;
    let value_idx = column(&layout.value_column)?;
    let district_idx = column(&layout.district_column)?;
    let name_idx = layout
        .district_name_column
        .as_deref()
        .and_then(|n| headers.iter().position(|h| h == n));

    let mut buckets: BTreeMap<String, BTreeMap<NaiveDate, (f64, usize)>> = BTreeMap::new();
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    let mut report = ImportReport::default();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        report.rows_read += 1;

        let district = record.get(district_idx).unwrap_or("");
        let date = record.get(date_idx).and_then(parse_date);
        let value = record
            .get(value_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());

        let (Some(date), Some(value)) = (date, value) else {
            debug!(line = line + 2, "skipping row with unparseable date or value");
            report.skipped += 1;
            continue;
        };
        if district.is_empty() {
            debug!(line = line + 2, "skipping row without district");
            report.skipped += 1;
            continue;
        }

        let entry = buckets
            .entry(district.to_string())
            .or_default()
            .entry(date)
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;

        if let Some(name) = name_idx.and_then(|i| record.get(i)).filter(|n| !n.is_empty()) {
            names
                .entry(district.to_string())
                .or_insert_with(|| name.to_string());
        }
    }

    if report.skipped > 0 {
        warn!(skipped = report.skipped, "dropped unparseable rows");
    }

    for (district, months) in buckets {
        let points = months
            .into_iter()
            .map(|(date, (sum, n))| {
                let value = match layout.aggregation {
                    Aggregation::Mean => sum / n as f64,
                    Aggregation::Sum => sum,
                };
                TimePoint::new(date, value)
            })
            .collect();
        report.data.insert(Series::new(district, points)?);
    }
    for (district, name) in names {
        report.data.set_name(district, name);
    }

    Ok(report)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM`, and timestamps starting with a date.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = s.split(['T', ' ']).next().unwrap_or(s);
    parse_month(head).ok()
}
