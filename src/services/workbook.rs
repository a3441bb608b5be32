use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use once_cell::sync::Lazy;
use polars::prelude::*;
use rayon::prelude::*;
use regex::Regex;
use reqwest::Client;
use smallvec::SmallVec;

use crate::error::AppError;

pub const SAMPLE_SIZE: usize = 3;
const TYPE_DETECTION_ROWS: usize = 100;
/// Share of sampled non-empty cells that must agree before a column is
/// treated as numeric or date rather than text.
const TYPE_AGREEMENT: f64 = 0.8;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\d{4}/\d{2}/\d{2}$",
        r"^\d{2}-\d{2}-\d{4}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("date pattern is a valid regex"))
    .collect()
});

/// One named sheet with its parsed table. The table stays owned here;
/// profiling borrows it.
#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    pub table: DataFrame,
}

/// An ordered collection of sheets from one workbook source.
#[derive(Debug)]
pub struct Workbook {
    source: String,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(source: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            source: source.into(),
            sheets,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

pub async fn fetch_workbook(url: &str) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Http(format!("Failed to fetch workbook: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Http(format!(
            "Failed to fetch workbook. Status: {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::Http(format!("Failed to read response bytes: {}", e)))
}

pub async fn read_workbook(path: &str) -> Result<Bytes, AppError> {
    if !Path::new(path).exists() {
        return Err(AppError::InvalidInput(format!(
            "Workbook path does not exist: {}",
            path
        )));
    }
    let data = tokio::fs::read(path).await?;
    Ok(Bytes::from(data))
}

/// Parses every sheet of an XLSX workbook into a table. Sheets that cannot
/// be read are skipped with a warning; an empty sheet becomes an empty
/// table so downstream profiling still works on it.
pub fn parse_workbook(source: &str, data: Bytes) -> Result<Workbook, AppError> {
    let start = std::time::Instant::now();
    let cursor = Cursor::new(data);

    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open workbook: {}", e);
        AppError::FileProcessing(format!("Failed to open workbook: {}", e))
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);
    if sheet_names.is_empty() {
        return Err(AppError::FileProcessing(
            "No sheets found in workbook".to_string(),
        ));
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        match workbook.worksheet_range(sheet_name) {
            Ok(range) => {
                let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
                match sheet_table(&rows) {
                    Ok(table) => {
                        tracing::info!(
                            "Parsed sheet {}: {} rows x {} columns",
                            sheet_name,
                            table.height(),
                            table.width()
                        );
                        sheets.push(Sheet {
                            name: sheet_name.clone(),
                            table,
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to build table for sheet {}: {}", sheet_name, e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
                continue;
            }
        }
    }

    tracing::info!("Workbook parsed in {:?}", start.elapsed());
    Ok(Workbook::new(source, sheets))
}

fn sheet_table(rows: &[Vec<Data>]) -> Result<DataFrame, AppError> {
    let Some(header_row) = rows.first() else {
        return Ok(DataFrame::empty());
    };

    let mut existing_names = HashSet::new();
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| clean_column_name(&cell.to_string(), &mut existing_names))
        .collect();
    if headers.is_empty() {
        return Ok(DataFrame::empty());
    }

    let columns: Vec<Series> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Data> = rows
                .iter()
                .skip(1)
                .map(|row| row.get(idx).cloned().unwrap_or(Data::Empty))
                .collect();
            let column_type = detect_column_type(&values);
            build_series(name, &values, column_type)
        })
        .collect();

    DataFrame::new(columns)
        .map_err(|e| AppError::FileProcessing(format!("Failed to build table: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Numeric,
    Date,
    Text,
    Empty,
}

fn detect_column_type(values: &[Data]) -> ColumnType {
    let sample = &values[..values.len().min(TYPE_DETECTION_ROWS)];
    let (numeric_count, date_count, total) = sample
        .par_iter()
        .fold(
            || (0usize, 0usize, 0usize),
            |(mut numeric, mut date, mut total), value| {
                match value {
                    Data::Float(_) | Data::Int(_) => {
                        numeric += 1;
                        total += 1;
                    }
                    Data::DateTime(_) => {
                        date += 1;
                        total += 1;
                    }
                    Data::String(s) => {
                        if is_date_string(s) {
                            date += 1;
                        }
                        total += 1;
                    }
                    Data::Empty => {}
                    _ => total += 1,
                }
                (numeric, date, total)
            },
        )
        .reduce(|| (0, 0, 0), |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2));

    if total == 0 {
        return ColumnType::Empty;
    }

    let threshold = total as f64 * TYPE_AGREEMENT;
    if numeric_count as f64 >= threshold {
        ColumnType::Numeric
    } else if date_count as f64 >= threshold {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn build_series(name: &str, values: &[Data], column_type: ColumnType) -> Series {
    match column_type {
        ColumnType::Numeric => {
            // Cells that don't carry a number stay null; text like "n/a"
            // never becomes a value.
            let nums: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Data::Float(f) => Some(*f),
                    Data::Int(i) => Some(*i as f64),
                    _ => None,
                })
                .collect();
            Series::new(name, nums)
        }
        ColumnType::Date => {
            let stamps: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Data::DateTime(d) => {
                        let days_since_1900 = d.as_f64();
                        Some((days_since_1900 * 86_400.0 * 1_000_000.0) as i64)
                    }
                    _ => None,
                })
                .collect();
            let series = Series::new(name, stamps);
            match series.cast(&DataType::Datetime(TimeUnit::Microseconds, None)) {
                Ok(dates) => dates,
                Err(_) => series,
            }
        }
        ColumnType::Text => {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(name, strings)
        }
        // No non-empty cell was seen, so there is no type to declare.
        ColumnType::Empty => Series::full_null(name, values.len(), &DataType::Null),
    }
}

pub fn clean_column_name(name: &str, existing_names: &mut HashSet<String>) -> String {
    let base_name = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    let mut cleaned = if base_name.chars().next().map_or(true, |c| !c.is_alphabetic()) {
        format!("col_{}", base_name)
    } else {
        base_name
    };

    // If the name already exists, add a numeric suffix
    let mut counter = 1;
    let original_name = cleaned.clone();
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", original_name, counter);
        counter += 1;
    }

    cleaned
}

fn is_date_string(s: &str) -> bool {
    DATE_PATTERNS.iter().any(|re| re.is_match(s))
}

/// First rows of a table, stringified for display. Nulls render empty.
pub fn preview_rows(table: &DataFrame, limit: usize) -> Vec<Vec<String>> {
    let rows = table.height().min(limit);
    (0..rows)
        .map(|idx| {
            table
                .get_columns()
                .iter()
                .map(|series| match series.get(idx) {
                    Ok(value) => cell_to_string(value),
                    Err(_) => String::new(),
                })
                .collect()
        })
        .collect()
}

/// A handful of leading values from one column, for display next to its
/// profile.
pub fn sample_values(series: &Series) -> SmallVec<[String; SAMPLE_SIZE]> {
    let mut samples = SmallVec::new();
    for idx in 0..series.len().min(SAMPLE_SIZE) {
        samples.push(match series.get(idx) {
            Ok(value) => cell_to_string(value),
            Err(_) => String::new(),
        });
    }
    samples
}

pub(crate) fn cell_to_string(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(v) => v.to_string(),
        AnyValue::Float64(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::Boolean(v) => v.to_string(),
        other => other.to_string(),
    }
}
