use chrono::Utc;
use csv::WriterBuilder;
use polars::prelude::*;

use crate::error::AppError;
use crate::services::workbook::cell_to_string;

/// Serializes one sheet to CSV: a header row of column names, then data
/// rows with nulls as empty fields.
pub fn sheet_to_csv(table: &DataFrame) -> Result<Vec<u8>, AppError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let names = table.get_column_names();
    writer
        .write_record(&names)
        .map_err(|e| AppError::Export(format!("Failed to write CSV header: {}", e)))?;

    for idx in 0..table.height() {
        let record: Vec<String> = table
            .get_columns()
            .iter()
            .map(|series| match series.get(idx) {
                Ok(value) => cell_to_string(value),
                Err(_) => String::new(),
            })
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| AppError::Export(format!("Failed to write CSV row {}: {}", idx, e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Export(format!("Failed to finish CSV export: {}", e)))
}

/// Download name for an exported sheet: spaces underscored, stamped with
/// the current UTC date.
pub fn export_file_name(sheet_name: &str) -> String {
    format!(
        "{}_{}.csv",
        sheet_name.replace(' ', "_"),
        Utc::now().format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_writes_header_and_empty_nulls() {
        let df = DataFrame::new(vec![
            Series::new("standard", vec![Some("Verra"), None]),
            Series::new("projects", vec![Some(758.0), Some(29.0)]),
        ])
        .unwrap();

        let bytes = sheet_to_csv(&df).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "standard,projects");
        assert_eq!(lines[1], "Verra,758");
        assert_eq!(lines[2], ",29");
    }

    #[test]
    fn empty_table_exports_header_only() {
        let df = DataFrame::new(vec![Series::new("a", Vec::<Option<f64>>::new())]).unwrap();
        let text = String::from_utf8(sheet_to_csv(&df).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn export_name_is_date_stamped() {
        let name = export_file_name("4. Agriculture");
        assert!(name.starts_with("4._Agriculture_"));
        assert!(name.ends_with(".csv"));
    }
}
