use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use polars::prelude::*;

use super::types::{ColumnKind, ColumnProfile, MissingColumn, TableProfile};

/// Profiles a table with no schema assumptions. Works on any shape,
/// including zero rows and zero columns, and never fails: irregular data
/// shows up as absent statistics, not errors.
pub fn profile(table: &DataFrame) -> TableProfile {
    let row_count = table.height();
    let column_count = table.width();

    let columns: Vec<ColumnProfile> = table.get_columns().iter().map(profile_column).collect();

    let numeric_column_count = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .count();

    let cell_count = row_count * column_count;
    let fill_rate = if cell_count == 0 {
        // A table with no cells has nothing missing.
        100.0
    } else {
        let non_null: usize = columns.iter().map(|c| c.non_null_count).sum();
        non_null as f64 / cell_count as f64 * 100.0
    };

    TableProfile {
        row_count,
        column_count,
        numeric_column_count,
        fill_rate,
        columns,
    }
}

fn profile_column(series: &Series) -> ColumnProfile {
    let len = series.len();
    let null_count = series.null_count();
    let non_null_count = len - null_count;
    let null_rate = if len == 0 {
        0.0
    } else {
        null_count as f64 / len as f64
    };

    let kind = classify(series.dtype());
    let (variance, max) = if kind == ColumnKind::Numeric {
        let values = numeric_values(series);
        (sample_variance(&values), values.iter().copied().reduce(f64::max))
    } else {
        (None, None)
    };

    ColumnProfile {
        name: series.name().to_string(),
        kind,
        non_null_count,
        null_rate,
        variance,
        max,
    }
}

/// Classification follows the declared dtype. All-null columns with an
/// unknown dtype fall through to `Other`, as do temporal columns.
fn classify(dtype: &DataType) -> ColumnKind {
    if dtype.is_numeric() {
        ColumnKind::Numeric
    } else {
        match dtype {
            DataType::String | DataType::Boolean => ColumnKind::Categorical,
            _ => ColumnKind::Other,
        }
    }
}

/// Non-null, non-NaN values of a numeric column, widened to f64.
/// Non-numeric columns come back empty.
pub(crate) fn numeric_values(series: &Series) -> Vec<f64> {
    let casted = match series.cast(&DataType::Float64) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    match casted.f64() {
        Ok(ca) => ca.into_iter().flatten().filter(|v| !v.is_nan()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Sample variance (n - 1 denominator). Undefined below two values so it
/// can never be NaN.
fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let sum_sq = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
    Some(sum_sq / (n - 1) as f64)
}

/// Stable identity for a table's structure: shape, column names, dtypes.
/// Used as the profile-cache key.
pub fn fingerprint(table: &DataFrame) -> u64 {
    let mut hasher = DefaultHasher::new();
    table.height().hash(&mut hasher);
    table.width().hash(&mut hasher);
    for series in table.get_columns() {
        series.name().hash(&mut hasher);
        format!("{:?}", series.dtype()).hash(&mut hasher);
        series.null_count().hash(&mut hasher);
    }
    hasher.finish()
}

/// Columns with at least one missing value, worst first. Ties keep the
/// table's column order.
pub fn missing_value_report(profile: &TableProfile) -> Vec<MissingColumn> {
    let mut report: Vec<MissingColumn> = profile
        .columns
        .iter()
        .filter_map(|col| {
            let null_count = profile.row_count - col.non_null_count;
            if null_count == 0 {
                return None;
            }
            Some(MissingColumn {
                name: col.name.clone(),
                null_count,
                null_pct: col.null_rate * 100.0,
            })
        })
        .collect();
    report.sort_by(|a, b| b.null_pct.partial_cmp(&a.null_pct).unwrap_or(std::cmp::Ordering::Equal));
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_numeric_columns() -> DataFrame {
        let a = Series::new("A", vec![1.0, 2.0, 3.0]);
        let b = Series::new("B", vec![10.0, 20.0, 30.0]);
        DataFrame::new(vec![a, b]).unwrap()
    }

    #[test]
    fn dense_numeric_table() {
        let df = two_numeric_columns();
        let p = profile(&df);

        assert_eq!(p.row_count, 3);
        assert_eq!(p.column_count, 2);
        assert_eq!(p.numeric_column_count, 2);
        assert_eq!(p.fill_rate, 100.0);

        let a = &p.columns[0];
        let b = &p.columns[1];
        assert!((a.variance.unwrap() - 1.0).abs() < 1e-9);
        assert!((b.variance.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(b.max, Some(30.0));
    }

    #[test]
    fn all_null_numeric_column_reports_absent_stats() {
        let x = Series::new("X", vec![None::<f64>; 4]);
        let df = DataFrame::new(vec![x]).unwrap();
        let p = profile(&df);

        let col = &p.columns[0];
        assert_eq!(col.kind, ColumnKind::Numeric);
        assert_eq!(col.non_null_count, 0);
        assert_eq!(col.null_rate, 1.0);
        assert_eq!(col.variance, None);
        assert_eq!(col.max, None);
        assert_eq!(p.fill_rate, 0.0);
    }

    #[test]
    fn single_value_has_max_but_no_variance() {
        let x = Series::new("X", vec![Some(7.0), None, None]);
        let df = DataFrame::new(vec![x]).unwrap();
        let p = profile(&df);

        let col = &p.columns[0];
        assert_eq!(col.variance, None);
        assert_eq!(col.max, Some(7.0));
    }

    #[test]
    fn zero_rows_is_fully_filled() {
        let df = DataFrame::new(vec![
            Series::new("a", Vec::<Option<f64>>::new()),
            Series::new("b", Vec::<Option<f64>>::new()),
            Series::new("c", Vec::<String>::new()),
        ])
        .unwrap();
        let p = profile(&df);

        assert_eq!(p.row_count, 0);
        assert_eq!(p.column_count, 3);
        assert_eq!(p.fill_rate, 100.0);
        for col in &p.columns {
            assert_eq!(col.null_rate, 0.0);
        }
    }

    #[test]
    fn zero_columns_is_fully_filled() {
        let p = profile(&DataFrame::empty());
        assert_eq!(p.column_count, 0);
        assert_eq!(p.fill_rate, 100.0);
    }

    #[test]
    fn fill_rate_stays_in_bounds() {
        let x = Series::new("x", vec![Some(1.0), None, Some(3.0), None]);
        let t = Series::new("t", vec![Some("a"), None, None, None]);
        let df = DataFrame::new(vec![x, t]).unwrap();
        let p = profile(&df);

        assert!(p.fill_rate > 0.0 && p.fill_rate < 100.0);
        assert!((p.fill_rate - 37.5).abs() < 1e-9);
    }

    #[test]
    fn text_columns_are_categorical() {
        let t = Series::new("name", vec!["Verra", "Gold Standard"]);
        let df = DataFrame::new(vec![t]).unwrap();
        let p = profile(&df);

        assert_eq!(p.numeric_column_count, 0);
        assert_eq!(p.columns[0].kind, ColumnKind::Categorical);
        assert_eq!(p.columns[0].variance, None);
    }

    #[test]
    fn profiling_is_idempotent() {
        let df = two_numeric_columns();
        assert_eq!(profile(&df), profile(&df));
    }

    #[test]
    fn fingerprint_is_stable_and_name_sensitive() {
        let df = two_numeric_columns();
        assert_eq!(fingerprint(&df), fingerprint(&df));

        let renamed = DataFrame::new(vec![
            Series::new("A", vec![1.0, 2.0, 3.0]),
            Series::new("C", vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();
        assert_ne!(fingerprint(&df), fingerprint(&renamed));
    }

    #[test]
    fn missing_report_sorts_worst_first() {
        let df = DataFrame::new(vec![
            Series::new("mostly_there", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
            Series::new("mostly_gone", vec![Some(1.0), None, None, None]),
            Series::new("dense", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let report = missing_value_report(&profile(&df));

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "mostly_gone");
        assert_eq!(report[0].null_count, 3);
        assert_eq!(report[1].name, "mostly_there");
        assert!((report[0].null_pct - 75.0).abs() < 1e-9);
    }
}
