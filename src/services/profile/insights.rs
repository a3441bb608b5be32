use polars::prelude::*;

use super::profiler::numeric_values;
use super::types::{ColumnProfile, Insight, InsightKind, InsightOptions, TableProfile};

/// Any column more than this much null trips the default quality warning.
pub const NULL_WARN_THRESHOLD: f64 = 0.30;
/// Strict mode counts columns that are more than half null instead.
pub const STRICT_NULL_THRESHOLD: f64 = 0.50;

/// Derives the ordered insight list for a table using the default options.
pub fn generate_insights(table: &DataFrame, profile: &TableProfile) -> Vec<Insight> {
    generate_insights_with(table, profile, &InsightOptions::default())
}

/// Same, with explicit options. Pure function of its inputs: recomputing on
/// an unchanged table always yields the identical sequence.
///
/// Rules fire in a fixed order:
/// 1. highest-variance numeric column (variability + extremum pair),
/// 2. null-rate quality warning,
/// 3. a single fallback when nothing else fired.
pub fn generate_insights_with(
    table: &DataFrame,
    profile: &TableProfile,
    options: &InsightOptions,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(top) = widest_spread_column(profile) {
        insights.push(Insight {
            kind: InsightKind::Variability,
            message: format!(
                "'{}' shows the widest spread among numeric columns",
                top.name
            ),
        });
        if let Some(max) = column_max(table, &top.name).or(top.max) {
            insights.push(Insight {
                kind: InsightKind::Extremum,
                message: format!("Max value reached in '{}': {}", top.name, format_number(max)),
            });
        }
    }

    if options.strict_nulls {
        let offending = profile
            .columns
            .iter()
            .filter(|c| c.null_rate > STRICT_NULL_THRESHOLD)
            .count();
        if offending > 0 {
            insights.push(Insight {
                kind: InsightKind::DataQualityWarning,
                message: format!(
                    "{} column(s) are more than {:.0}% empty",
                    offending,
                    STRICT_NULL_THRESHOLD * 100.0
                ),
            });
        }
    } else if profile
        .columns
        .iter()
        .any(|c| c.null_rate > NULL_WARN_THRESHOLD)
    {
        insights.push(Insight {
            kind: InsightKind::DataQualityWarning,
            message: format!(
                "Some columns are more than {:.0}% empty",
                NULL_WARN_THRESHOLD * 100.0
            ),
        });
    }

    if insights.is_empty() {
        insights.push(Insight {
            kind: InsightKind::NoDataFallback,
            message: "No actionable pattern was found in this sheet".to_string(),
        });
    }

    insights
}

/// Highest-variance column; on ties the earlier column wins, so the scan
/// only replaces on a strictly greater variance.
fn widest_spread_column(profile: &TableProfile) -> Option<&ColumnProfile> {
    let mut top: Option<(&ColumnProfile, f64)> = None;
    for col in &profile.columns {
        if let Some(var) = col.variance {
            match top {
                Some((_, best)) if var <= best => {}
                _ => top = Some((col, var)),
            }
        }
    }
    top.map(|(col, _)| col)
}

fn column_max(table: &DataFrame, name: &str) -> Option<f64> {
    let series = table.column(name).ok()?;
    numeric_values(series).into_iter().reduce(f64::max)
}

/// Locale-free rendering with thousands separators: whole numbers drop the
/// fraction, everything else keeps two decimals.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let negative = value < 0.0;
    let abs = value.abs();
    let body = if abs.fract() == 0.0 {
        group_thousands(&format!("{:.0}", abs))
    } else {
        let text = format!("{:.2}", abs);
        match text.split_once('.') {
            Some((int_part, frac)) => format!("{}.{}", group_thousands(int_part), frac),
            None => group_thousands(&text),
        }
    };
    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::profiler::profile;
    use super::*;

    fn insights_for(df: &DataFrame) -> Vec<Insight> {
        let p = profile(df);
        generate_insights(df, &p)
    }

    #[test]
    fn dense_numeric_table_yields_variability_then_extremum() {
        let df = DataFrame::new(vec![
            Series::new("A", vec![1.0, 2.0, 3.0]),
            Series::new("B", vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();
        let insights = insights_for(&df);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Variability);
        assert!(insights[0].message.contains("'B'"));
        assert_eq!(insights[1].kind, InsightKind::Extremum);
        assert!(insights[1].message.contains("'B'"));
        assert!(insights[1].message.contains("30"));
    }

    #[test]
    fn high_null_rate_triggers_quality_warning() {
        let values: Vec<Option<f64>> = (0..10).map(|i| if i < 4 { Some(i as f64) } else { None }).collect();
        let df = DataFrame::new(vec![Series::new("X", values)]).unwrap();
        let insights = insights_for(&df);

        assert!(insights
            .iter()
            .any(|i| i.kind == InsightKind::DataQualityWarning));
    }

    #[test]
    fn threshold_is_strictly_greater() {
        // Exactly 30% null must not warn.
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0), Some(7.0), None, None, None];
        let df = DataFrame::new(vec![Series::new("X", values)]).unwrap();
        let insights = insights_for(&df);

        assert!(insights
            .iter()
            .all(|i| i.kind != InsightKind::DataQualityWarning));
    }

    #[test]
    fn strict_mode_counts_offending_columns() {
        let df = DataFrame::new(vec![
            Series::new("mostly_gone", vec![Some(1.0), None, None, None]),
            Series::new("half_gone", vec![Some(1.0), Some(2.0), None, None]),
            Series::new("label", vec![Some("a"), None, None, None]),
        ])
        .unwrap();
        let p = profile(&df);
        let insights = generate_insights_with(&df, &p, &InsightOptions { strict_nulls: true });

        // half_gone sits exactly at 50% and must not be counted.
        let warning = insights
            .iter()
            .find(|i| i.kind == InsightKind::DataQualityWarning)
            .unwrap();
        assert!(warning.message.starts_with("2 column(s)"));
    }

    #[test]
    fn empty_table_falls_back() {
        let df = DataFrame::new(vec![
            Series::new("a", Vec::<Option<f64>>::new()),
            Series::new("b", Vec::<Option<f64>>::new()),
            Series::new("c", Vec::<Option<f64>>::new()),
        ])
        .unwrap();
        let insights = insights_for(&df);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::NoDataFallback);
    }

    #[test]
    fn text_only_table_falls_back() {
        let df = DataFrame::new(vec![Series::new(
            "methodology",
            vec!["VM0042", "AR-ACM0003", "VM0017"],
        )])
        .unwrap();
        let insights = insights_for(&df);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::NoDataFallback);
    }

    #[test]
    fn insights_are_never_empty() {
        for df in [
            DataFrame::empty(),
            DataFrame::new(vec![Series::new("x", vec![None::<f64>; 3])]).unwrap(),
            DataFrame::new(vec![Series::new("x", vec![1.0, 2.0])]).unwrap(),
        ] {
            assert!(!insights_for(&df).is_empty());
        }
    }

    #[test]
    fn variance_tie_keeps_first_column() {
        let df = DataFrame::new(vec![
            Series::new("first", vec![1.0, 2.0, 3.0]),
            Series::new("second", vec![4.0, 5.0, 6.0]),
        ])
        .unwrap();
        let insights = insights_for(&df);

        assert!(insights[0].message.contains("'first'"));
    }

    #[test]
    fn warning_comes_after_variability_pair() {
        let df = DataFrame::new(vec![
            Series::new("values", vec![Some(10.0), Some(200.0), Some(3.0), None, None]),
            Series::new("sparse", vec![Some("x"), None, None, None, None]),
        ])
        .unwrap();
        let insights = insights_for(&df);

        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Variability,
                InsightKind::Extremum,
                InsightKind::DataQualityWarning
            ]
        );
    }

    #[test]
    fn generation_is_deterministic() {
        let df = DataFrame::new(vec![
            Series::new("a", vec![Some(1.0), None, Some(9.0)]),
            Series::new("b", vec![Some("x"), Some("y"), None]),
        ])
        .unwrap();
        let p = profile(&df);
        assert_eq!(generate_insights(&df, &p), generate_insights(&df, &p));
    }

    #[test]
    fn numbers_group_thousands() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(1_234_567.0), "1,234,567");
        assert_eq!(format_number(-4_500.0), "-4,500");
        assert_eq!(format_number(12.5), "12.50");
        assert_eq!(format_number(1234.56), "1,234.56");
        assert_eq!(format_number(999.0), "999");
    }
}
