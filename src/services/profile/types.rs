/// How a column participates in profiling, decided once per profile call
/// from the declared dtype. Downstream logic switches on this tag instead
/// of re-inspecting raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Other,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Other => "other",
        }
    }
}

/// Per-column statistics. `variance` and `max` are populated for numeric
/// columns only, and stay `None` when the column has no usable values
/// (variance also needs at least two of them).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    /// Fraction of null cells, 0.0 to 1.0. Zero-row tables report 0.0.
    pub null_rate: f64,
    pub variance: Option<f64>,
    pub max: Option<f64>,
}

/// Whole-table statistics plus the ordered column profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_column_count: usize,
    /// Percentage of non-null cells, 0.0 to 100.0. A table with zero cells
    /// counts as fully filled.
    pub fill_rate: f64,
    pub columns: Vec<ColumnProfile>,
}

/// One row of the missing-data report.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingColumn {
    pub name: String,
    pub null_count: usize,
    pub null_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    Variability,
    Extremum,
    DataQualityWarning,
    NoDataFallback,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Variability => "variability",
            InsightKind::Extremum => "extremum",
            InsightKind::DataQualityWarning => "data-quality-warning",
            InsightKind::NoDataFallback => "no-data-fallback",
        }
    }
}

/// A single heuristic observation about a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Knobs for the insight generator. The default mode warns as soon as any
/// column is more than 30% null; strict mode instead counts columns that
/// are more than half null and reports how many there are.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightOptions {
    pub strict_nulls: bool,
}
