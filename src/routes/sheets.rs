use axum::{
    extract::{Path, Query, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppError,
    services::{
        export,
        profile::{self, InsightOptions, TableProfile},
        workbook::{self, Sheet, Workbook},
    },
    AppState,
};
use tower_http::cors::{Any, CorsLayer};

const DEFAULT_PREVIEW_ROWS: usize = 100;
const MAX_PREVIEW_ROWS: usize = 500;

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/workbook/load", post(load_workbook))
        .route("/workbook/summary", get(workbook_summary))
        .route("/workbook/invalidate", post(invalidate_workbook))
        .route("/sheets/:name/profile", get(sheet_profile))
        .route("/sheets/:name/insights", get(sheet_insights))
        .route("/sheets/:name/preview", get(sheet_preview))
        .route("/sheets/:name/export", get(export_sheet))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    source: String,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsightQuery {
    source: Option<String>,
    strict: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    source: Option<String>,
    rows: Option<usize>,
}

#[derive(Debug, Serialize, Clone)]
pub struct SheetSummary {
    name: String,
    rows: usize,
    columns: usize,
    numeric_columns: usize,
    fill_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct WorkbookSummary {
    source: String,
    sheet_names: Vec<String>,
    sheets: Vec<SheetSummary>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ColumnProfileDto {
    name: String,
    kind: &'static str,
    non_null_count: usize,
    null_rate: f64,
    variance: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct MissingColumnDto {
    name: String,
    null_count: usize,
    null_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct TableProfileDto {
    sheet: String,
    row_count: usize,
    column_count: usize,
    numeric_column_count: usize,
    fill_rate: f64,
    columns: Vec<ColumnProfileDto>,
    missing_values: Vec<MissingColumnDto>,
}

#[derive(Debug, Serialize)]
pub struct InsightDto {
    kind: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    sheet: String,
    strict_nulls: bool,
    insights: Vec<InsightDto>,
}

#[derive(Debug, Serialize)]
pub struct PreviewColumnDto {
    name: String,
    samples: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    sheet: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: Vec<PreviewColumnDto>,
}

async fn load_workbook(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Result<Json<WorkbookSummary>, AppError> {
    let workbook = resolve_workbook(&state, request.source).await?;
    Ok(Json(summarize_workbook(&state, &workbook)))
}

async fn workbook_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<WorkbookSummary>, AppError> {
    let workbook = resolve_workbook(&state, query.source).await?;
    Ok(Json(summarize_workbook(&state, &workbook)))
}

async fn invalidate_workbook(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.invalidate(&request.source);
    Ok(Json(serde_json::json!({ "invalidated": request.source })))
}

async fn sheet_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<TableProfileDto>, AppError> {
    let workbook = resolve_workbook(&state, query.source).await?;
    let sheet = find_sheet(&workbook, &name)?;
    let profile = state.store.profile_for(&sheet.table);
    Ok(Json(profile_dto(&sheet.name, &profile)))
}

async fn sheet_insights(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<InsightQuery>,
) -> Result<Json<InsightsResponse>, AppError> {
    let workbook = resolve_workbook(&state, query.source).await?;
    let sheet = find_sheet(&workbook, &name)?;
    let profile = state.store.profile_for(&sheet.table);

    let options = InsightOptions {
        strict_nulls: query.strict.unwrap_or(state.config.strict_null_insights),
    };
    let insights = profile::generate_insights_with(&sheet.table, &profile, &options);
    tracing::info!("Generated {} insights for sheet {}", insights.len(), name);

    Ok(Json(InsightsResponse {
        sheet: sheet.name.clone(),
        strict_nulls: options.strict_nulls,
        insights: insights
            .into_iter()
            .map(|i| InsightDto {
                kind: i.kind.as_str(),
                message: i.message,
            })
            .collect(),
    }))
}

async fn sheet_preview(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let workbook = resolve_workbook(&state, query.source).await?;
    let sheet = find_sheet(&workbook, &name)?;

    let limit = query
        .rows
        .unwrap_or(DEFAULT_PREVIEW_ROWS)
        .min(MAX_PREVIEW_ROWS);
    let headers: Vec<String> = sheet
        .table
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    let columns = sheet
        .table
        .get_columns()
        .iter()
        .map(|series| PreviewColumnDto {
            name: series.name().to_string(),
            samples: workbook::sample_values(series).to_vec(),
        })
        .collect();

    Ok(Json(PreviewResponse {
        sheet: sheet.name.clone(),
        headers,
        rows: workbook::preview_rows(&sheet.table, limit),
        columns,
    }))
}

async fn export_sheet(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<SourceQuery>,
) -> Result<Response, AppError> {
    let workbook = resolve_workbook(&state, query.source).await?;
    let sheet = find_sheet(&workbook, &name)?;

    let csv = export::sheet_to_csv(&sheet.table)?;
    let file_name = export::export_file_name(&sheet.name);
    tracing::info!("Exporting sheet {} as {} ({} bytes)", name, file_name, csv.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Resolves a workbook through the session store: explicit source first,
/// then the configured default; loads and caches on miss.
async fn resolve_workbook(
    state: &AppState,
    source: Option<String>,
) -> Result<Arc<Workbook>, AppError> {
    let source = source
        .or_else(|| state.config.dataset_url.clone())
        .ok_or_else(|| AppError::InvalidInput("No workbook source provided".to_string()))?;

    if let Some(cached) = state.store.get(&source) {
        return Ok(cached);
    }

    tracing::info!("Loading workbook from {}", source);
    let start = std::time::Instant::now();
    let data = if source.starts_with("http://") || source.starts_with("https://") {
        workbook::fetch_workbook(&source).await?
    } else {
        workbook::read_workbook(&source).await?
    };
    if data.len() > state.config.max_file_size {
        return Err(AppError::InvalidInput(format!(
            "Workbook exceeds the {} byte limit",
            state.config.max_file_size
        )));
    }
    tracing::info!(
        "Workbook fetched, size: {}KB, took: {:?}",
        data.len() / 1024,
        start.elapsed()
    );

    let parsed = workbook::parse_workbook(&source, data)?;
    Ok(state.store.insert(parsed))
}

fn find_sheet<'a>(workbook: &'a Workbook, name: &str) -> Result<&'a Sheet, AppError> {
    workbook
        .sheet(name)
        .ok_or_else(|| AppError::SheetNotFound(name.to_string()))
}

fn summarize_workbook(state: &AppState, workbook: &Workbook) -> WorkbookSummary {
    let sheets = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let profile = state.store.profile_for(&sheet.table);
            SheetSummary {
                name: sheet.name.clone(),
                rows: profile.row_count,
                columns: profile.column_count,
                numeric_columns: profile.numeric_column_count,
                fill_rate: profile.fill_rate,
            }
        })
        .collect();

    WorkbookSummary {
        source: workbook.source().to_string(),
        sheet_names: workbook.sheet_names(),
        sheets,
    }
}

fn profile_dto(sheet_name: &str, profile: &TableProfile) -> TableProfileDto {
    TableProfileDto {
        sheet: sheet_name.to_string(),
        row_count: profile.row_count,
        column_count: profile.column_count,
        numeric_column_count: profile.numeric_column_count,
        fill_rate: profile.fill_rate,
        columns: profile
            .columns
            .iter()
            .map(|col| ColumnProfileDto {
                name: col.name.clone(),
                kind: col.kind.as_str(),
                non_null_count: col.non_null_count,
                null_rate: col.null_rate,
                variance: col.variance,
                max: col.max,
            })
            .collect(),
        missing_values: profile::missing_value_report(profile)
            .into_iter()
            .map(|m| MissingColumnDto {
                name: m.name,
                null_count: m.null_count,
                null_pct: m.null_pct,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn profile_dto_carries_kinds_and_missing_report() {
        let df = DataFrame::new(vec![
            Series::new("credits", vec![Some(100.0), None, Some(300.0)]),
            Series::new("standard", vec!["Verra", "Gold Standard", "Plan Vivo"]),
        ])
        .unwrap();
        let profile = profile::profile(&df);
        let dto = profile_dto("1. Standards", &profile);

        assert_eq!(dto.sheet, "1. Standards");
        assert_eq!(dto.columns[0].kind, "numeric");
        assert_eq!(dto.columns[1].kind, "categorical");
        assert_eq!(dto.missing_values.len(), 1);
        assert_eq!(dto.missing_values[0].name, "credits");
    }
}
