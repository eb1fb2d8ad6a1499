//! REST API handlers for the dashboard
//!
//! These handlers use the shared DashboardService.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use super::service::{DashboardService, ServiceError};
use crate::map::ChoroplethMap;
use crate::query::ResultTable;
use crate::region_names::RegionName;
use crate::report::{CaseStudyReport, FilterScope, OverviewReport, OverviewView};

/// Route serving the boundary document; map figures reference it by URL
pub const BOUNDARIES_PATH: &str = "/api/v1/boundaries";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct QuestionOption {
    pub id: u8,
    pub title: &'static str,
}

#[derive(Serialize)]
pub struct OptionsResponse {
    pub pages: Vec<&'static str>,
    pub questions: Vec<QuestionOption>,
    pub years: Vec<i32>,
    pub quarters: Vec<u8>,
}

#[derive(Serialize)]
pub struct MapResponse {
    pub title: String,
    pub metric: String,
    pub regions: Vec<RegionFill>,
    pub unmatched: Vec<RegionName>,
    pub figure: Value,
}

#[derive(Serialize)]
pub struct RegionFill {
    pub region: RegionName,
    pub value: f64,
    pub fill: String,
}

impl From<&ChoroplethMap> for MapResponse {
    fn from(map: &ChoroplethMap) -> Self {
        Self {
            title: map.title.clone(),
            metric: map.metric.clone(),
            regions: map
                .regions
                .iter()
                .map(|r| RegionFill {
                    region: r.region.clone(),
                    value: r.value,
                    fill: r.fill.clone(),
                })
                .collect(),
            unmatched: map.unmatched.clone(),
            figure: map.to_plotly(json!(BOUNDARIES_PATH)),
        }
    }
}

#[derive(Serialize)]
pub struct CaseStudyResponse {
    pub question: u8,
    pub title: &'static str,
    pub year: i32,
    pub quarter: u8,
    pub scope: FilterScope,
    pub generated_at: DateTime<Utc>,
    pub map: MapResponse,
    pub table: ResultTable,
    pub bar: Value,
    pub pie: Value,
}

impl From<CaseStudyReport> for CaseStudyResponse {
    fn from(r: CaseStudyReport) -> Self {
        Self {
            question: r.question.number(),
            title: r.title,
            year: r.selection.year,
            quarter: r.selection.quarter,
            scope: r.scope,
            generated_at: r.generated_at,
            map: MapResponse::from(&r.map),
            bar: r.bar.to_plotly(),
            pie: r.pie.to_plotly(),
            table: r.table,
        }
    }
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub view: OverviewView,
    pub generated_at: DateTime<Utc>,
    pub map: MapResponse,
    pub top_title: &'static str,
    pub top: ResultTable,
}

impl From<OverviewReport> for OverviewResponse {
    fn from(r: OverviewReport) -> Self {
        Self {
            view: r.view,
            generated_at: r.generated_at,
            map: MapResponse::from(&r.map),
            top_title: r.top_title,
            top: r.top,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: ServiceError) -> ApiError {
    match e {
        ServiceError::Selection(e) => (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e.to_string() })),
        ServiceError::Backend(e) => {
            error!("request failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() }))
        }
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize)]
pub struct CaseStudyQuery {
    pub question: u8,
    pub year: i32,
    pub quarter: u8,
}

#[derive(Deserialize)]
pub struct OverviewQuery {
    pub view: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// GET /api/v1/options
pub async fn get_options(State(service): State<AppState>) -> Json<OptionsResponse> {
    let options = service.options();
    Json(OptionsResponse {
        pages: vec!["Home", "Business Case Study"],
        questions: options
            .questions
            .into_iter()
            .map(|(id, title)| QuestionOption { id, title })
            .collect(),
        years: options.years,
        quarters: options.quarters,
    })
}

/// GET /api/v1/overview?view=state|district
pub async fn get_overview(
    State(service): State<AppState>,
    Query(params): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>, ApiError> {
    match service.overview(params.view.as_deref()).await {
        Ok(report) => Ok(Json(OverviewResponse::from(report))),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/case-study?question=N&year=Y&quarter=Q
pub async fn get_case_study(
    State(service): State<AppState>,
    Query(params): Query<CaseStudyQuery>,
) -> Result<Json<CaseStudyResponse>, ApiError> {
    match service.case_study(params.question, params.year, params.quarter).await {
        Ok(report) => Ok(Json(CaseStudyResponse::from(report))),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/boundaries
pub async fn get_boundaries(State(service): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let boundaries = service.boundaries().await.map_err(api_error)?;
    let body = serde_json::to_vec(boundaries.collection())
        .map_err(|e| api_error(ServiceError::Backend(e.into())))?;
    Ok(([(header::CONTENT_TYPE, "application/geo+json")], body))
}
