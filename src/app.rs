#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use handlebars::Handlebars;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::analysis::{Analysis, AnalysisKind, AnalysisRequest, ChartSpec, DEFAULT_TOP_N, run_analysis};
use crate::downloader;
use crate::error::{DashboardError, Result};
use crate::graph::{self, GraphOptions};
use crate::store::SalaryStore;
use crate::table::TablePage;

const DASHBOARD_TEMPLATE: &str = include_str!("./static/dashboard.hbs");

/// Shared, read-only state behind every route.
pub struct AppState {
    store: Arc<dyn SalaryStore>,
    templates: Handlebars<'static>,
    page_size: usize,
    graph: GraphOptions,
}

impl AppState {
    pub fn new(store: Arc<dyn SalaryStore>, page_size: usize) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string("dashboard", DASHBOARD_TEMPLATE)
            .map_err(|e| DashboardError::Render {
                details: e.to_string(),
            })?;

        Ok(AppState {
            store,
            templates,
            page_size: page_size.max(1),
            graph: GraphOptions::default(),
        })
    }
}

#[derive(Serialize)]
struct KindOption {
    slug: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct OptionsResponse {
    years: Vec<i32>,
    departments: Vec<String>,
    kinds: Vec<KindOption>,
}

#[derive(Serialize)]
struct DashboardContext {
    options: OptionsResponse,
    default_top_n: usize,
}

#[derive(Serialize)]
struct AnalysisResponse {
    status: String,
    kind: AnalysisKind,
    chart: ChartSpec,
    table: TablePage,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            DashboardError::QueryFailure { .. } | DashboardError::ConnectionFailure { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("Request failed ({}): {}", status.as_u16(), self);

        (
            status,
            Json(ErrorResponse {
                status: "error".to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the router. Split from [`run`] so tests can drive it directly.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/options", get(get_options))
        .route("/api/analysis", get(get_analysis))
        .route("/api/chart.png", get(get_chart_png))
        .route("/api/export.csv", get(export_csv))
        .route("/api/export.xlsx", get(export_xlsx))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

pub async fn run(state: AppState, bind: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_options(store: &dyn SalaryStore) -> Result<OptionsResponse> {
    Ok(OptionsResponse {
        years: store.years().await?,
        departments: store.departments().await?,
        kinds: AnalysisKind::ALL
            .iter()
            .map(|kind| KindOption {
                slug: kind.slug(),
                label: kind.label(),
            })
            .collect(),
    })
}

async fn serve_dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let options = load_options(state.store.as_ref()).await?;
    let context = DashboardContext {
        options,
        default_top_n: DEFAULT_TOP_N,
    };

    let page = state
        .templates
        .render("dashboard", &context)
        .map_err(|e| DashboardError::Render {
            details: e.to_string(),
        })?;
    Ok(Html(page))
}

async fn get_options(State(state): State<Arc<AppState>>) -> Result<Json<OptionsResponse>> {
    Ok(Json(load_options(state.store.as_ref()).await?))
}

// Malformed query strings (e.g. `top_n=-1`) get the same JSON error body as
// rejected values.
fn parse_request(
    query: std::result::Result<Query<AnalysisRequest>, QueryRejection>,
) -> Result<AnalysisRequest> {
    query
        .map(|Query(request)| request)
        .map_err(|rejection| DashboardError::invalid(rejection.body_text()))
}

async fn analyse(state: &AppState, request: &AnalysisRequest) -> Result<Analysis> {
    run_analysis(state.store.as_ref(), request).await
}

async fn get_analysis(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<AnalysisRequest>, QueryRejection>,
) -> Result<Json<AnalysisResponse>> {
    let request = parse_request(query)?;
    let analysis = analyse(&state, &request).await?;
    let table = analysis.table.page(request.page, state.page_size);

    Ok(Json(AnalysisResponse {
        status: "ok".to_string(),
        kind: analysis.kind,
        chart: analysis.chart,
        table,
    }))
}

async fn get_chart_png(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<AnalysisRequest>, QueryRejection>,
) -> Result<Response> {
    let request = parse_request(query)?;
    let analysis = analyse(&state, &request).await?;
    let options = state.graph.clone();

    // plotters draws synchronously; keep it off the async workers
    let png = tokio::task::spawn_blocking(move || graph::render_png(&analysis.chart, &options))
        .await
        .map_err(|e| DashboardError::Render {
            details: e.to_string(),
        })??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<AnalysisRequest>, QueryRejection>,
) -> Result<Response> {
    let request = parse_request(query)?;
    let analysis = analyse(&state, &request).await?;
    let body = downloader::to_csv(&analysis.table);
    Ok(attachment(
        "text/csv; charset=utf-8",
        downloader::export_filename(request.kind.slug(), "csv"),
        body.into_bytes(),
    ))
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<AnalysisRequest>, QueryRejection>,
) -> Result<Response> {
    let request = parse_request(query)?;
    let analysis = analyse(&state, &request).await?;
    let body = downloader::to_xlsx(&analysis.table)?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        downloader::export_filename(request.kind.slug(), "xlsx"),
        body,
    ))
}

fn attachment(content_type: &str, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
