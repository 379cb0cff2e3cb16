// State Finances - Web Server
// REST API over the cleaned datasets with Axum

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use state_finances::{
    dataset_csv, init_logging, AppConfig, Dataset, DatasetCache, DatasetSpec, ExpenditureType,
    FactFilter, FiscalYear, GroupBy, PipelineError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    cache: Arc<DatasetCache>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// Failure on its way to the client
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = status_for(&e);
        if status.is_server_error() {
            error!("pipeline failure: {}", e);
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("config failure: {:#}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::err(self.message))).into_response()
    }
}

fn status_for(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::EmptyResult { .. } | PipelineError::UnknownDataset(_) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

type ApiResult<T> = Result<T, ApiError>;

impl AppState {
    fn spec(&self, name: &str) -> ApiResult<DatasetSpec> {
        self.config
            .dataset(name)?
            .ok_or_else(|| PipelineError::UnknownDataset(name.to_string()).into())
    }

    fn dataset(&self, name: &str) -> ApiResult<(DatasetSpec, Arc<Dataset>)> {
        let spec = self.spec(name)?;
        let dataset = self.cache.get_or_load(&spec)?;
        Ok((spec, dataset))
    }
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct FactsQuery {
    /// Comma-separated state names
    state: Option<String>,
    /// `2012` or `2012-13`
    year: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    component: Option<String>,
}

impl FactsQuery {
    fn into_filter(self) -> ApiResult<FactFilter> {
        let states = self
            .state
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let year = match self.year.as_deref() {
            Some(y) => Some(
                parse_year(y).ok_or_else(|| ApiError::bad_request(format!("Invalid year '{}'", y)))?,
            ),
            None => None,
        };

        let kind = match self.kind.as_deref() {
            Some(k) => Some(
                ExpenditureType::from_code(k)
                    .ok_or_else(|| ApiError::bad_request(format!("Invalid type '{}'", k)))?,
            ),
            None => None,
        };

        Ok(FactFilter {
            states,
            year,
            kind,
            component: self.component,
        })
    }
}

fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    text.parse::<i32>()
        .ok()
        .or_else(|| FiscalYear::from_label(text).map(|fy| fy.start()))
}

#[derive(Debug, Default, Deserialize)]
struct SharesQuery {
    group: Option<String>,
}

#[derive(Serialize)]
struct ReloadResponse {
    dataset: String,
    records: usize,
    report: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/datasets - Configured datasets
async fn list_datasets(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let specs = state.config.dataset_specs()?;
    Ok(Json(ApiResponse::ok(specs)))
}

/// GET /api/datasets/:name/facts - Filtered long-form records
async fn get_facts(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<FactsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.into_filter()?;
    let (_, dataset) = state.dataset(&name)?;
    Ok(Json(ApiResponse::ok(dataset.filter(&filter))))
}

/// GET /api/datasets/:name/shares - Records with percentage shares
async fn get_shares(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<SharesQuery>,
) -> ApiResult<impl IntoResponse> {
    let group_by = match query.group.as_deref() {
        Some(g) => g.parse::<GroupBy>().map_err(ApiError::bad_request)?,
        None => GroupBy::StateYear,
    };
    let (_, dataset) = state.dataset(&name)?;
    Ok(Json(ApiResponse::ok(dataset.with_shares(group_by))))
}

/// GET /api/datasets/:name/summary - Headline metrics
async fn get_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (_, dataset) = state.dataset(&name)?;
    let summary = dataset
        .summary()
        .ok_or_else(|| PipelineError::EmptyResult { dataset: name.clone() })?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/datasets/:name/download - Cleaned CSV as an attachment
async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (spec, dataset) = state.dataset(&name)?;
    let body = dataset_csv(&dataset, None)?;

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&spec.download_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// POST /api/datasets/:name/reload - Drop the cached copy and re-clean
async fn reload(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let spec = state.spec(&name)?;
    let dataset = state.cache.reload(&spec)?;
    info!(dataset = %name, records = dataset.len(), "reloaded");

    Ok(Json(ApiResponse::ok(ReloadResponse {
        dataset: name,
        records: dataset.len(),
        report: dataset.report().summary(),
    })))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/datasets", get(list_datasets))
        .route("/datasets/:name/facts", get(get_facts))
        .route("/datasets/:name/shares", get(get_shares))
        .route("/datasets/:name/summary", get(get_summary))
        .route("/datasets/:name/download", get(download))
        .route("/datasets/:name/reload", post(reload))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[derive(Parser)]
#[command(name = "state-finances-server")]
#[command(version, about = "Serve cleaned state finance datasets over HTTP")]
struct Args {
    /// YAML config file (defaults to $STATE_FINANCES_CONFIG, then built-in)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config.log_filter);

    println!("🌐 State Finances - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cache = Arc::new(DatasetCache::new());

    // Warm the cache; a missing file is reported but does not stop the server
    for spec in config.dataset_specs()? {
        match cache.get_or_load(&spec) {
            Ok(dataset) => info!(dataset = %spec.name, records = dataset.len(), "loaded"),
            Err(e) => warn!(dataset = %spec.name, "not loaded: {}", e),
        }
    }

    let bind = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config),
        cache,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;

    println!("\n🚀 Server running on http://{}", bind);
    println!("   API: http://{}/api/datasets", bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
