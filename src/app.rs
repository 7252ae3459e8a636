#![cfg(not(tarpaulin_include))]

//! HTTP routing and handlers.
//!
//! Every handler resolves the visitor's session from the `session` cookie
//! (creating one when it is missing or expired), clones the session's table
//! handle and computes its answer without holding any lock.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::downloader::{self, ExportFormat};
use crate::error::{ChartError, ExportError, IntakeError, TableError};
use crate::graph::ChartRequest;
use crate::loader;
use crate::session::{SESSION_COOKIE, SessionState, SessionStore};
use crate::summary::SummaryReport;
use crate::table::{Preview, Table};

const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub struct AppState {
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            sessions: SessionStore::new(config.session_ttl()),
            config,
        }
    }

    /// Returns the visitor's live session id, starting a new session when the
    /// cookie is missing or stale.
    fn session(&self, jar: CookieJar) -> (CookieJar, String) {
        if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
            if self.sessions.is_valid(&id) {
                return (jar, id);
            }
        }
        let id = self.sessions.create();
        log::info!("started session {}", id);
        let mut cookie = Cookie::new(SESSION_COOKIE, id.clone());
        cookie.set_path("/");
        cookie.set_http_only(true);
        (jar.add(cookie), id)
    }

    fn loaded(&self, session_id: &str) -> Result<(String, Arc<Table>), AppError> {
        match self.sessions.state(session_id) {
            Some(SessionState::FileLoaded { filename, table }) => Ok((filename, table)),
            _ => Err(AppError::NoFileLoaded),
        }
    }
}

/// Errors surfaced to the browser as `{status, message}` JSON.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("no file loaded, upload a CSV or Excel file first")]
    NoFileLoaded,

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Intake(IntakeError::UnsupportedFormat { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Intake(IntakeError::Read { .. }) => StatusCode::BAD_REQUEST,
            AppError::Table(_) | AppError::Chart(ChartError::Table(_)) => StatusCode::NOT_FOUND,
            AppError::Chart(ChartError::NotNumeric { .. })
            | AppError::Chart(ChartError::InsufficientColumns { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Chart(ChartError::Render(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Export(ExportError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NoFileLoaded => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn is_warning(&self) -> bool {
        matches!(self, AppError::Chart(e) if e.is_warning())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.is_warning() { "warning" } else { "error" };
        if self.is_warning() {
            log::warn!("{}", self);
        } else if self.status_code().is_server_error() {
            log::error!("{}", self);
        } else {
            log::info!("request rejected: {}", self);
        }
        (
            self.status_code(),
            Json(StatusResponse {
                status: status.to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct SummaryResponse {
    status: String,
    filename: String,
    summary: SummaryReport,
    preview: Preview,
}

#[derive(Serialize)]
struct ProjectionResponse {
    status: String,
    rows: usize,
    columns: Vec<String>,
    preview: Preview,
}

#[derive(Serialize)]
struct DashboardResponse {
    status: String,
    dashboard: Dashboard,
}

#[derive(Deserialize)]
struct ColumnSelection {
    #[serde(default)]
    columns: Vec<String>,
}

#[derive(Deserialize)]
struct ChartBody {
    /// Optional projection the chart is drawn from
    #[serde(default)]
    columns: Vec<String>,

    #[serde(flatten)]
    request: ChartRequest,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: String,
}

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.config.max_upload_bytes();
    Router::new()
        .route("/", get(serve_index))
        .route("/api/upload", post(upload))
        .route("/api/summary", get(summary))
        .route("/api/columns", post(select_columns))
        .route("/api/chart", post(chart))
        .route("/api/dashboard", get(dashboard))
        .route("/api/dashboard/chart", get(dashboard_chart))
        .route("/api/export", post(export))
        .route("/api/reset", post(reset))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(state)
}

/// Binds the configured address and serves the application until the
/// process stops. A background task purges expired sessions.
///
/// # Arguments
/// * `config` - Listener address, upload limit, chart size and session TTL
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Only returns early if binding or serving fails
///
/// # Examples
/// ```no_run
/// use analyzer::app;
/// use analyzer::config::Config;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     app::run(Config::default()).await
/// }
/// ```
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let address = config.address();
    let state = Arc::new(AppState::new(config));

    let purger = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purger.sessions.purge_expired();
            if purged > 0 {
                log::info!("purged {} expired sessions", purged);
            }
        }
    });

    let app = router(state);
    let listener = TcpListener::bind(&address).await?;
    log::info!("Listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> (CookieJar, Result<Json<SummaryResponse>, AppError>) {
    let (jar, id) = state.session(jar);
    let result = accept_upload(&state, &id, multipart).await;
    if result.is_err() {
        state.sessions.clear(&id);
        log::info!("session {} has no file loaded after failed upload", id);
    }
    (jar, result)
}

async fn accept_upload(
    state: &AppState,
    session_id: &str,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            upload = Some((filename, bytes));
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("no file received in field `file`".to_string()))?;

    let table = loader::load_table(&filename, &bytes)?;
    let table = state.sessions.load(session_id, &filename, table);
    log::info!("session {} loaded `{}`", session_id, filename);

    Ok(Json(summary_response(
        filename,
        &table,
        state.config.preview_rows,
    )))
}

fn summary_response(filename: String, table: &Table, preview_rows: usize) -> SummaryResponse {
    SummaryResponse {
        status: "ok".to_string(),
        filename,
        summary: SummaryReport::from_table(table),
        preview: table.head(preview_rows),
    }
}

async fn summary(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Result<Json<SummaryResponse>, AppError>) {
    let (jar, id) = state.session(jar);
    let result = state
        .loaded(&id)
        .map(|(filename, table)| Json(summary_response(filename, &table, state.config.preview_rows)));
    (jar, result)
}

async fn select_columns(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<ColumnSelection>, JsonRejection>,
) -> (CookieJar, Result<Json<ProjectionResponse>, AppError>) {
    let (jar, id) = state.session(jar);
    let result = body
        .map_err(AppError::from)
        .and_then(|Json(selection)| project_preview(&state, &id, &selection));
    (jar, result)
}

fn project_preview(
    state: &AppState,
    session_id: &str,
    selection: &ColumnSelection,
) -> Result<Json<ProjectionResponse>, AppError> {
    let (_, table) = state.loaded(session_id)?;
    let projected = table.project(&selection.columns)?;
    Ok(Json(ProjectionResponse {
        status: "ok".to_string(),
        rows: projected.row_count(),
        columns: projected.column_names(),
        preview: projected.head(state.config.preview_rows),
    }))
}

async fn chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<ChartBody>, JsonRejection>,
) -> (CookieJar, Result<Response, AppError>) {
    let (jar, id) = state.session(jar);
    let result = body
        .map_err(AppError::from)
        .and_then(|Json(body)| render_chart(&state, &id, &body));
    (jar, result)
}

fn render_chart(state: &AppState, session_id: &str, body: &ChartBody) -> Result<Response, AppError> {
    let (_, table) = state.loaded(session_id)?;
    let projected = table.project(&body.columns)?;
    let svg = body
        .request
        .render(&projected, &state.config.chart_options())?;
    log::debug!("rendered {} chart for session {}", body.request.kind(), session_id);
    Ok(svg_response(svg))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Result<Json<DashboardResponse>, AppError>) {
    let (jar, id) = state.session(jar);
    let result = state.loaded(&id).map(|(_, table)| {
        Json(DashboardResponse {
            status: "ok".to_string(),
            dashboard: Dashboard::from_table(&table),
        })
    });
    (jar, result)
}

async fn dashboard_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Result<Response, AppError>) {
    let (jar, id) = state.session(jar);
    let result = render_dashboard_chart(&state, &id);
    (jar, result)
}

/// 204 when the table has no numeric column to average.
fn render_dashboard_chart(state: &AppState, session_id: &str) -> Result<Response, AppError> {
    let (_, table) = state.loaded(session_id)?;
    match Dashboard::from_table(&table).chart() {
        Some(chart) => Ok(svg_response(chart.to_svg(&state.config.chart_options())?)),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn export(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ExportQuery>,
    body: Result<Json<ColumnSelection>, JsonRejection>,
) -> (CookieJar, Result<Response, AppError>) {
    let (jar, id) = state.session(jar);
    let result = export_file(&state, &id, &query, body);
    (jar, result)
}

fn export_file(
    state: &AppState,
    session_id: &str,
    query: &ExportQuery,
    body: Result<Json<ColumnSelection>, JsonRejection>,
) -> Result<Response, AppError> {
    let format: ExportFormat = query.format.parse()?;
    let Json(selection) = body?;
    let (filename, table) = state.loaded(session_id)?;
    let projected = table.project(&selection.columns)?;
    let bytes = downloader::export(&projected, format)?;

    let stem = filename
        .rsplit_once('.')
        .map_or(filename.as_str(), |(stem, _)| stem);
    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        stem.replace('"', ""),
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn reset(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Json<StatusResponse>) {
    let (jar, id) = state.session(jar);
    state.sessions.clear(&id);
    log::info!("session {} reset", id);
    (
        jar,
        Json(StatusResponse {
            status: "ok".to_string(),
            message: None,
        }),
    )
}

fn svg_response(svg: String) -> Response {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}
