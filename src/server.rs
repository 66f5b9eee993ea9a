//! HTTP poll endpoint.
//!
//! `POST /logs/poll` takes form fields `log_file`, `filter_level` and
//! `last_position`, and answers with the entries appended since
//! `last_position`. The caller keeps the offset; the server holds no per-file
//! state, so any number of dashboards can poll the same file independently.
//! `GET /logs` lists the names callers may ask for.

use crate::allowlist::AllowList;
use crate::config::Config;
use crate::entry::LogEntry;
use crate::error::Result;
use crate::level::{FilterSpec, Level};
use crate::tail::{LogSource, LogTailEngine, PollOutcome};
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub allow_list: Arc<AllowList>,
    pub engine: LogTailEngine,
    pub default_level: Level,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allow_list: Arc::new(AllowList::new(config.logs.iter().cloned())),
            engine: config.engine(),
            default_level: config.tail.default_level,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Form body of `POST /logs/poll`. Everything arrives as text so malformed
/// values get this module's JSON error instead of a bare extractor rejection.
/// A body that is not a form at all is answered with the same envelope.
#[derive(Debug, Default, Deserialize)]
pub struct PollRequest {
    pub log_file: Option<String>,
    pub filter_level: Option<String>,
    pub last_position: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub success: bool,
    pub data: Vec<LogEntry>,
    pub last_position: u64,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogList<'a> {
    pub logs: Vec<&'a str>,
}

/// A failed poll. Messages are deliberately generic.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    last_position: u64,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str, last_position: u64) -> Self {
        Self {
            status,
            message,
            last_position,
        }
    }

    fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, 0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = PollResponse {
            success: false,
            data: Vec::new(),
            last_position: self.last_position,
            error: Some(self.message.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/logs", get(list_logs))
        .route("/logs/poll", post(poll_log))
        .with_state(state)
}

pub async fn list_logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(LogList {
        logs: state.allow_list.names().collect(),
    })
    .into_response()
}

pub async fn poll_log(
    State(state): State<AppState>,
    form: std::result::Result<Form<PollRequest>, FormRejection>,
) -> std::result::Result<Json<PollResponse>, ApiError> {
    let Form(request) = form.map_err(|rejection| {
        debug!(error = %rejection, "rejected poll body");
        ApiError::bad_request("invalid request")
    })?;

    let requested = request.log_file.as_deref().unwrap_or_default().trim();
    let Some(path) = state.allow_list.resolve(requested) else {
        warn!("rejected poll for a log file outside the allow-list");
        debug!(requested, "rejected log_file");
        return Err(ApiError::new(StatusCode::FORBIDDEN, "forbidden", 0));
    };

    let filter = parse_filter_level(request.filter_level.as_deref(), state.default_level)?;
    let last_position = parse_last_position(request.last_position.as_deref())?;

    let source = LogSource::with_offset(path, last_position);
    let engine = state.engine.clone();
    let task = tokio::task::spawn_blocking(move || engine.poll(&source, filter));

    let outcome = await_poll(task, state.request_timeout, last_position).await?;
    Ok(Json(PollResponse {
        success: true,
        data: outcome.entries,
        last_position: outcome.new_offset,
        error: None,
    }))
}

/// Waits for a poll task and maps its failures to responses. Every failure
/// echoes `last_position` so the caller keeps its cursor.
async fn await_poll<F>(
    task: F,
    timeout: Duration,
    last_position: u64,
) -> std::result::Result<PollOutcome, ApiError>
where
    F: Future<Output = std::result::Result<Result<PollOutcome>, JoinError>>,
{
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(outcome))) => Ok(outcome),
        Ok(Ok(Err(e))) if e.is_not_accessible() => {
            warn!(error = %e, "poll failed");
            Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "log file is not accessible",
                last_position,
            ))
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "poll failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
                last_position,
            ))
        }
        Ok(Err(join_err)) => {
            error!(error = %join_err, "poll task failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
                last_position,
            ))
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "poll timed out");
            Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "poll timed out",
                last_position,
            ))
        }
    }
}

fn parse_filter_level(
    raw: Option<&str>,
    default: Level,
) -> std::result::Result<FilterSpec, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(FilterSpec::new(default)),
        Some(name) => name
            .parse::<Level>()
            .map(FilterSpec::new)
            .map_err(|_| ApiError::bad_request("invalid filter_level")),
    }
}

fn parse_last_position(raw: Option<&str>) -> std::result::Result<u64, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request("invalid last_position")),
    }
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    if state.allow_list.is_empty() {
        warn!("no [[logs]] configured, every poll will be rejected");
    }

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
