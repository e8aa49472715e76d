use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    batch::Prober,
    config::ServerConfig,
    error::ProbeError,
    ports,
    types::{ProbeRequest, ProbeResult},
};

/// Shared, read-only handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub prober: Prober,
    pub default_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            prober: Prober::new(config.prober),
            default_timeout: config.default_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TestPortBody {
    pub host: Option<String>,
    pub port: Option<i64>,
    pub timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TestPortsBody {
    pub host: Option<String>,
    pub ports: Option<Value>,
    pub timeout: Option<i64>,
}

/// Failure of a request, rendered as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    Validation(ProbeError),
    BadRequest(String),
    Internal(String),
}

impl From<ProbeError> for ApiError {
    fn from(e: ProbeError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

/// Build the application router. Static files under `ui_dir` are served for
/// every path the API does not claim.
pub fn router(state: AppState, ui_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/test-port", post(post_test_port))
        .route("/test-ports", post(post_test_ports))
        .route("/common-ports", get(get_common_ports))
        .route("/health", get(get_health))
        .with_state(state);

    let mut app = Router::new().nest("/api", api);
    if let Some(dir) = ui_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }
    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr();
    let app = router(AppState::from_config(&config), config.ui_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("port prober listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

fn resolve_timeout(raw: Option<i64>, default: Duration) -> Result<Duration, ProbeError> {
    match raw {
        None => Ok(default),
        Some(ms) if ms > 0 => Ok(Duration::from_millis(ms as u64)),
        Some(_) => Err(ProbeError::InvalidTimeout),
    }
}

fn require_host(host: Option<String>) -> Result<String, ApiError> {
    match host {
        Some(h) if !h.trim().is_empty() => Ok(h),
        _ => Err(ApiError::BadRequest("Host is required".into())),
    }
}

async fn post_test_port(
    State(app): State<AppState>,
    body: Result<Json<TestPortBody>, JsonRejection>,
) -> Result<Json<ProbeResult>, ApiError> {
    let Json(body) = body?;
    let host = require_host(body.host)?;
    let port = body
        .port
        .ok_or_else(|| ApiError::BadRequest("Host and port are required".into()))?;
    let timeout = resolve_timeout(body.timeout, app.default_timeout)?;
    let req = ProbeRequest::from_raw_port(host, port, timeout)?;

    // Run on its own task so a fault inside the probe becomes a 500, not a dropped connection.
    let prober = app.prober.clone();
    let result = tokio::spawn(async move { prober.probe(&req).await })
        .await
        .map_err(|e| {
            error!(error = %e, "probe task failed");
            ApiError::Internal(e.to_string())
        })?;
    Ok(Json(result))
}

async fn post_test_ports(
    State(app): State<AppState>,
    body: Result<Json<TestPortsBody>, JsonRejection>,
) -> Result<Json<Vec<ProbeResult>>, ApiError> {
    let Json(body) = body?;
    let host = require_host(body.host)?;
    let raw_ports = match body.ports {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(ApiError::BadRequest(
                "Host and array of ports are required".into(),
            ))
        }
    };
    let max = app.prober.config().max_batch;
    if raw_ports.len() > max {
        return Err(ProbeError::BatchTooLarge {
            requested: raw_ports.len(),
            max,
        }
        .into());
    }

    let ports = raw_ports
        .iter()
        .map(|v| {
            let n = v
                .as_i64()
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid port value: {v}")))?;
            match u16::try_from(n) {
                Ok(p) if p != 0 => Ok(p),
                _ => Err(ApiError::from(ProbeError::InvalidPort(n))),
            }
        })
        .collect::<Result<Vec<u16>, ApiError>>()?;
    let timeout = resolve_timeout(body.timeout, app.default_timeout)?;

    let results = app.prober.probe_batch(&host, &ports, timeout).await?;
    Ok(Json(results))
}

async fn get_common_ports() -> impl IntoResponse {
    Json(ports::common_ports())
}

async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
