use crate::{
    config::Config,
    errors::{AppError, ToolError},
    mcp::{
        registry::{CallRequest, ToolRegistry},
        types::Capabilities,
    },
    security,
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub registry: Arc<ToolRegistry>,
}

pub async fn serve(cfg: Config, registry: ToolRegistry) -> anyhow::Result<()> {
    let shared = AppState { cfg: Arc::new(cfg), registry: Arc::new(registry) };
    let app = build_router(shared.clone());

    let addr: std::net::SocketAddr =
        format!("{}:{}", shared.cfg.server.bind_addr, shared.cfg.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(shared: AppState) -> Router {
    let base = shared.cfg.server.base_path.clone();
    Router::new()
        .route("/healthz", get(health))
        .route(&format!("{base}/capabilities"), get(capabilities))
        .route(&format!("{base}/call"), post(call))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({"status":"ok"}))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn capabilities(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state, &headers) {
        return e.into_response();
    }
    let caps = Capabilities { mcp_version: "1.0", tools: state.registry.infos() };
    (StatusCode::OK, Json(caps)).into_response()
}

/// Executes one tool call. The body is read and parsed only after the caller
/// is authorized.
async fn call(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    if let Err(e) = authorize(&state, &headers)
        .and_then(|()| security::content_length_ok(&headers, state.cfg.limits.max_request_kb))
    {
        audit(&request_id, "-", "deny", e.code(), started);
        return e.into_response();
    }
    let body = match axum::body::to_bytes(body, state.cfg.limits.max_request_kb * 1024).await {
        Ok(b) => b,
        Err(err) => {
            tracing::debug!(request_id = %request_id, error = %err, "request body rejected");
            let e = AppError::RequestTooLarge;
            audit(&request_id, "-", "deny", e.code(), started);
            return e.into_response();
        }
    };

    let req: CallRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(err) => {
            let e = AppError::from(ToolError::validation(format!("malformed call: {err}")));
            audit(&request_id, "-", "error", e.code(), started);
            return (e.status(), Json(json!({"id": null, "error": e.body()}))).into_response();
        }
    };

    let outcome = match state.registry.get(&req.tool) {
        Some(tool) => tool.call(req.params).await.map_err(AppError::from),
        None => Err(AppError::UnknownTool(req.tool.clone())),
    };
    match outcome {
        Ok(result) => {
            audit(&request_id, &req.tool, "ok", "OK", started);
            (StatusCode::OK, Json(json!({"id": req.id, "result": result}))).into_response()
        }
        Err(e) => {
            audit(&request_id, &req.tool, "error", e.code(), started);
            (e.status(), Json(json!({"id": req.id, "error": e.body()}))).into_response()
        }
    }
}

/// One line per call. Params, file content and command output never go here.
fn audit(request_id: &str, tool: &str, status: &str, code: &str, started: Instant) {
    tracing::info!(
        request_id = request_id,
        tool = tool,
        status = status,
        code = code,
        duration_ms = started.elapsed().as_millis() as u64,
        "audit"
    );
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    security::require_bearer(headers, &state.cfg.auth.bearer_token)?;
    security::check_origin(headers, &state.cfg.auth.allowed_origins)?;
    Ok(())
}
