//! HTTP surface: sessions, dispatch, widgets and service status.

use crate::config::Config;
use crate::effects::{AnimationGate, ParticleField};
use crate::history::HistoryDirection;
use crate::logger::Logger;
use crate::sessions::SessionStore;
use crate::terminal::{Terminal, banner_lines};
use crate::widgets::WidgetKind;
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::System;
use uuid::Uuid;

const MAX_INPUT_LENGTH: usize = 256;
const REFERENCE_CANVAS: (f32, f32) = (1920.0, 1080.0);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub logger: Logger,
    pub sessions: SessionStore,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, logger: Logger, sessions: SessionStore) -> Self {
        Self {
            config,
            logger,
            sessions,
            started_at: Instant::now(),
        }
    }
}

/// Routes plus request logging, CORS and the body limit. Rate limiting is
/// layered on by the binary, which knows the peer address.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config);
    Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/info", get(handle_info))
        .route("/sessions", post(handle_create_session))
        .route("/sessions/{id}/execute", post(handle_execute))
        .route("/sessions/{id}/complete", post(handle_complete))
        .route("/sessions/{id}/history", post(handle_history))
        .route("/sessions/{id}/keys", post(handle_keys))
        .route("/sessions/{id}/interrupt", post(handle_interrupt))
        .route("/sessions/{id}/scrollback", get(handle_scrollback))
        .route("/widgets", get(handle_widgets))
        .route("/effects", get(handle_effects))
        .route("/internal/status", get(handle_status))
        .fallback(handle_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_context_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(state.config.max_payload_bytes))
        .with_state(state)
}

async fn request_context_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let origin = request
        .headers()
        .get("origin")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let client_ip = resolve_client_ip(
        &request,
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
    );
    let method = request.method().to_string();
    let raw_url = request.uri().to_string();

    let started_at = Instant::now();
    state.logger.debug(
        "request.received",
        json!({
            "requestId": request_id,
            "method": method,
            "rawUrl": raw_url,
            "origin": origin,
            "clientIp": client_ip,
        }),
    );

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );

    let duration_ms = started_at.elapsed().as_secs_f64() * 1000.0;
    state.logger.info(
        "request.completed",
        json!({
            "requestId": request_id,
            "method": method,
            "rawUrl": raw_url,
            "statusCode": response.status().as_u16(),
            "durationMs": duration_ms,
            "origin": origin,
            "clientIp": client_ip,
        }),
    );

    response
}

fn resolve_client_ip(
    request: &Request<Body>,
    connect: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| connect.map(|info| info.0.ip().to_string()))
}

fn build_cors(config: &Config) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, Any, CorsLayer};
    if config.allow_all_origins {
        return CorsLayer::new().allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn session_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Session not found")
}

async fn find_session(state: &AppState, raw_id: &str) -> Result<Terminal, Response> {
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return Err(session_not_found());
    };
    state.sessions.get(&id).await.ok_or_else(session_not_found)
}

/// Decodes a JSON object body, answering 400 for empty or malformed input.
fn parse_object(bytes: &Bytes) -> Result<Map<String, Value>, Response> {
    if bytes.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Malformed JSON body"));
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(error_response(StatusCode::BAD_REQUEST, "Malformed JSON body")),
        Err(_) => Err(error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload")),
    }
}

fn string_field(body: &Map<String, Value>, field: &str) -> Result<String, Response> {
    match body.get(field).and_then(Value::as_str) {
        Some(value) if value.len() <= MAX_INPUT_LENGTH => Ok(value.to_string()),
        Some(_) => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Field \"{field}\" exceeds limit of {MAX_INPUT_LENGTH}"),
        )),
        None => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Field \"{field}\" must be a string"),
        )),
    }
}

async fn handle_healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn handle_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let services = state.sessions.services();
    let profile = &services.profile;
    let payload = json!({
        "prompt": format!("{}@{}:~$", state.config.prompt_user, state.config.prompt_host),
        "commands": services.registry.visible_names(),
        "banner": banner_lines(profile, false),
        "profile": {
            "name": profile.name,
            "bio": profile.bio,
            "avatar": profile.avatar,
            "location": profile.location,
            "socials": profile.socials,
            "music": profile.music,
            "audio": profile.audio,
            "pc": profile.pc,
            "gear": profile.gear,
        },
    });
    (StatusCode::OK, Json(payload))
}

async fn handle_create_session(
    State(state): State<Arc<AppState>>,
    bytes: Bytes,
) -> Response {
    let client_id = if bytes.is_empty() {
        None
    } else {
        let body = match parse_object(&bytes) {
            Ok(body) => body,
            Err(response) => return response,
        };
        match body.get("clientId") {
            None | Some(Value::Null) => None,
            Some(_) => match string_field(&body, "clientId") {
                Ok(client_id) => Some(client_id),
                Err(response) => return response,
            },
        }
    };
    let (id, terminal) = state.sessions.create(client_id.as_deref()).await;
    let payload = json!({
        "sessionId": id.to_string(),
        "clientId": terminal.client_id(),
        "prompt": terminal.prompt(),
        "cwd": terminal.cwd(),
        "banner": terminal.banner(),
        "preferences": terminal.preferences(),
        "lastSeq": terminal.scrollback().last_seq(),
    });
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn handle_execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Response {
    let terminal = match find_session(&state, &id).await {
        Ok(terminal) => terminal,
        Err(response) => return response,
    };
    let input = match parse_object(&bytes).and_then(|body| string_field(&body, "input")) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let report = terminal.submit(&input).await;
    (StatusCode::OK, Json(report)).into_response()
}

async fn handle_complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Response {
    let terminal = match find_session(&state, &id).await {
        Ok(terminal) => terminal,
        Err(response) => return response,
    };
    let input = match parse_object(&bytes).and_then(|body| string_field(&body, "input")) {
        Ok(input) => input,
        Err(response) => return response,
    };
    (StatusCode::OK, Json(terminal.complete(&input))).into_response()
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Response {
    let terminal = match find_session(&state, &id).await {
        Ok(terminal) => terminal,
        Err(response) => return response,
    };
    let body = match parse_object(&bytes) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let direction = body
        .get("direction")
        .cloned()
        .and_then(|value| serde_json::from_value::<HistoryDirection>(value).ok());
    let Some(direction) = direction else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Field \"direction\" must be \"previous\" or \"next\"",
        );
    };
    (StatusCode::OK, Json(json!({ "input": terminal.recall(direction) }))).into_response()
}

async fn handle_keys(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Response {
    let terminal = match find_session(&state, &id).await {
        Ok(terminal) => terminal,
        Err(response) => return response,
    };
    let key = match parse_object(&bytes).and_then(|body| string_field(&body, "key")) {
        Ok(key) => key,
        Err(response) => return response,
    };
    let effect = terminal.press_key(&key);
    let payload = json!({ "activated": effect.is_some(), "effect": effect });
    (StatusCode::OK, Json(payload)).into_response()
}

async fn handle_interrupt(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match find_session(&state, &id).await {
        Ok(terminal) => {
            terminal.interrupt();
            (StatusCode::OK, Json(json!({ "status": "interrupted" }))).into_response()
        }
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
struct ScrollbackQuery {
    since: Option<u64>,
}

async fn handle_scrollback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ScrollbackQuery>,
) -> Response {
    let terminal = match find_session(&state, &id).await {
        Ok(terminal) => terminal,
        Err(response) => return response,
    };
    let entries = terminal.scrollback_since(query.since.unwrap_or(0));
    let payload = json!({
        "entries": entries,
        "lastSeq": terminal.scrollback().last_seq(),
        "prompt": terminal.prompt(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

async fn handle_widgets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let payload = match &state.sessions.services().widgets {
        Some(board) => json!({ "enabled": true, "widgets": board.snapshot().await }),
        None => json!({ "enabled": false }),
    };
    (StatusCode::OK, Json(payload))
}

#[derive(Debug, Deserialize)]
struct EffectsQuery {
    visible: Option<bool>,
}

/// Effect gates for the calling page; `?visible=false` reports a hidden tab.
async fn handle_effects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EffectsQuery>,
) -> impl IntoResponse {
    let device = state.sessions.services().device;
    let mut gate = AnimationGate::new(&device);
    gate.set_visible(query.visible.unwrap_or(true));
    let intervals: Map<String, Value> = WidgetKind::ALL
        .into_iter()
        .map(|kind| {
            (
                kind.as_str().to_string(),
                json!(kind.poll_interval(device.low_end).as_secs()),
            )
        })
        .collect();
    let (width, height) = REFERENCE_CANVAS;
    let payload = json!({
        "device": device,
        "visible": gate.is_visible(),
        "animationsEnabled": gate.should_run(),
        "particleCount": ParticleField::particle_count(width, height, device.low_end),
        "pollIntervalsSeconds": intervals,
    });
    (StatusCode::OK, Json(payload))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut system = System::new();
    system.refresh_memory();
    let payload = json!({
        "status": "ok",
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "memoryTotalBytes": system.total_memory(),
        "memoryUsedBytes": system.used_memory(),
        "sessions": state.sessions.len().await,
        "widgetsEnabled": state.config.widgets_enabled,
    });
    (StatusCode::OK, Json(payload))
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })))
}
