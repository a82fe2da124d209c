// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the spam shield service.
//!
//! The service can sit behind an application in two ways:
//!
//! 1. **External check**: the application posts already-parsed inputs to
//!    `/check` and renders the verdict itself.
//! 2. **Direct submit**: forms post to `/submit/*action`; the verdict is
//!    turned into a redirect or JSON error here, in [`shape_response`].

use crate::config::{Config, SettingsSource, ShieldConfig};
use crate::event::Event;
use crate::metrics::ShieldMetrics;
use crate::probe::{is_secure_transport, probe_cookie_to_issue};
use crate::signals::{
    cookie_value, extract, is_truthy, AuthState, AuthTier, RawRequest, PROBE_COOKIE,
};
use crate::store::{EventLog, EventStore};
use crate::validator::{ShieldValidator, Verdict};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Cookie carrying the message key after a redirect.
pub const FLASH_COOKIE: &str = "spamshield_flash";
/// Header set by the upstream auth layer.
pub const AUTH_TIER_HEADER: &str = "x-auth-tier";
/// Header set by the upstream auth layer for signed-in users.
pub const USER_GUID_HEADER: &str = "x-user-guid";

/// Last second of year 9999.
const MAX_UNIX_SECONDS: i64 = 253_402_300_799;

const DEFAULT_EVENTS_LIMIT: usize = 50;
const MAX_EVENTS_LIMIT: usize = 1000;

/// Shared application state.
pub struct AppState {
    pub validator: ShieldValidator<EventLog>,
    pub settings: Arc<dyn SettingsSource>,
    pub metrics: ShieldMetrics,
    pub config: Config,
}

impl AppState {
    /// Settings snapshot for one request.
    pub fn shield_config(&self) -> ShieldConfig {
        ShieldConfig::load_with_defaults(self.settings.as_ref(), &self.config.shield)
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/submit/*action", post(submit))
        .route("/probe", get(probe))
        .route("/events", get(events));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Error response for malformed check requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error response body for asynchronous submissions.
#[derive(Debug, Serialize)]
pub struct AjaxErrorResponse {
    pub dataerr: &'static str,
}

/// Pre-parsed request sent by an upstream application.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub ip: String,
    pub action: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub auth: AuthState,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub requested_with: Option<String>,
    /// Unix seconds; server clock when absent
    #[serde(default)]
    pub now: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "spamshield",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Evaluate a pre-parsed request and return the verdict.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<Verdict>, (StatusCode, Json<ErrorResponse>)> {
    debug!(ip = %req.ip, action = %req.action, "Processing check");

    let now = match req.now {
        Some(now) if !(0..=MAX_UNIX_SECONDS).contains(&now) => {
            warn!(now, "Rejecting check with out of range clock");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("now must be between 0 and {MAX_UNIX_SECONDS}"),
                }),
            ));
        }
        Some(now) => now,
        None => unix_now(),
    };

    let raw = RawRequest {
        action: req.action,
        remote_addr: req.ip,
        user_agent: req.user_agent,
        requested_with: req.requested_with,
        cookie_header: req.cookie,
        form: req.fields,
    };
    let signals = extract(&raw, &req.auth);

    let verdict = state
        .validator
        .evaluate(&state.shield_config(), &signals, now)
        .await;
    Ok(Json(verdict))
}

/// Evaluate a form submission posted directly to the service.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw = RawRequest {
        action,
        remote_addr: connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default(),
        user_agent: header_str(&headers, header::USER_AGENT.as_str()).map(str::to_string),
        requested_with: header_str(&headers, "x-requested-with").map(str::to_string),
        cookie_header: header_str(&headers, header::COOKIE.as_str()).map(str::to_string),
        form: RawRequest::parse_form(&body),
    };
    let auth = auth_from_headers(&headers);
    let signals = extract(&raw, &auth);

    let verdict = state
        .validator
        .evaluate(&state.shield_config(), &signals, unix_now())
        .await;

    shape_response(
        &verdict,
        signals.is_ajax_transport,
        header_str(&headers, header::REFERER.as_str()),
    )
}

/// Turn a verdict into the HTTP response for a direct submission.
pub fn shape_response(verdict: &Verdict, ajax: bool, referer: Option<&str>) -> Response {
    let message = match verdict.message {
        Some(message) if !verdict.allowed => message,
        _ => return (StatusCode::OK, Json(verdict.clone())).into_response(),
    };

    if ajax {
        return (StatusCode::OK, Json(AjaxErrorResponse { dataerr: message })).into_response();
    }

    let location = referer.filter(|r| !r.is_empty()).unwrap_or("/");
    let flash = format!("{FLASH_COOKIE}={message}; Path=/; HttpOnly");
    ([(header::SET_COOKIE, flash)], Redirect::to(location)).into_response()
}

/// Issue the probe cookie to clients that do not carry it yet.
pub async fn probe(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let present = is_truthy(cookie_value(
        header_str(&headers, header::COOKIE.as_str()),
        PROBE_COOKIE,
    ));
    let secure = is_secure_transport(
        header_str(&headers, "x-forwarded-proto"),
        header_str(&headers, header::HOST.as_str()).and_then(host_port),
    );

    match probe_cookie_to_issue(present, state.shield_config().cookie_same_site, secure) {
        Some(cookie) => (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Recent events for reporting tools.
pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENTS_LIMIT)
        .min(MAX_EVENTS_LIMIT);

    state
        .validator
        .store()
        .recent(limit)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(error = %e, "Failed to read events");
            StatusCode::SERVICE_UNAVAILABLE
        })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Auth tier as reported by the upstream auth layer; guest when absent.
fn auth_from_headers(headers: &HeaderMap) -> AuthState {
    AuthState {
        tier: header_str(headers, AUTH_TIER_HEADER)
            .and_then(|v| v.parse::<AuthTier>().ok())
            .unwrap_or_default(),
        user_guid: header_str(headers, USER_GUID_HEADER).and_then(|v| v.trim().parse().ok()),
    }
}

fn host_port(host: &str) -> Option<u16> {
    host.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
