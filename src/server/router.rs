use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::RedirectConfig;
use crate::encoding::encode_path;
use crate::redirect::RedirectUrlBuilder;

pub struct AppState {
    pub builder: RedirectUrlBuilder,
    pub origin: Option<String>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: RedirectConfig) -> Self {
        AppState {
            builder: RedirectUrlBuilder::new(config),
            origin: None,
            metrics: None,
        }
    }

    /// Origin server that receives requests the CDN cannot serve
    pub fn with_origin(mut self, origin: impl AsRef<str>) -> Self {
        self.origin = Some(origin.as_ref().trim_end_matches('/').to_string());
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // Query string format: /redirect?path=<library path>
        .route("/redirect", get(redirect_query))
        // Path format: /redirect/<library path>
        .route("/redirect/{*path}", get(redirect_path));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn redirect_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let path = match params.get("path") {
        Some(p) => p.clone(),
        None => return (StatusCode::BAD_REQUEST, "Missing path parameter").into_response(),
    };

    redirect_request(&state, &path, None)
}

async fn redirect_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    redirect_request(&state, &format!("/{path}"), query.as_deref())
}

fn redirect_request(state: &AppState, path: &str, query: Option<&str>) -> Response {
    metrics::counter!("cdn_redirect_requests_total").increment(1);

    let url = match state.builder.build(path) {
        Ok(url) => url,
        Err(e) => {
            metrics::counter!("cdn_redirect_fallback_total", "reason" => e.reason()).increment(1);
            info!(path, reason = e.reason(), "cdn redirect not applicable, falling back to origin");
            return fallback(state, path, query, e.to_string());
        }
    };

    if url.token.is_some() {
        metrics::counter!("cdn_redirect_signed_total").increment(1);
    }
    info!(path, target = %url.path, "redirecting to cdn");

    let mut response = location(StatusCode::FOUND, url.as_str());
    if let Some(api_key) = state.builder.config().api_key() {
        match (
            HeaderName::from_bytes(api_key.header_name().as_bytes()),
            HeaderValue::from_str(api_key.value()),
        ) {
            (Ok(name), Ok(mut value)) => {
                value.set_sensitive(true);
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = api_key.header_name(), "api key is not a valid header, skipping"),
        }
    }
    response
}

fn fallback(state: &AppState, path: &str, query: Option<&str>, reason: String) -> Response {
    let Some(origin) = &state.origin else {
        return (StatusCode::NOT_FOUND, reason).into_response();
    };

    let mut target = format!("{}{}", origin, encode_path(path));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    location(StatusCode::TEMPORARY_REDIRECT, &target)
}

fn location(status: StatusCode, target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target").into_response(),
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
