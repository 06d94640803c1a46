use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::state::AppState;

mod agents;
mod comments;
mod health;
mod listings;
mod metrics;
mod pages;
mod traffic;

pub use agents::{me_handler, register_handler};
pub use comments::{list_comments, post_comment};
pub use health::health_handler;
pub use listings::{get_listing, list_listings, search_listings, submit_listing, vote_listing};
pub use metrics::metrics_handler;
pub use pages::{home_page, listing_page, skill_doc, submit_page};
pub use traffic::traffic_handler;

// Every request passes through here before routing: prometheus counters
// plus the traffic tracker. Visitors are keyed by X-Forwarded-For when a
// proxy set it, otherwise by peer address.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();
    let start = Instant::now();

    let visitor = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| addr.ip().to_string());
    state.tracker.record(req.uri().path(), &visitor, Utc::now());

    let res = next.run(req).await;
    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    res
}

// Fallback sits inside the tracking layer so unmatched paths count too
pub async fn not_found() -> crate::error::ApiError {
    crate::error::ApiError::NotFound("not found".into())
}

// API routes are open to cross-origin callers; preflights short-circuit
pub async fn cors(req: Request, next: Next) -> Response {
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = res.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    res
}
