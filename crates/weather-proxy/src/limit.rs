use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use stratus_limit::Decision;

use crate::error::error_body;
use crate::weather::AppState;

const GLOBAL_LIMIT_MESSAGE: &str = "Too many requests, please slow down.";
const WEATHER_LIMIT_MESSAGE: &str = "Too many requests to /api/weather. Try again later.";

/// Catch-all limiter, layered over every route including the static layer.
/// Runs before the weather-specific limiter on `/api/weather`.
pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let decision = state.global_limiter.check(addr.ip());
    if !decision.allowed {
        tracing::warn!(client = %addr.ip(), path = %req.uri().path(), "global rate limit exceeded");
        return limited_response(&decision, GLOBAL_LIMIT_MESSAGE);
    }

    let mut response = next.run(req).await;
    // An inner limiter's headers describe the tighter policy; keep them.
    if !response.headers().contains_key("ratelimit-limit") {
        set_rate_limit_headers(&mut response, &decision);
    }
    response
}

/// Weather-endpoint limiter, applied as a route layer on `/api/weather`
/// only. Rejections here never touch the cache or the upstream client.
pub async fn weather_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let decision = state.weather_limiter.check(addr.ip());
    if !decision.allowed {
        tracing::warn!(client = %addr.ip(), "weather rate limit exceeded");
        return limited_response(&decision, WEATHER_LIMIT_MESSAGE);
    }

    let mut response = next.run(req).await;
    set_rate_limit_headers(&mut response, &decision);
    response
}

fn limited_response(decision: &Decision, message: &str) -> Response {
    let mut response = error_body(StatusCode::TOO_MANY_REQUESTS, message);
    set_rate_limit_headers(&mut response, decision);
    response
}

/// Draft-standard rate-limit headers. Legacy `X-RateLimit-*` names are
/// deliberately not emitted.
fn set_rate_limit_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert("ratelimit-limit", int_header(decision.limit.into()));
    headers.insert("ratelimit-remaining", int_header(decision.remaining.into()));
    headers.insert(
        "ratelimit-reset",
        int_header(decision.reset_after.as_secs_f64().ceil() as u64),
    );
}

fn int_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}
