use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stratus_cache::ResponseCache;
use stratus_limit::{FixedWindowLimiter, RatePolicy};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ApiError;
use crate::upstream::WeatherClient;

/// Shared application state passed to all handlers and middleware.
pub struct AppState {
    pub cache: ResponseCache,
    pub global_limiter: FixedWindowLimiter,
    pub weather_limiter: FixedWindowLimiter,
    pub client: WeatherClient,
    /// Per-key gates coordinating concurrent cache misses, so N simultaneous
    /// first requests for one coordinate produce a single upstream call.
    inflight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AppState {
    pub fn new(
        client: WeatherClient,
        cache_ttl: Duration,
        global_policy: RatePolicy,
        weather_policy: RatePolicy,
    ) -> Self {
        Self {
            cache: ResponseCache::new(cache_ttl),
            global_limiter: FixedWindowLimiter::new(global_policy),
            weather_limiter: FixedWindowLimiter::new(weather_policy),
            client,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut inflight = self.inflight.lock();
        Arc::clone(
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Drop the caller's gate clone, then remove the map entry once the map
    /// holds the only remaining reference. Every handler that took a gate
    /// calls this, so the last one out always cleans up.
    fn release_gate(&self, key: &str, gate: Arc<AsyncMutex<()>>) {
        drop(gate);
        let mut inflight = self.inflight.lock();
        if let Some(entry) = inflight.get(key) {
            if Arc::strong_count(entry) == 1 {
                inflight.remove(key);
            }
        }
    }

    /// Number of coordinate keys with a live in-flight fetch gate.
    pub fn inflight_gates(&self) -> usize {
        self.inflight.lock().len()
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    lat: Option<String>,
    lon: Option<String>,
}

/// `GET /api/weather?lat=..&lon=..`
///
/// Validation → cache lookup → upstream fetch → cache store, in that order,
/// short-circuiting on the first failure. Rate-limit checks have already run
/// in middleware by the time this handler is reached.
pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    // A query string we cannot decode at all means we cannot extract the
    // coordinates; keep the structured body rather than axum's default.
    let Query(params) = params.map_err(|_| ApiError::MissingCoordinates)?;

    // An empty value counts as absent, same as the parameter not being there.
    let (lat, lon) = match (params.lat, params.lon) {
        (Some(lat), Some(lon)) if !lat.is_empty() && !lon.is_empty() => (lat, lon),
        _ => return Err(ApiError::MissingCoordinates),
    };

    // Exact query strings, not parsed values: "40" and "40.0" are distinct
    // keys by design.
    let key = format!("{lat},{lon}");
    let start = Instant::now();

    if let Some(payload) = state.cache.lookup(&key) {
        tracing::debug!(
            key = %key,
            latency_us = start.elapsed().as_micros() as u64,
            "cache HIT"
        );
        return Ok(cached_json(payload, "HIT"));
    }

    let gate = state.gate(&key);
    let result = {
        let _guard = gate.lock().await;

        // Re-check under the gate: another request may have fetched and
        // stored while we waited.
        if let Some(payload) = state.cache.lookup(&key) {
            tracing::debug!(key = %key, "cache HIT after in-flight fetch");
            Ok((payload, "HIT"))
        } else {
            match state.client.fetch(&lat, &lon).await {
                Ok(payload) => {
                    state.cache.store(key.clone(), payload.clone(), Instant::now());
                    tracing::debug!(
                        key = %key,
                        bytes = payload.len(),
                        latency_us = start.elapsed().as_micros() as u64,
                        "cache MISS, fetched upstream"
                    );
                    Ok((payload, "MISS"))
                }
                Err(e) => Err(e),
            }
        }
    };
    state.release_gate(&key, gate);

    match result {
        Ok((payload, cache_status)) => Ok(cached_json(payload, cache_status)),
        Err(e) => {
            // Full detail stays server-side; the client sees the generic body.
            tracing::error!(key = %key, error = %e, "upstream fetch failed");
            Err(ApiError::Upstream(e))
        }
    }
}

fn cached_json(payload: Bytes, cache_status: &'static str) -> Response {
    (
        [("content-type", "application/json"), ("x-cache", cache_status)],
        payload,
    )
        .into_response()
}
