pub mod config;
pub mod error;
pub mod limit;
pub mod upstream;
pub mod weather;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use stratus_limit::RatePolicy;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use limit::{global_rate_limit, weather_rate_limit};
use weather::{weather_handler, AppState};

/// How long a fetched payload stays servable from the cache.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Catch-all policy, applied to every route.
pub const GLOBAL_POLICY: RatePolicy = RatePolicy::new(Duration::from_secs(60), 100);

/// Tighter policy for the weather endpoint, applied after the global one.
pub const WEATHER_POLICY: RatePolicy = RatePolicy::new(Duration::from_secs(60), 30);

/// Build the full router: the weather API plus the static layer serving the
/// browser client, with both rate-limit policies in place.
///
/// Must be served with connect info so the limiters can see peer addresses.
pub fn app(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/api/weather", get(weather_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            weather_rate_limit,
        ))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            global_rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
