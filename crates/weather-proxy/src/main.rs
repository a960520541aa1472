use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use weather_proxy::config::Config;
use weather_proxy::upstream::WeatherClient;
use weather_proxy::weather::AppState;
use weather_proxy::{app, CACHE_TTL, GLOBAL_POLICY, WEATHER_POLICY};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Pick up a .env file if one is present
    if dotenvy::dotenv().is_ok() {
        tracing::info!("loaded environment from .env");
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let client = WeatherClient::new(config.upstream_url.clone(), config.api_key.clone());
    let state = Arc::new(AppState::new(
        client,
        CACHE_TTL,
        GLOBAL_POLICY,
        WEATHER_POLICY,
    ));

    let router = app(Arc::clone(&state), &config.static_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        addr = %addr,
        upstream = %config.upstream_url,
        static_dir = %config.static_dir,
        cache_ttl_secs = CACHE_TTL.as_secs(),
        global_max = GLOBAL_POLICY.max,
        weather_max = WEATHER_POLICY.max,
        "weather proxy starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));

    let serve = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = serve.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("weather proxy shut down");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    tracing::info!("shutdown signal received, draining connections...");
}
