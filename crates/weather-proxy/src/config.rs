use std::env;
use thiserror::Error;

/// Process configuration, read from the environment (a `.env` file is
/// loaded first if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream provider credential. Required; embedded in upstream request
    /// URLs and never echoed to clients or logs.
    pub api_key: String,
    /// Listen port. The server binds all interfaces.
    pub port: u16,
    /// Upstream provider base URL. Overridable mainly for tests.
    pub upstream_url: String,
    /// Directory the static layer serves the browser client from.
    pub static_dir: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WEATHER_API_KEY is not set")]
    MissingApiKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("WEATHER_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or_else(default_port);

        let upstream_url = env::var("UPSTREAM_URL").unwrap_or_else(|_| default_upstream_url());
        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| default_static_dir());

        Ok(Config {
            api_key,
            port,
            upstream_url,
            static_dir,
        })
    }
}

fn default_port() -> u16 {
    3000
}
fn default_upstream_url() -> String {
    "https://api.openweathermap.org".to_string()
}
fn default_static_dir() -> String {
    "public".to_string()
}
