// API configuration loaded from the environment

use axum::http::HeaderValue;

/// Server configuration
///
/// - `DATABASE_URL` selects the Postgres store; without it the service
///   runs on the in-memory store (single node, no retention across restarts)
/// - `BIND_ADDR` defaults to 0.0.0.0:9000
/// - `API_PREFIX` optionally nests the versioned routes (e.g. "/api")
/// - `CORS_ALLOWED_ORIGINS` is a comma-separated origin list, only needed
///   when the UI is served from a different origin than the API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub api_prefix: String,
    pub cors_origins: Vec<HeaderValue>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let api_prefix = std::env::var("API_PREFIX").unwrap_or_default();

        let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.split(',')
                    .filter_map(|origin| origin.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_addr,
            database_url,
            api_prefix,
            cors_origins,
        }
    }
}
