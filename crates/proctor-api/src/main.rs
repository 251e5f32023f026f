// Proctor API server
// Decision: the persistence choice is injected here and nowhere else -
// DATABASE_URL selects Postgres, otherwise the in-memory store is used

use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use proctor_api::{
    api_routes, build_router_with_prefix, common, config::ApiConfig, events, reports, sessions,
    AppState,
};
use proctor_core::{
    ClientSummary, EventDetail, EventKind, InMemorySessionRepository, RecentSession,
    RecordedEvent, Report, Session, SessionRepository, SessionStatus, Severity, StatsSummary,
};
use proctor_storage::PgSessionRepository;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store_mode: String,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store_mode: state.store_mode.clone(),
    })
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    store_mode: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        sessions::start_session,
        sessions::list_sessions,
        sessions::get_session,
        sessions::end_session,
        sessions::cancel_session,
        events::ingest_event,
        events::list_events,
        events::stream_session_sse,
        events::stream_alerts_sse,
        reports::get_report,
        reports::get_report_csv,
        reports::get_stats_summary,
    ),
    components(
        schemas(
            Session, SessionStatus,
            EventKind, Severity, EventDetail, RecordedEvent,
            Report, StatsSummary, RecentSession, ClientSummary,
            sessions::StartSessionRequest,
            sessions::EndSessionRequest,
            sessions::SessionSummary,
            events::IngestEventRequest,
            events::EventsResponse,
            events::Alert,
            common::ListResponse<sessions::SessionSummary>,
        )
    ),
    tags(
        (name = "sessions", description = "Session lifecycle endpoints"),
        (name = "events", description = "Detection event ingestion and streaming endpoints"),
        (name = "reports", description = "Report and dashboard endpoints")
    ),
    info(
        title = "Proctor API",
        version = "0.2.0",
        description = "API for tracking remote-proctored interview sessions, ingesting integrity-violation events, and serving integrity reports",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proctor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("proctor-api starting...");

    let config = ApiConfig::from_env();

    // Select the session store
    let (repo, store_mode): (Arc<dyn SessionRepository>, &str) = match &config.database_url {
        Some(url) => {
            let pg = PgSessionRepository::from_url(url)
                .await
                .context("Failed to connect to database")?;
            pg.ensure_schema()
                .await
                .context("Failed to ensure database schema")?;
            tracing::info!("Connected to database");
            (Arc::new(pg), "postgres")
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory session store");
            (Arc::new(InMemorySessionRepository::new()), "memory")
        }
    };

    let state = AppState::new(repo);
    let health_state = HealthState {
        store_mode: store_mode.to_string(),
    };

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }

    // Build main router with health (not prefixed) and prefixed API routes
    let mut app = Router::new().route("/health", get(health).with_state(health_state));
    app = app.merge(build_router_with_prefix(api_routes(state), &config.api_prefix));

    // Add Swagger UI
    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !config.cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ]),
        )
    } else {
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
