// Proctor API service library
//
// Route modules plus the shared application state; the binary in main.rs
// wires configuration, store selection, and middleware around these.

pub mod common;
pub mod config;
pub mod events;
pub mod reports;
pub mod sessions;

use std::sync::Arc;

use axum::Router;

use proctor_core::{BroadcastPublisher, EventIngestor, LifecycleManager, SessionRepository};

/// Capacity of the accepted-event broadcast channel; slow alert
/// subscribers beyond this drop their own backlog
const ALERT_CHANNEL_CAPACITY: usize = 256;

/// App state shared across routes
///
/// The repository is the injected persistence choice (in-memory or
/// Postgres); the lifecycle manager and ingestor own all writes to it.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SessionRepository>,
    pub lifecycle: Arc<LifecycleManager>,
    pub ingestor: Arc<EventIngestor>,
    pub publisher: BroadcastPublisher,
}

impl AppState {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        let publisher = BroadcastPublisher::new(ALERT_CHANNEL_CAPACITY);
        let lifecycle = Arc::new(LifecycleManager::new(repo.clone()));
        let ingestor = Arc::new(EventIngestor::new(
            repo.clone(),
            Arc::new(publisher.clone()),
        ));
        Self {
            repo,
            lifecycle,
            ingestor,
            publisher,
        }
    }
}

/// Build the versioned API routes
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .merge(sessions::routes(state.clone()))
        .merge(events::routes(state.clone()))
        .merge(reports::routes(state))
}

/// Build router with optional API prefix
pub fn build_router_with_prefix(api_routes: Router, api_prefix: &str) -> Router {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
