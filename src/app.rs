use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue},
    routing::{any, get},
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

use crate::config::{AppConfig, DirectoryBackend};
use crate::directory::{Directory, PgDirectory, SupabaseDirectory};
use crate::handlers;

/// Request headers cross-origin callers may send.
pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type, x-setup-token";

/// Shared per-process state. Read-only once the server is running.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn Directory>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: Arc<dyn Directory>) -> Self {
        Self {
            config: Arc::new(config),
            directory,
        }
    }
}

/// Build the directory selected by configuration.
pub async fn connect_directory(config: &AppConfig) -> anyhow::Result<Arc<dyn Directory>> {
    let directory: Arc<dyn Directory> = match config.directory_backend()? {
        DirectoryBackend::Postgres { database_url } => Arc::new(
            PgDirectory::connect(&database_url, &config.directory)
                .await
                .context("failed to connect to the user directory database")?,
        ),
        DirectoryBackend::Supabase {
            base_url,
            service_role_key,
        } => Arc::new(
            SupabaseDirectory::new(base_url, service_role_key)
                .context("failed to build the user directory client")?,
        ),
    };

    info!("Using {} user directory", directory.backend());
    Ok(directory)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Token-gated; every method reaches the handler so it can answer 405 itself
        .route("/setup-admin", any(handlers::setup_admin))
        .route("/functions/v1/setup-admin", any(handlers::setup_admin))
        .with_state(state)
        // CORS headers on every response, preflight included
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(TraceLayer::new_for_http())
}
