//! HTTP surface: the operator-facing admin listener that triggers builds and
//! the separate listener the built clients talk to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Form, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::compiler::GoToolchain;
use crate::errors::BuildError;
use crate::orchestrator::Orchestrator;
use crate::registry::{ClientRecord, ClientRegistry};

const ADMIN_PAGE: &str = include_str!("../assets/admin.html");

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for both listeners.
pub struct ServerConfig {
    pub host: String,
    pub admin_port: u16,
    pub client_port: u16,
    pub registry_path: PathBuf,
    pub toolchain: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            admin_port: 9090,
            client_port: 8080,
            registry_path: PathBuf::from("clients.jsonl"),
            toolchain: "go".to_string(),
        }
    }
}

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub registry: Arc<ClientRegistry>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BuildForm {
    /// Optional so an absent field surfaces as a 400, not an extractor
    /// rejection.
    pub system: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        if err.is_caller_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            tracing::error!(error = %err, "build request failed");
            ApiError::Internal(err.to_string())
        }
    }
}

// ── Routers ───────────────────────────────────────────────────────────

/// Operator-facing surface: the build form, the build trigger, and the
/// registry listing.
pub fn admin_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(admin_page))
        .route("/build", post(handle_build))
        .route("/clients", get(list_clients))
        .route("/health", get(health_check))
        .with_state(state)
}

/// The surface built clients call home to.
pub fn client_router() -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_PAGE)
}

/// `POST /build`: run one build for the platform in the `system` form field
/// and stream the artifact back as an attachment download.
async fn handle_build(
    State(state): State<SharedState>,
    form: Result<Form<BuildForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let system = form
        .system
        .ok_or_else(|| ApiError::BadRequest("missing form field 'system'".to_string()))?;

    let artifact = state.orchestrator.handle_build_request(&system).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        )
        .body(Body::from(artifact.bytes))
        .unwrap();
    Ok(response)
}

/// `GET /clients`: every recorded build request, in registry file order.
async fn list_clients(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ClientRecord>>, ApiError> {
    let records = state.registry.list_all().await?;
    Ok(Json(records))
}

async fn hello() -> &'static str {
    "Hello from smelter. Your client is checked in.\n"
}

async fn health_check() -> &'static str {
    "ok"
}

// ── Startup ───────────────────────────────────────────────────────────

/// Bind both listeners and serve until Ctrl+C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let registry = Arc::new(ClientRegistry::new(config.registry_path.clone()));
    let orchestrator = Orchestrator::new(
        Arc::clone(&registry),
        Arc::new(GoToolchain::new(config.toolchain.clone())),
    );
    let state = Arc::new(AppState {
        orchestrator,
        registry,
    });

    let admin_addr = format!("{}:{}", config.host, config.admin_port);
    let admin_listener = tokio::net::TcpListener::bind(&admin_addr)
        .await
        .with_context(|| format!("Failed to bind admin listener to {}", admin_addr))?;
    let bound_admin = admin_listener.local_addr()?;
    tracing::info!(addr = %bound_admin, "admin panel listening");

    let client_addr = format!("{}:{}", config.host, config.client_port);
    let client_listener = tokio::net::TcpListener::bind(&client_addr)
        .await
        .with_context(|| format!("Failed to bind client listener to {}", client_addr))?;
    let bound_client = client_listener.local_addr()?;
    tracing::info!(addr = %bound_client, "client endpoint listening");

    let admin = axum::serve(admin_listener, admin_router(state))
        .with_graceful_shutdown(shutdown_signal());
    let client =
        axum::serve(client_listener, client_router()).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async { admin.await.context("Admin server error") },
        async { client.await.context("Client server error") },
    )?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}
