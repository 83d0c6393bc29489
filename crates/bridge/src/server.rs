//! Bridge HTTP server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use voxa_common::{
    AgentCatalog, AgentControlResponse, AgentInfo, AgentRequest, ApiStatus, ServiceAvailability,
};

use crate::backend::TaskStatusForwarder;
use crate::config::BridgeConfig;
use crate::dispatch::{http_client, BrowserDriver, Dispatcher};
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};

/// Bridge server state
#[derive(Clone)]
pub struct BridgeServer {
    state: Arc<BridgeState>,
}

struct BridgeState {
    dispatcher: Dispatcher,
    tasks: TaskStatusForwarder,
    /// Present when UI automation is enabled
    driver: Option<Arc<dyn BrowserDriver>>,
}

impl BridgeServer {
    /// Create a bridge server using Playwright for UI automation
    pub fn new(cfg: &BridgeConfig) -> voxa_common::Result<Self> {
        let driver: Arc<dyn BrowserDriver> = Arc::new(PlaywrightDriver::new(
            PlaywrightConfig::from_automation(&cfg.automation, cfg.timeouts.automation_step()),
        ));
        Self::with_driver(cfg, driver)
    }

    /// Create a bridge server with a caller-supplied browser driver
    pub fn with_driver(
        cfg: &BridgeConfig,
        driver: Arc<dyn BrowserDriver>,
    ) -> voxa_common::Result<Self> {
        let client = http_client()?;
        let dispatcher = Dispatcher::from_config_with_client(cfg, client.clone(), driver.clone())?;
        let tasks = TaskStatusForwarder::new(client, &cfg.direct_api_url, cfg.timeouts.status());

        Ok(Self {
            state: Arc::new(BridgeState {
                dispatcher,
                tasks,
                driver: cfg.automation.enabled.then_some(driver),
            }),
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/api/status", get(api_status_handler))
            .route("/api/agents", get(list_agents_handler))
            .route("/api/agents/start", post(start_agent_handler))
            .route("/api/agents/:task_id/stop", post(stop_agent_handler))
            .route("/api/task/:task_id/status", get(task_status_handler))
            .fallback(not_found_handler)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the bridge server; returns after Ctrl-C
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Bridge starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Bridge shutdown complete");
        Ok(())
    }
}

pub async fn serve(addr: SocketAddr, cfg: &BridgeConfig) -> anyhow::Result<()> {
    let server = BridgeServer::new(cfg)?;
    server.serve(addr).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

// ============================================================================
// Handlers
// ============================================================================

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Web Automation Agent API is running!"
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Server is healthy"
    }))
}

async fn api_status_handler(State(state): State<Arc<BridgeState>>) -> impl IntoResponse {
    let available = match &state.driver {
        Some(driver) => driver.is_available().await,
        None => false,
    };
    let automation = if available { "available" } else { "unavailable" };

    Json(ApiStatus {
        status: "running".to_string(),
        version: voxa_common::VERSION.to_string(),
        services: ServiceAvailability {
            browser_automation: automation.to_string(),
            websocket: "unavailable".to_string(),
            file_upload: "unavailable".to_string(),
        },
    })
}

async fn list_agents_handler() -> impl IntoResponse {
    Json(AgentCatalog {
        agents: AgentInfo::catalog(),
    })
}

async fn start_agent_handler(
    State(state): State<Arc<BridgeState>>,
    Json(req): Json<AgentRequest>,
) -> Response {
    info!(agent_type = %req.agent_type, "start agent requested");

    match state.dispatcher.dispatch(req).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Rejected start request: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn task_status_handler(
    State(state): State<Arc<BridgeState>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    Json(state.tasks.status(&task_id).await)
}

async fn stop_agent_handler(Path(task_id): Path<String>) -> impl IntoResponse {
    Json(AgentControlResponse {
        task_id,
        status: "stopped".to_string(),
        message: "Agent stopped successfully".to_string(),
    })
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not found"})),
    )
}
