//! HTTP gateway for the knowledge-augmented responder.
//!
//! Routes:
//! - `GET /`, `GET /health`: liveness
//! - `POST /chat`: one conversational turn on a caller-chosen thread
//!
//! Built on Axum.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use knowbridge_agent::KnowledgeResponder;
use knowbridge_config::AppConfig;
use knowbridge_remote::{Authenticator, RemoteAgentClient};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Shared application state for the gateway.
///
/// The responder is built once at startup. If that fails (typically no
/// language-model key), the server still starts and `/chat` reports the
/// reason on every call.
pub struct GatewayState {
    pub responder: Result<Arc<KnowledgeResponder>, String>,
}

impl GatewayState {
    pub fn ready(responder: KnowledgeResponder) -> Self {
        Self {
            responder: Ok(Arc::new(responder)),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            responder: Err(reason.into()),
        }
    }

    /// Wire the responder from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let auth = match Authenticator::from_config(config) {
            Ok(auth) => Arc::new(auth),
            Err(e) => return Self::unavailable(e.to_string()),
        };
        let client = match RemoteAgentClient::from_config(config, auth) {
            Ok(client) => Arc::new(client),
            Err(e) => return Self::unavailable(e.to_string()),
        };
        match KnowledgeResponder::from_config(config, client) {
            Ok(responder) => Self::ready(responder),
            Err(e) => {
                warn!(error = %e, "Responder unavailable; /chat will return 500");
                Self::unavailable(e.to_string())
            }
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config));
    let app = build_router(state);

    info!(addr = %addr, book_agent = %config.remote.book_agent_url, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "knowledge-agent",
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    thread_id: String,
}

#[derive(Serialize)]
struct ChatReply {
    response: String,
}

#[derive(Serialize)]
struct ErrorDetail {
    detail: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<ErrorDetail>)> {
    let responder = match &state.responder {
        Ok(responder) => responder.clone(),
        Err(reason) => {
            error!(reason = %reason, "Chat request with no responder");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: reason.clone(),
                }),
            ));
        }
    };

    info!(
        thread_id = %payload.thread_id,
        message_len = payload.message.len(),
        "Chat message received"
    );

    let response = responder.chat(&payload.message, &payload.thread_id).await;
    Ok(Json(ChatReply { response }))
}
