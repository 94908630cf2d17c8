use super::hub::TelemetryHub;
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use futures::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ServerState {
    pub(crate) hub: Arc<TelemetryHub>,
    pub(crate) topic: Arc<str>,
}

/// HTTP + WebSocket endpoint for dashboards
pub struct TelemetryServer {
    hub: Arc<TelemetryHub>,
    topic: String,
    address: String,
    frames_dir: Option<PathBuf>,
}

impl TelemetryServer {
    pub fn new(config: &TelemetryConfig, hub: Arc<TelemetryHub>) -> Self {
        Self {
            hub,
            topic: config.topic.clone(),
            address: format!("{}:{}", config.ip, config.port),
            frames_dir: None,
        }
    }

    /// Also serve saved lane frames under `/frames`
    pub fn with_frames_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = Some(dir.into());
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn router(&self) -> Router {
        let state = ServerState {
            hub: Arc::clone(&self.hub),
            topic: Arc::from(self.topic.as_str()),
        };

        let router = Router::new()
            .route(&format!("/ws/{}/", self.topic), get(ws_handler))
            .route(&format!("/api/{}", self.topic), get(latest_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        match &self.frames_dir {
            Some(dir) => router.nest_service("/frames", ServeDir::new(dir)),
            None => router,
        }
    }

    /// Serve until `cancel` fires
    pub async fn start(self, cancel: CancellationToken) -> Result<(), TelemetryError> {
        let app = self.router();

        info!("Starting telemetry server on {}", self.address);
        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .map_err(|e| TelemetryError::Bind {
                address: self.address.clone(),
                source: e,
            })?;
        info!("Telemetry server listening on {}", self.address);

        axum::serve(listener, app)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
            .map_err(|e| TelemetryError::Server {
                details: format!("Server error: {}", e),
            })?;

        info!("Telemetry server stopped");
        Ok(())
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.hub.subscribe(&state.topic);
    debug!("Observer joined '{}'", state.topic);

    if let Some(latest) = state.hub.latest(&state.topic) {
        if sender.send(Message::Text(latest)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(message) => {
                    if sender.send(Message::Text(message)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Observer on '{}' lagged by {} messages", state.topic, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Observer left '{}'", state.topic);
}

/// Latest snapshot, or 204 before the first publish
pub async fn latest_handler(State(state): State<ServerState>) -> Response {
    match state.hub.latest(&state.topic) {
        Some(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health_info = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "topic": &*state.topic,
        "subscribers": state.hub.subscriber_count(&state.topic),
        "has_snapshot": state.hub.latest(&state.topic).is_some(),
    });

    (StatusCode::OK, axum::Json(health_info))
}
