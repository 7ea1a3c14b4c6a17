//! Webhook HTTP server.
//!
//! An alternative to long polling: Telegram POSTs each update to this
//! server and the reply goes back through `sendMessage`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/telegram/webhook` | Receive one update |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! When `telegram.webhook_secret` is set, requests must carry it in the
//! `X-Telegram-Bot-Api-Secret-Token` header.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "bad secret token" } }
//! ```

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::handler::{reply_for, Handler};
use crate::telegram::{TelegramClient, Update};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<Handler>,
    pub client: Arc<TelegramClient>,
    pub secret: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/telegram/webhook", post(handle_update))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Bind to `bind_addr` and serve until the process is stopped.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "webhook server listening");
    println!("Webhook server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /telegram/webhook ============

/// Telegram only needs a 2xx; the reply itself is sent on a separate task
/// so a slow Notion call never holds the webhook open.
async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, AppError> {
    if let Some(ref secret) = state.secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            warn!(update = update.update_id, "rejected webhook with bad secret token");
            return Err(unauthorized("bad secret token"));
        }
    }

    let Some(message) = update.message else {
        return Ok(StatusCode::OK);
    };
    let Some(text) = message.text else {
        return Ok(StatusCode::OK);
    };

    let chat_id = message.chat.id;
    let sender = message.from.as_ref().map(|u| u.display_name());
    tokio::spawn(async move {
        if let Some(reply) = reply_for(&state.handler, chat_id, sender.as_deref(), &text).await {
            if let Err(e) = state.client.send_message(chat_id, &reply).await {
                error!(chat = chat_id, error = %format!("{:#}", e), "sendMessage failed");
            }
        }
    });

    Ok(StatusCode::OK)
}
