//! API routes for the chat server

pub mod chat;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/greeting", get(chat::greeting))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(axum::extract::State(state): axum::extract::State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.agent().model_name(),
        "chunks": state.agent().index().len(),
        "endpoints": {
            "GET /api/greeting": "Opening assistant message",
            "POST /api/chat": "Answer one turn with citations",
            "POST /api/chat/stream": "Answer one turn as server-sent events",
        }
    }))
}
