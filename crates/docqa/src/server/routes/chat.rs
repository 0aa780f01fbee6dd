//! Chat endpoints

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::agent::ChatStream;
use crate::error::Result;
use crate::generation::GREETING;
use crate::server::state::AppState;
use crate::types::response::{ChatMessage, ChatResponse, Citation};

/// Chat request body; the caller owns the conversation history
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Chat reply with the sources the answer refers to
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub model: String,
    #[serde(flatten)]
    pub response: ChatResponse,
    pub referenced_citations: Vec<Citation>,
}

impl ChatReply {
    fn new(model: &str, response: ChatResponse) -> Self {
        Self {
            model: model.to_string(),
            referenced_citations: response.referenced_citations(),
            response,
        }
    }
}

#[derive(Debug, Serialize)]
struct Delta<'a> {
    text: &'a str,
}

/// GET /api/greeting - opening assistant message
pub async fn greeting(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "model": state.agent().model_name(),
        "greeting": GREETING,
    }))
}

/// POST /api/chat - answer one turn
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    let agent = state.agent();
    let response = agent.chat(&request.message, Some(&request.history[..])).await?;
    Ok(Json(ChatReply::new(agent.model_name(), response)))
}

/// POST /api/chat/stream - answer one turn as server-sent events
///
/// Emits `delta` events carrying text increments, then a single `done` event
/// with the full reply. A backend failure mid-answer ends the stream with an
/// `error` event.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let agent = state.agent();
    let stream = agent.stream_chat(&request.message, Some(&request.history[..])).await?;
    let model = agent.model_name().to_string();

    Ok(Sse::new(sse_events(stream, model)).keep_alive(KeepAlive::default()))
}

fn sse_events(
    stream: ChatStream,
    model: String,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold(Some((stream, model)), |state| async move {
        let (mut stream, model) = state?;
        match stream.next().await {
            Some(Ok(delta)) => {
                let event = json_event("delta", &Delta { text: &delta });
                Some((event, Some((stream, model))))
            }
            Some(Err(e)) => {
                tracing::warn!("Streaming chat failed: {}", e);
                Some((error_event(&e.to_string()), None))
            }
            None => {
                let event = match stream.response() {
                    Some(response) => json_event("done", &ChatReply::new(&model, response.clone())),
                    None => error_event("stream ended without a complete response"),
                };
                Some((event, None))
            }
        }
    })
    .map(Ok)
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| error_event(&e.to_string()))
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "message": message }).to_string())
}
