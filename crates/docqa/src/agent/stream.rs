//! Streaming chat responses

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::TextStream;
use crate::types::response::{ChatResponse, Citation};

/// Forward-only stream of answer increments for one chat turn
///
/// Yields text increments as the model produces them. Once the stream has
/// ended, [`ChatStream::response`] holds the full answer with its citations.
/// A backend error ends the stream without a final response.
pub struct ChatStream {
    inner: TextStream,
    citations: Vec<Citation>,
    text: String,
    start: Instant,
    finished: bool,
    response: Option<ChatResponse>,
}

impl ChatStream {
    pub(crate) fn new(inner: TextStream, citations: Vec<Citation>, start: Instant) -> Self {
        Self {
            inner,
            citations,
            text: String::new(),
            start,
            finished: false,
            response: None,
        }
    }

    /// Context chunks retrieved for this turn
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Text received so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The final response, once the stream has been drained
    pub fn response(&self) -> Option<&ChatResponse> {
        self.response.as_ref()
    }

    /// Drain the remaining increments and return the final response
    pub async fn into_response(mut self) -> Result<ChatResponse> {
        while let Some(item) = self.next().await {
            item?;
        }
        self.response
            .take()
            .ok_or_else(|| Error::llm("stream ended without a complete response"))
    }
}

impl Stream for ChatStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(delta))) => {
                this.text.push_str(&delta);
                Poll::Ready(Some(Ok(delta)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                let processing_time_ms = this.start.elapsed().as_millis() as u64;
                tracing::info!(
                    "Streaming chat completed in {}ms with {} context chunks",
                    processing_time_ms,
                    this.citations.len()
                );
                this.response = Some(ChatResponse::new(
                    this.text.clone(),
                    this.citations.clone(),
                    processing_time_ms,
                ));
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
