//! Ollama HTTP client and the provider implementations built on it

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::types::response::ChatMessage;

use super::embedding::EmbeddingProvider;
use super::llm::{LlmProvider, TextStream};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Deserialize, Default)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

/// One NDJSON line of a streaming chat reply
#[derive(Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<ReplyMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    ///
    /// `timeout_secs` bounds connecting and each read, not the whole request,
    /// so long streamed replies are not cut off while tokens keep arriving.
    pub fn new(base_url: &str, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    /// Create a client from the `[llm]` configuration section
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(
            &config.llm.base_url,
            config.llm.timeout_secs,
            config.llm.max_retries,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let url = url.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let response = client
                .post(url)
                .json(&EmbedRequest { model, prompt: text })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {} - {}",
                    status, body
                )));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            if embed_response.embedding.is_empty() {
                return Err(Error::embedding(format!(
                    "Model '{}' returned an empty embedding",
                    model
                )));
            }

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate a complete chat reply
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let url = url.as_str();
        let client = &self.client;

        tracing::debug!("Chat request to {} with {} messages", model, messages.len());

        self.retry_request(move || async move {
            let request = ChatRequest {
                model,
                messages,
                stream: false,
                options: ChatOptions { temperature },
            };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!("Chat failed: HTTP {} - {}", status, body)));
            }

            let reply: ChatReply = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

            Ok(reply.message.content)
        })
        .await
    }

    /// Stream a chat reply as text increments
    ///
    /// Ollama sends one JSON object per line; lines may be split across
    /// network reads, so bytes are buffered until a newline arrives.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<TextStream> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            stream: true,
            options: ChatOptions { temperature },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("Stream failed: HTTP {} - {}", status, body)));
        }

        let bytes = Box::pin(response.bytes_stream());
        let stream = futures_util::stream::unfold(
            (bytes, Vec::<u8>::new(), false),
            |(mut bytes, mut buffer, mut finished)| async move {
                loop {
                    if finished {
                        return None;
                    }

                    if let Some(line) = take_line(&mut buffer) {
                        match parse_stream_line(&line) {
                            Ok(None) => continue,
                            Ok(Some((text, done))) => {
                                finished = done;
                                if text.is_empty() {
                                    continue;
                                }
                                return Some((Ok(text), (bytes, buffer, finished)));
                            }
                            Err(e) => return Some((Err(e), (bytes, buffer, true))),
                        }
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                        Some(Err(e)) => {
                            let err = Error::llm(format!("Stream error: {}", e));
                            return Some((Err(err), (bytes, buffer, true)));
                        }
                        None => {
                            // Final line without a trailing newline
                            let rest = std::mem::take(&mut buffer);
                            return match parse_stream_line(&rest) {
                                Ok(Some((text, _))) if !text.is_empty() => {
                                    Some((Ok(text), (bytes, buffer, true)))
                                }
                                Ok(_) => None,
                                Err(e) => Some((Err(e), (bytes, buffer, true))),
                            };
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

/// Remove and return the first complete line (without the newline)
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    Some(line)
}

/// Parse one NDJSON line into `(text increment, done)`; blank lines yield `None`
fn parse_stream_line(line: &[u8]) -> Result<Option<(String, bool)>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| Error::llm(format!("Invalid UTF-8 in stream: {}", e)))?
        .trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parsed: StreamLine = serde_json::from_str(text)
        .map_err(|e| Error::llm(format!("Failed to parse stream line: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(Error::llm(error));
    }

    let content = parsed.message.map(|m| m.content).unwrap_or_default();
    Ok(Some((content, parsed.done)))
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama chat provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.client.chat(&self.model, messages, self.temperature).await
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.client
            .chat_stream(&self.model, messages, self.temperature)
            .await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Embedder and chat model sharing a single Ollama client
pub struct OllamaProvider {
    client: Arc<OllamaClient>,
    embedder: Arc<OllamaEmbedder>,
    llm: Arc<OllamaLlm>,
}

impl OllamaProvider {
    /// Build both providers; fails when either model identifier is unset
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let embed_model = config.embeddings.require_model()?.to_string();
        let chat_model = config.llm.require_model()?.to_string();
        let client = Arc::new(OllamaClient::from_config(config)?);

        Ok(Self {
            embedder: Arc::new(OllamaEmbedder::from_client(Arc::clone(&client), embed_model)),
            llm: Arc::new(OllamaLlm::from_client(
                Arc::clone(&client),
                chat_model,
                config.llm.temperature,
            )),
            client,
        })
    }

    /// Get the embedding provider
    pub fn embedder(&self) -> Arc<OllamaEmbedder> {
        Arc::clone(&self.embedder)
    }

    /// Get the LLM provider
    pub fn llm(&self) -> Arc<OllamaLlm> {
        Arc::clone(&self.llm)
    }

    /// Log a warning when the Ollama server does not answer
    pub async fn warn_if_unavailable(&self) {
        match self.client.health_check().await {
            Ok(true) => tracing::info!("Ollama is running at {}", self.client.base_url()),
            _ => {
                tracing::warn!("Ollama not available at {}", self.client.base_url());
                tracing::warn!("Start it with `ollama serve` and pull the configured models");
            }
        }
    }
}
