//! Research agent: grounded chat over a vector index

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptBuilder, SYSTEM_PROMPT};
use crate::index::VectorIndex;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};
use crate::types::response::{ChatMessage, ChatResponse, Citation};

use super::stream::ChatStream;

/// Binds one index, one fixed system prompt and one language model
///
/// The agent holds no conversation state; prior turns are passed in by the
/// caller on every call.
pub struct ResearchAgent {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
    top_k: usize,
    model_name: String,
}

impl ResearchAgent {
    /// Create an agent over an already-loaded index
    pub fn new(
        index: impl Into<Arc<VectorIndex>>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::invalid_input("top_k must be a positive integer"));
        }

        let model_name = llm.model().to_string();
        Ok(Self {
            index: index.into(),
            embedder,
            llm,
            system_prompt: SYSTEM_PROMPT.to_string(),
            top_k,
            model_name,
        })
    }

    /// Set the display name reported by front ends
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Load the persisted index named by the configuration and bind Ollama providers
    ///
    /// Fails with a configuration error before touching the index when the
    /// path is unset or missing.
    pub async fn load_from_storage(config: &RagConfig, top_k: Option<usize>) -> Result<Self> {
        check_index_path(config)?;

        let providers = OllamaProvider::from_config(config)?;
        providers.warn_if_unavailable().await;

        Self::load_from_storage_with(config, providers.embedder(), providers.llm(), top_k).await
    }

    /// Load the persisted index named by the configuration with the given providers
    pub async fn load_from_storage_with(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        top_k: Option<usize>,
    ) -> Result<Self> {
        let path = check_index_path(config)?.to_path_buf();

        let index = tokio::task::spawn_blocking(move || VectorIndex::load(&path))
            .await
            .map_err(|e| Error::internal(format!("Index loading task failed: {}", e)))??;

        let agent = Self::new(index, embedder, llm, top_k.unwrap_or(config.agent.top_k))?
            .with_model_name(config.model_name());

        tracing::info!(
            "Research agent '{}' ready: {} chunks, top_k {}",
            agent.model_name,
            agent.index.len(),
            agent.top_k
        );

        Ok(agent)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the context chunks for a message
    pub async fn retrieve(&self, message: &str) -> Result<Vec<Citation>> {
        let results = self
            .index
            .query(message, self.top_k, self.embedder.as_ref())
            .await?;

        Ok(results
            .iter()
            .map(|r| Citation::from_chunk(&r.chunk, r.score))
            .collect())
    }

    async fn prepare(
        &self,
        message: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<(Vec<Citation>, Vec<ChatMessage>)> {
        if message.trim().is_empty() {
            return Err(Error::invalid_input("message must not be empty"));
        }

        let citations = self.retrieve(message).await?;
        let messages = PromptBuilder::build_messages(
            &self.system_prompt,
            &citations,
            history.unwrap_or_default(),
            message,
        );
        Ok((citations, messages))
    }

    /// Answer a message from retrieved context
    pub async fn chat(
        &self,
        message: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<ChatResponse> {
        let start = Instant::now();
        tracing::info!("Chat: \"{}\"", message);

        let (citations, messages) = self.prepare(message, history).await?;
        let text = self.llm.chat(&messages).await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Chat completed in {}ms with {} context chunks",
            processing_time_ms,
            citations.len()
        );

        Ok(ChatResponse::new(text, citations, processing_time_ms))
    }

    /// Answer a message as a stream of text increments
    ///
    /// The final [`ChatResponse`] is available from the stream once it has
    /// been drained. Dropping the stream cancels the backend request.
    pub async fn stream_chat(
        &self,
        message: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<ChatStream> {
        let start = Instant::now();
        tracing::info!("Streaming chat: \"{}\"", message);

        let (citations, messages) = self.prepare(message, history).await?;
        let inner = self.llm.stream_chat(&messages).await?;

        Ok(ChatStream::new(inner, citations, start))
    }
}

fn check_index_path(config: &RagConfig) -> Result<&std::path::Path> {
    let path = config.vector_index.require_path()?;
    if !path.exists() {
        return Err(Error::config(format!(
            "Vector index path does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use uuid::Uuid;

    use crate::providers::TextStream;
    use crate::types::{Chunk, ChunkSource, Document, FileType, Role};

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![
                text.matches("cat").count() as f32,
                text.matches("dog").count() as f32,
            ])
        }

        fn name(&self) -> &str {
            "axis"
        }

        fn model(&self) -> &str {
            "axis-v1"
        }
    }

    /// Records the messages it receives and replies with a fixed text
    struct RecordingLlm {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream> {
            self.seen.lock().push(messages.to_vec());
            let parts: Vec<Result<String>> = self
                .reply
                .split_inclusive(' ')
                .map(|s| Ok(s.to_string()))
                .collect();
            Ok(Box::pin(futures::stream::iter(parts)))
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-v1"
        }
    }

    fn index() -> VectorIndex {
        let doc = Document::new(PathBuf::from("pets.pdf"), FileType::Pdf, vec![(Some(1), "x".into())], 1);
        let make = |text: &str, page: u32, embedding: Vec<f32>| {
            let mut chunk = Chunk::new(Uuid::new_v4(), text.into(), ChunkSource::for_page(&doc, Some(page)), 0, 0, page);
            chunk.embedding = embedding;
            chunk
        };
        VectorIndex::from_embedded(
            vec![
                make("Cats sleep a lot.", 1, vec![1.0, 0.0]),
                make("Dogs need walks.", 2, vec![0.0, 1.0]),
            ],
            "axis-v1",
        )
        .unwrap()
    }

    fn agent(reply: &str) -> (ResearchAgent, Arc<RecordingLlm>) {
        let llm = Arc::new(RecordingLlm {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let agent = ResearchAgent::new(index(), Arc::new(AxisEmbedder), llm.clone(), 1).unwrap();
        (agent, llm)
    }

    #[tokio::test]
    async fn test_chat_uses_retrieved_context() {
        let (agent, llm) = agent("Dogs need walks.\n\npets.pdf, page 2");
        let response = agent.chat("what does a dog need?", None).await.unwrap();

        assert_eq!(response.citations.len(), 1);
        assert_eq!(response.citations[0].page_number, Some(2));
        assert_eq!(response.referenced_citations().len(), 1);

        let seen = llm.seen.lock();
        let messages = &seen[0];
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with(SYSTEM_PROMPT));
        assert!(messages[0].content.contains("Dogs need walks."));
        assert!(!messages[0].content.contains("Cats sleep"));
        assert_eq!(messages.last().unwrap(), &ChatMessage::user("what does a dog need?"));
    }

    #[tokio::test]
    async fn test_history_is_threaded_through() {
        let (agent, llm) = agent("ok");
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        agent.chat("and cats?", Some(history.as_slice())).await.unwrap();

        let seen = llm.seen.lock();
        assert_eq!(seen[0].len(), 4);
        assert_eq!(seen[0][1], ChatMessage::user("hi"));
        assert_eq!(seen[0][2], ChatMessage::assistant("hello"));
    }

    #[tokio::test]
    async fn test_agent_is_stateless_between_calls() {
        let (agent, llm) = agent("ok");
        agent.chat("first about cats", None).await.unwrap();
        agent.chat("second about dogs", None).await.unwrap();

        let seen = llm.seen.lock();
        assert_eq!(seen[1].len(), 2);
        assert!(seen[1].iter().all(|m| !m.content.contains("first about cats")));
    }

    #[tokio::test]
    async fn test_stream_chat_yields_increments_then_response() {
        let (agent, _) = agent("Cats sleep a lot.");
        let mut stream = agent.stream_chat("tell me about the cat", None).await.unwrap();

        assert!(stream.response().is_none());
        let mut parts = Vec::new();
        while let Some(part) = stream.next().await {
            parts.push(part.unwrap());
        }

        assert_eq!(parts, vec!["Cats ", "sleep ", "a ", "lot."]);
        let response = stream.response().unwrap();
        assert_eq!(response.text, "Cats sleep a lot.");
        assert_eq!(response.citations[0].page_number, Some(1));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (agent, llm) = agent("ok");
        assert!(matches!(agent.chat("  ", None).await, Err(Error::InvalidInput(_))));
        assert!(llm.seen.lock().is_empty());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let llm: Arc<dyn LlmProvider> = Arc::new(RecordingLlm {
            reply: String::new(),
            seen: Mutex::new(Vec::new()),
        });
        let result = ResearchAgent::new(index(), Arc::new(AxisEmbedder), llm, 0);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_load_from_storage_requires_path() {
        let config = RagConfig::default();
        let result = ResearchAgent::load_from_storage(&config, None).await;
        assert!(matches!(result, Err(Error::Config(_))));

        let mut config = RagConfig::default();
        config.vector_index.path = Some(PathBuf::from("/nonexistent/docqa/index"));
        let result = ResearchAgent::load_from_storage(&config, None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
