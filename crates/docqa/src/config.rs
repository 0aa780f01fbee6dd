//! Configuration for the document QA system
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! process environment (including a `.env` file in the working directory).
//! Model identifiers and the index location have no defaults; they must come
//! from the file or the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Display name of the assistant
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
/// Language model identifier served by Ollama
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";
/// Embedding model identifier served by Ollama
pub const ENV_EMBEDDINGS_MODEL: &str = "EMBEDDINGS_MODEL";
/// Directory of the persisted vector index
pub const ENV_VECTOR_INDEX_PATH: &str = "VECTOR_INDEX_PATH";
/// Ollama base URL
pub const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
/// Path to a TOML configuration file
pub const ENV_CONFIG_PATH: &str = "DOCQA_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Semantic splitter configuration
    pub splitter: SplitterConfig,
    /// Keyword extraction configuration
    pub keywords: KeywordConfig,
    /// Persisted index location
    pub vector_index: VectorIndexConfig,
    /// Research agent configuration
    pub agent: AgentConfig,
    /// Response evaluator configuration
    pub evaluation: EvaluationConfig,
    /// Chat server configuration
    pub server: ServerConfig,
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub model: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Connect and per-read timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: None,
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

impl LlmConfig {
    /// Generation model, or a configuration error when unset
    pub fn require_model(&self) -> Result<&str> {
        non_empty(self.model.as_deref())
            .ok_or_else(|| Error::config(format!("{} is not set", ENV_OLLAMA_MODEL)))
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: Option<String>,
    /// Number of texts sent per embedding batch during index build
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: None,
            batch_size: 32,
        }
    }
}

impl EmbeddingConfig {
    /// Embedding model, or a configuration error when unset
    pub fn require_model(&self) -> Result<&str> {
        non_empty(self.model.as_deref())
            .ok_or_else(|| Error::config(format!("{} is not set", ENV_EMBEDDINGS_MODEL)))
    }
}

/// Semantic splitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Sentences of context on each side when embedding a sentence
    pub buffer_size: usize,
    /// Distance percentile above which a chunk boundary is inserted
    pub breakpoint_percentile: f64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1,
            breakpoint_percentile: 95.0,
        }
    }
}

/// Keyword extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Run the keyword extractor after splitting
    pub enabled: bool,
    /// Keywords requested per chunk
    pub count: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 5,
        }
    }
}

/// Vector index location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// Directory holding the persisted index
    pub path: Option<PathBuf>,
}

impl VectorIndexConfig {
    /// Index directory, or a configuration error when unset
    pub fn require_path(&self) -> Result<&Path> {
        match &self.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.as_path()),
            _ => Err(Error::config(format!("{} is not set", ENV_VECTOR_INDEX_PATH))),
        }
    }
}

/// Research agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name of the assistant
    pub model_name: Option<String>,
    /// Chunks retrieved per question
    pub top_k: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_name: None,
            top_k: 3,
        }
    }
}

/// Response evaluator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Concurrent metric evaluations
    pub workers: usize,
    /// Show progress bars while generating and scoring
    pub show_progress: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            show_progress: true,
        }
    }
}

/// Chat server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

impl RagConfig {
    /// Load configuration from `.env`, the TOML file and the process environment
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv_override() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::config(format!("Invalid .env file: {}", e))),
        }

        let mut config = match Self::config_file_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MODEL_NAME) {
            self.agent.model_name = Some(v);
        }
        if let Some(v) = lookup(ENV_OLLAMA_MODEL) {
            self.llm.model = Some(v);
        }
        if let Some(v) = lookup(ENV_EMBEDDINGS_MODEL) {
            self.embeddings.model = Some(v);
        }
        if let Some(v) = lookup(ENV_VECTOR_INDEX_PATH) {
            self.vector_index.path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_OLLAMA_BASE_URL) {
            self.llm.base_url = v.trim_end_matches('/').to_string();
        }
    }

    /// Display name of the assistant, falling back to the generation model
    pub fn model_name(&self) -> String {
        non_empty(self.agent.model_name.as_deref())
            .or_else(|| non_empty(self.llm.model.as_deref()))
            .unwrap_or("docqa")
            .to_string()
    }

    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }
        let default = dirs::config_dir()?.join("docqa").join("config.toml");
        default.exists().then_some(default)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.agent.top_k, 3);
        assert_eq!(config.evaluation.workers, 4);
        assert_eq!(config.splitter.buffer_size, 1);
        assert_eq!(config.splitter.breakpoint_percentile, 95.0);
        assert!(config.llm.model.is_none());
        assert!(config.vector_index.path.is_none());
    }

    #[test]
    fn test_missing_models_are_config_errors() {
        let config = RagConfig::default();
        assert!(matches!(config.llm.require_model(), Err(Error::Config(_))));
        assert!(matches!(config.embeddings.require_model(), Err(Error::Config(_))));
        assert!(matches!(config.vector_index.require_path(), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OLLAMA_MODEL", "llama3"),
            ("EMBEDDINGS_MODEL", "nomic-embed-text"),
            ("VECTOR_INDEX_PATH", "/tmp/index"),
            ("OLLAMA_BASE_URL", "http://ollama:11434/"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.require_model().unwrap(), "llama3");
        assert_eq!(config.embeddings.require_model().unwrap(), "nomic-embed-text");
        assert_eq!(config.vector_index.require_path().unwrap(), Path::new("/tmp/index"));
        assert_eq!(config.llm.base_url, "http://ollama:11434");
        assert_eq!(config.model_name(), "llama3");
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [llm]
            model = "mistral"

            [agent]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model.as_deref(), Some("mistral"));
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.agent.top_k, 5);
        assert_eq!(config.evaluation.workers, 4);
    }

    #[test]
    fn test_blank_model_is_unset() {
        let mut config = RagConfig::default();
        config.llm.model = Some("  ".to_string());
        assert!(config.llm.require_model().is_err());
    }
}
