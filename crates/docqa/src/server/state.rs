//! Application state for the chat server

use std::sync::Arc;

use crate::agent::ResearchAgent;
use crate::config::RagConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    agent: Arc<ResearchAgent>,
}

impl AppState {
    pub fn new(config: RagConfig, agent: impl Into<Arc<ResearchAgent>>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                agent: agent.into(),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn agent(&self) -> &ResearchAgent {
        &self.inner.agent
    }
}
