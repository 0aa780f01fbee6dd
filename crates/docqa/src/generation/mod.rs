//! Prompt construction and citation linking

pub mod citation;
pub mod prompt;

pub use prompt::{PromptBuilder, GREETING, SYSTEM_PROMPT};
