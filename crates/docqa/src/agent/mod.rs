//! Conversational access to an indexed corpus

pub mod research;
pub mod session;
pub mod stream;

pub use research::ResearchAgent;
pub use session::{ChatEngine, ChatSession};
pub use stream::ChatStream;
