//! Core types for the document QA system

pub mod document;
pub mod response;

pub use document::*;
pub use response::*;
