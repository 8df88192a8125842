//! # chatrelay-core
//!
//! Core logic for chatrelay, a small HTTP relay between a chat front-end and
//! a local Ollama server.
//!
//! This crate knows nothing about HTTP. It provides:
//! - **SessionStore**: per-session conversation transcripts
//! - **PromptTemplate**: the fixed system instruction and prompt assembly
//! - **CompletionClient**: the model backend, with an Ollama implementation
//! - **ChatService**: the submit and reset operations built from the above

pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod prompt;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use chat::{ChatResponse, ChatService, ResetResponse};
pub use completion::{ChatReply, CompletionClient, CompletionError, OllamaClient};
pub use config::RelayConfig;
pub use error::ChatError;
pub use prompt::PromptTemplate;
pub use session::{Role, SessionStore, Turn};
