//! Completion clients.
//!
//! A completion client takes an ordered list of role-tagged messages and
//! returns one generated message. The core does not care which model server
//! sits behind it; [`OllamaClient`] is the implementation used in production.

mod ollama;

pub use ollama::{OllamaClient, DEFAULT_OLLAMA_URL};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Turn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Failed to reach model server: {0}")]
    Transport(String),

    #[error("Model server returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    Decode(String),
}

/// The generated message inside a completion reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub content: String,
}

/// A completion reply, shaped like `{ "message": { "content": ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: ReplyMessage,
}

impl ChatReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message: ReplyMessage {
                content: content.into(),
            },
        }
    }
}

/// Something that can turn a conversation into the next assistant message.
///
/// Calls are blocking and may take as long as the model needs; callers on an
/// async runtime should run them on the blocking pool.
pub trait CompletionClient: Send + Sync {
    fn chat(&self, model: &str, messages: &[Turn]) -> Result<ChatReply, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_deserializes_from_nested_shape() {
        let json = r#"{"message": {"role": "assistant", "content": "Hallo!"}, "done": true}"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply, ChatReply::new("Hallo!"));
    }

    #[test]
    fn error_messages_carry_detail() {
        let err = CompletionError::Status {
            code: 404,
            body: "model 'llama3.2' not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Model server returned status 404: model 'llama3.2' not found"
        );

        let err = CompletionError::Transport("Connection refused".to_string());
        assert!(err.to_string().contains("Connection refused"));
    }
}
