//! Chat operations: submit a message, reset a conversation.
//!
//! A submit appends the user turn, sends the system instruction plus the
//! whole transcript to the completion client and stores the reply as the
//! assistant turn. Submits on the same session run one at a time; submits
//! on different sessions never wait for each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::completion::CompletionClient;
use crate::config::RelayConfig;
use crate::error::{ChatError, NO_MESSAGE_PROVIDED};
use crate::prompt::PromptTemplate;
use crate::session::{SessionEntry, SessionStore, Turn, DEFAULT_SESSION_ID};

/// Confirmation text returned by a reset.
pub const RESET_CONFIRMATION: &str = "Conversation reset successfully";

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}

/// Owns the session store and drives conversations through a completion client.
pub struct ChatService {
    sessions: SessionStore,
    prompt: PromptTemplate,
    client: Arc<dyn CompletionClient>,
    model: String,
    rollback_on_upstream_error: bool,
}

impl ChatService {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompt: PromptTemplate,
        model: impl Into<String>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            prompt,
            client,
            model: model.into(),
            rollback_on_upstream_error: false,
        }
    }

    pub fn from_config(config: &RelayConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self::new(client, config.prompt.clone(), config.model.clone())
            .with_rollback_on_upstream_error(config.rollback_on_upstream_error)
    }

    /// Remove the user turn again when the completion client fails.
    ///
    /// Off by default: a failed turn leaves the user message in the history.
    pub fn with_rollback_on_upstream_error(mut self, enabled: bool) -> Self {
        self.rollback_on_upstream_error = enabled;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `message` on `session_id` (or the default session) and return the reply.
    pub async fn submit(
        &self,
        session_id: Option<String>,
        message: String,
    ) -> Result<ChatResponse, ChatError> {
        if message.is_empty() {
            return Err(ChatError::Validation(NO_MESSAGE_PROVIDED.to_string()));
        }
        let session_id = session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

        let entry = self.sessions.entry(&session_id);
        let _turn = entry.lock_turn().await;

        log::debug!("Session {} user: {}", session_id, message);
        let (transcript, epoch) = entry.push_and_snapshot(Turn::user(message));
        let messages = self.prompt.assemble(&transcript);

        let client = Arc::clone(&self.client);
        let model = self.model.clone();
        let outcome = tokio::task::spawn_blocking(move || client.chat(&model, &messages)).await;

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                log::error!("Completion failed for session {}: {}", session_id, e);
                self.abandon_turn(&entry, &session_id, epoch);
                return Err(ChatError::Upstream(e));
            }
            Err(e) => {
                log::error!("Completion task failed for session {}: {}", session_id, e);
                self.abandon_turn(&entry, &session_id, epoch);
                return Err(ChatError::Infra(format!("Completion task failed: {}", e)));
            }
        };

        let content = reply.message.content;
        log::debug!("Session {} assistant: {}", session_id, content);
        if !entry.push_if_current(epoch, Turn::assistant(content.clone())) {
            log::warn!(
                "Session {} was reset while waiting for the model; reply not stored",
                session_id
            );
        }

        Ok(ChatResponse {
            response: content,
            session_id,
        })
    }

    /// Clear `session_id` (or the default session). Always succeeds.
    pub fn reset(&self, session_id: Option<String>) -> ResetResponse {
        let session_id = session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
        self.sessions.reset(&session_id);
        ResetResponse {
            message: RESET_CONFIRMATION.to_string(),
        }
    }

    /// Release all sessions. Called when the server stops.
    pub fn shutdown(&self) {
        self.sessions.shutdown();
    }

    fn abandon_turn(&self, entry: &SessionEntry, session_id: &str, epoch: u64) {
        if self.rollback_on_upstream_error && entry.discard_user_turn(epoch) {
            log::info!("Rolled back unanswered user turn in session {}", session_id);
        }
    }
}
