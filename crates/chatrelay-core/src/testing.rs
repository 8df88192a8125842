//! Deterministic completion client for tests.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for downstream crates.

use crate::completion::{ChatReply, CompletionClient, CompletionError};
use crate::session::{Role, Turn};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One recorded call to [`ScriptedClient::chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<Turn>,
}

#[derive(Debug)]
enum Step {
    Respond(Result<ChatReply, CompletionError>),
    Panic(String),
}

/// Replays queued results in order, then falls back to echoing the last user
/// message as `echo: <text>`.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Step::Respond(Ok(ChatReply::new(content))))
    }

    /// Queue a failure.
    pub fn fail(self, error: CompletionError) -> Self {
        self.push(Step::Respond(Err(error)))
    }

    /// Queue a call that panics with `message`.
    pub fn panic(self, message: impl Into<String>) -> Self {
        self.push(Step::Panic(message.into()))
    }

    fn push(self, step: Step) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CompletionClient for ScriptedClient {
    fn chat(&self, model: &str, messages: &[Turn]) -> Result<ChatReply, CompletionError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                model: model.to_string(),
                messages: messages.to_vec(),
            });

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match scripted {
            Some(Step::Respond(result)) => result,
            Some(Step::Panic(message)) => panic!("{message}"),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|t| t.role == Role::User)
                    .map(|t| t.content.as_str())
                    .unwrap_or_default();
                Ok(ChatReply::new(format!("echo: {last_user}")))
            }
        }
    }
}
