//! Per-session state.

use serde::{Deserialize, Serialize};

/// Session id used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message.
///
/// Turns are never edited after creation; a transcript only grows or is
/// replaced wholesale on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation history of one session.
///
/// `epoch` is bumped on every reset so that a turn started before the reset
/// can tell its history is gone.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    epoch: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Remove the last turn if it is a user turn from the current epoch.
    pub fn pop_user(&mut self, epoch: u64) -> Option<Turn> {
        if self.epoch != epoch || self.turns.last().map(|t| t.role) != Some(Role::User) {
            return None;
        }
        self.turns.pop()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.epoch += 1;
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
