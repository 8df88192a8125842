//! System instruction handling.
//!
//! The instruction is chosen once at startup and never changes while the
//! server runs. It is prepended to every request sent to the model but is
//! never stored in a session transcript.

use crate::session::Turn;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Instruction used when no prompt file is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful writing assistant. \
Answer in the language the user writes in. \
Be concise, natural and accurate, and do not add explanations or metadata \
unless the user asks for them.";

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to read prompt file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt file is empty: {0}")]
    Empty(PathBuf),
}

/// The system instruction that defines the assistant's persona.
///
/// Cheap to clone; all clones share the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(Arc<str>);

impl PromptTemplate {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// Load an instruction from a UTF-8 text file.
    ///
    /// Leading and trailing whitespace is trimmed. A file with nothing left
    /// after trimming is rejected.
    pub fn from_file(path: &Path) -> Result<Self, PromptError> {
        let text = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PromptError::Empty(path.to_path_buf()));
        }
        Ok(Self::new(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the message list sent to the model: the system turn followed by
    /// the transcript, in order.
    pub fn assemble(&self, transcript: &[Turn]) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Turn::system(self.as_str()));
        messages.extend_from_slice(transcript);
        messages
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}
