//! Errors surfaced by chat operations.

use crate::completion::CompletionError;
use thiserror::Error;

/// Message returned when a chat request carries no text.
pub const NO_MESSAGE_PROVIDED: &str = "No message provided";

#[derive(Error, Debug)]
pub enum ChatError {
    /// The request was missing required input. Nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The completion client failed.
    #[error(transparent)]
    Upstream(#[from] CompletionError),

    /// Anything else that went wrong while serving the request.
    #[error("{0}")]
    Infra(String),
}

impl ChatError {
    /// True when the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }
}
