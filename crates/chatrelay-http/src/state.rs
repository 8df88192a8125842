//! Shared state for the HTTP server.

use chatrelay_core::ChatService;
use std::sync::Arc;

/// Shared state available to all HTTP handlers.
#[derive(Clone)]
pub struct SharedState {
    /// Owns the sessions and the completion client.
    pub chat: Arc<ChatService>,
}

impl SharedState {
    pub fn new(chat: Arc<ChatService>) -> Self {
        Self { chat }
    }
}
