//! Conversation sessions.
//!
//! A session is just a named transcript. Sessions are created on first use
//! and live for the lifetime of the process.

mod state;
mod store;

pub use state::{Role, Transcript, Turn, DEFAULT_SESSION_ID};
pub use store::{SessionEntry, SessionStore};
