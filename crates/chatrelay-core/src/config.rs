//! Runtime configuration.

use crate::completion::DEFAULT_OLLAMA_URL;
use crate::prompt::PromptTemplate;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything needed to run the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server binds to.
    pub host: String,
    pub port: u16,
    /// Model name passed to the completion client.
    pub model: String,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Per-request timeout for the Ollama client.
    pub request_timeout: Duration,
    /// System instruction prepended to every conversation.
    pub prompt: PromptTemplate,
    /// Directory served for `GET /` and other non-API paths.
    pub static_dir: Option<PathBuf>,
    /// Remove the user turn again when the model call fails.
    pub rollback_on_upstream_error: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            prompt: PromptTemplate::default(),
            static_dir: None,
            rollback_on_upstream_error: false,
        }
    }
}
