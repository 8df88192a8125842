//! chatrelay daemon: serves the chat API backed by a local Ollama model.

use chatrelay_core::completion::DEFAULT_OLLAMA_URL;
use chatrelay_core::config::{DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_TIMEOUT};
use chatrelay_core::prompt::PromptError;
use chatrelay_core::{ChatService, OllamaClient, PromptTemplate, RelayConfig};
use chatrelay_http::SharedState;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "chatrelay",
    version,
    about = "Relay chat messages to a local Ollama model"
)]
struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, env = "CHATRELAY_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "CHATRELAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ollama model to chat with
    #[arg(short, long, env = "CHATRELAY_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Timeout for a single model request, in seconds
    #[arg(long, env = "CHATRELAY_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// File holding the system instruction (built-in prompt if omitted)
    #[arg(long, env = "CHATRELAY_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Directory of static files to serve alongside the API
    #[arg(long, env = "CHATRELAY_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Drop the user message from history when the model call fails
    #[arg(long, env = "CHATRELAY_ROLLBACK_ON_ERROR")]
    rollback_on_error: bool,
}

/// Accept `host:port` as well as full URLs, the way Ollama's own `OLLAMA_HOST` does.
fn normalize_ollama_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn build_config(args: Args) -> Result<RelayConfig, PromptError> {
    let prompt = match &args.prompt_file {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::default(),
    };

    Ok(RelayConfig {
        host: args.host,
        port: args.port,
        model: args.model,
        ollama_url: normalize_ollama_url(&args.ollama_url),
        request_timeout: Duration::from_secs(args.timeout_secs),
        prompt,
        static_dir: args.static_dir,
        rollback_on_upstream_error: args.rollback_on_error,
    })
}

/// Ctrl-C, and SIGTERM on unix.
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register the handlers. Must run inside a tokio runtime.
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            )?,
        })
    }

    async fn recv(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result,
                _ = self.terminate.recv() => {
                    log::info!("Received SIGTERM");
                    Ok(())
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await
        }
    }
}

fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let mut signal = ShutdownSignal::install()?;
            signal.recv().await
        })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let prompt_source = args
        .prompt_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = Arc::new(OllamaClient::new(&config.ollama_url, config.request_timeout));
    let service = Arc::new(ChatService::from_config(&config, client));
    let state = Arc::new(SharedState::new(service));

    log::info!("Starting chatrelay...");
    log::info!(
        "Using model {} via {} (system prompt: {})",
        config.model,
        config.ollama_url,
        prompt_source
    );
    log::info!(
        "Make sure Ollama is running with the {} model installed!",
        config.model
    );

    let mut handle = match chatrelay_http::start(
        state,
        &config.host,
        config.port,
        config.static_dir.clone(),
    ) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = wait_for_shutdown_signal() {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }

    handle.stop();
    ExitCode::SUCCESS
}
