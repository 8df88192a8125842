//! Ollama chat client over the `/api/chat` endpoint.

use super::{ChatReply, CompletionClient, CompletionError};
use crate::session::Turn;
use serde::Serialize;
use std::time::Duration;

/// Where a local Ollama listens by default.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

/// Blocking client for a local Ollama server.
pub struct OllamaClient {
    agent: ureq::Agent,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for `base_url` with an overall per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

impl CompletionClient for OllamaClient {
    fn chat(&self, model: &str, messages: &[Turn]) -> Result<ChatReply, CompletionError> {
        let url = self.chat_url();
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        log::debug!(
            "Ollama request: url={} model={} message_count={}",
            url,
            model,
            messages.len()
        );

        let response = match self.agent.post(&url).send_json(&request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                log::error!("Ollama error response: status={} body={}", code, body);
                return Err(CompletionError::Status {
                    code,
                    body: body.trim().to_string(),
                });
            }
            Err(ureq::Error::Transport(e)) => {
                return Err(CompletionError::Transport(e.to_string()));
            }
        };

        response
            .into_json::<ChatReply>()
            .map_err(|e| CompletionError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request body.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let status = status.to_string();
        let body = body.to_string();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(request_body).unwrap()
        });

        (url, handle)
    }

    fn client(url: &str) -> OllamaClient {
        OllamaClient::new(url, Duration::from_secs(5))
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = client("http://localhost:11434/");
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn chat_sends_model_messages_and_disables_streaming() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hallo!"},"done":true}"#,
        );

        let messages = vec![Turn::system("P"), Turn::user("Hei")];
        let reply = client(&url).chat("llama3.2", &messages).unwrap();
        assert_eq!(reply, ChatReply::new("Hallo!"));

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(sent["model"], "llama3.2");
        assert_eq!(sent["stream"], false);
        assert_eq!(
            sent["messages"],
            serde_json::json!([
                {"role": "system", "content": "P"},
                {"role": "user", "content": "Hei"}
            ])
        );
    }

    #[test]
    fn chat_maps_error_status() {
        let (url, server) = serve_once("404 Not Found", r#"{"error":"model not found"}"#);

        let err = client(&url).chat("missing", &[Turn::user("x")]).unwrap_err();
        server.join().unwrap();

        match err {
            CompletionError::Status { code, body } => {
                assert_eq!(code, 404);
                assert!(body.contains("model not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn chat_rejects_malformed_body() {
        let (url, server) = serve_once("200 OK", r#"{"unexpected":true}"#);

        let err = client(&url).chat("llama3.2", &[Turn::user("x")]).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, CompletionError::Decode(_)));
    }

    #[test]
    fn chat_reports_connection_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = client(&format!("http://127.0.0.1:{port}"))
            .chat("llama3.2", &[Turn::user("x")])
            .unwrap_err();

        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
