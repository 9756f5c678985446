//! # Chat-completions client
//!
//! Implements the core [`Converter`] trait against an OpenAI-compatible
//! `chat/completions` endpoint (LM Studio, Ollama). One POST per file, no
//! streaming, no retries.
//!
//! The request carries a system message, a user message, the temperature and
//! `stream: false`. `max_tokens` and `model` are only sent when configured.
//! The Markdown is taken verbatim from `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use txt2md_core::config::RunSettings;
use txt2md_core::contract::{ConversionError, Converter};

/// Longest slice of a response body kept in error messages.
const BODY_SNIPPET_LEN: usize = 500;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// HTTP converter. Cheap to clone; the inner client pools connections.
#[derive(Debug, Clone, Default)]
pub struct ChatClient {
    http: Client,
}

impl ChatClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        return body.to_string();
    }
    let mut end = BODY_SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

fn transport_error(e: reqwest::Error, settings: &RunSettings) -> ConversionError {
    if e.is_timeout() {
        ConversionError::Timeout {
            secs: settings.endpoint.timeout.as_secs(),
        }
    } else if e.is_connect() {
        ConversionError::Connect {
            url: settings.endpoint.api_url.clone(),
            message: describe(&e),
        }
    } else {
        ConversionError::Request(describe(&e))
    }
}

/// The error's own message followed by its innermost cause
/// ("Connection refused", DNS failures).
fn describe(e: &(dyn std::error::Error + 'static)) -> String {
    let mut root = e;
    while let Some(next) = root.source() {
        root = next;
    }
    let top = e.to_string();
    let cause = root.to_string();
    if top.contains(&cause) {
        top
    } else {
        format!("{top}: {cause}")
    }
}

/// Pulls the Markdown out of a successful response body.
fn extract_content(body: &str) -> Result<String, ConversionError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        ConversionError::MalformedResponse(format!("invalid JSON ({e}): {}", snippet(body)))
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            ConversionError::MalformedResponse(format!(
                "missing choices[0].message.content: {}",
                snippet(body)
            ))
        })
}

#[async_trait]
impl Converter for ChatClient {
    async fn convert(&self, text: &str, settings: &RunSettings) -> Result<String, ConversionError> {
        let endpoint = &settings.endpoint;
        let user_content = endpoint.user_content(text);
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &endpoint.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
            temperature: endpoint.temperature,
            stream: false,
            max_tokens: endpoint.max_tokens,
            model: endpoint.model(),
        };

        debug!(
            api_url = %endpoint.api_url,
            model = ?request.model,
            chars = user_content.chars().count(),
            "Sending chat-completions request"
        );

        let mut builder = self
            .http
            .post(&endpoint.api_url)
            .timeout(endpoint.timeout)
            .json(&request);
        if let Some(key) = endpoint.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                let err = transport_error(e, settings);
                error!(error = %err, api_url = %endpoint.api_url, "Chat-completions request failed");
                return Err(err);
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let err = transport_error(e, settings);
            error!(error = %err, "Failed to read chat-completions response body");
            err
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %snippet(&body), "Endpoint returned an error status");
            return Err(ConversionError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        match extract_content(&body) {
            Ok(markdown) => {
                info!(chars = markdown.chars().count(), "Received Markdown from endpoint");
                Ok(markdown)
            }
            Err(e) => {
                error!(error = %e, "Unexpected chat-completions response shape");
                Err(e)
            }
        }
    }
}
