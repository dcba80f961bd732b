//! Completion dispatch.
//!
//! Copilot serves two request shapes. Codex models only accept the
//! structured `/responses` input list; everything else goes through
//! `/chat/completions` with the history as-is. [`CompletionDispatcher`]
//! picks the shape from the model name, attaches the proxy token and the
//! per-request headers, and hands the payload to a [`CompletionTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::auth::TokenAuthority;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::extract::extract_output_text;
use crate::protocol::{ApiMode, ChatMessage, CompletionReply, ContentPart, MessageContent};
use crate::secret::{ExposeSecret, SecretString};

pub const SESSION_ID_HEADER: &str = "Copilot-Session-Id";
pub const TIMEZONE_HEADER: &str = "Copilot-Client-Timezone";
pub const VISION_HEADER: &str = "Copilot-Vision-Request";

/// A fully shaped request ready for the wire.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub mode: ApiMode,
    pub token: SecretString,
    /// Per-request headers, on top of the transport's product headers.
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl UpstreamRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends shaped requests to the completion API and returns the JSON body.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<Value>;
}

/// [`CompletionTransport`] over `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            default_headers: config.headers.clone(),
        }
    }

    fn endpoint(&self, mode: ApiMode) -> String {
        match mode {
            ApiMode::Responses => format!("{}/responses", self.base_url),
            ApiMode::ChatCompletions => format!("{}/chat/completions", self.base_url),
        }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    #[instrument(skip(self, request), fields(mode = ?request.mode))]
    async fn send(&self, request: UpstreamRequest) -> Result<Value> {
        let mut builder = self
            .http
            .post(self.endpoint(request.mode))
            .bearer_auth(request.token.expose_secret());
        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.json(&request.body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Copilot completion request rejected");
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|err| ChatError::InvalidResponse(err.to_string()))
    }
}

pub struct CompletionDispatcher {
    auth: Arc<TokenAuthority>,
    transport: Arc<dyn CompletionTransport>,
    instructions: Option<String>,
}

impl CompletionDispatcher {
    pub fn new(
        auth: Arc<TokenAuthority>,
        transport: Arc<dyn CompletionTransport>,
        config: &Config,
    ) -> Self {
        Self {
            auth,
            transport,
            instructions: config.trimmed_instructions().map(str::to_string),
        }
    }

    pub fn auth(&self) -> &Arc<TokenAuthority> {
        &self.auth
    }

    /// Send the conversation to `model` and extract the reply text.
    #[instrument(skip(self, history, session_id), fields(messages = history.len()))]
    pub async fn send_chat(
        &self,
        model: &str,
        history: &[ChatMessage],
        session_id: &str,
        requires_vision: bool,
    ) -> Result<CompletionReply> {
        let token = self.auth.get_token().await?;

        let mut headers = vec![
            (SESSION_ID_HEADER.to_string(), session_id.to_string()),
            (TIMEZONE_HEADER.to_string(), client_timezone()),
        ];
        if requires_vision {
            headers.push((VISION_HEADER.to_string(), "true".to_string()));
        }

        let (mode, body) = if is_codex_model(model) {
            let body = json!({
                "model": model,
                "input": to_response_input(history),
                "instructions": self.instructions,
                "stream": false,
            });
            (ApiMode::Responses, body)
        } else {
            let mut messages = Vec::with_capacity(history.len() + 1);
            if let Some(instructions) = &self.instructions {
                messages.push(json!({"role": "system", "content": instructions}));
            }
            messages.extend(history.iter().filter_map(|m| serde_json::to_value(m).ok()));
            let body = json!({
                "model": model,
                "messages": messages,
                "stream": false,
            });
            (ApiMode::ChatCompletions, body)
        };

        debug!(?mode, "Dispatching completion request");
        let response = self
            .transport
            .send(UpstreamRequest {
                mode,
                token: SecretString::new(token),
                headers,
                body,
            })
            .await?;

        Ok(CompletionReply {
            text: extract_output_text(&response),
            usage: response.get("usage").cloned().unwrap_or(Value::Null),
            api_mode: mode,
        })
    }
}

/// Codex models are only served through the structured-input endpoint.
pub fn is_codex_model(model: &str) -> bool {
    model.to_lowercase().contains("codex")
}

/// Whether any user turn in the history carries an image.
pub fn requires_vision(history: &[ChatMessage]) -> bool {
    history.iter().any(ChatMessage::has_image)
}

/// Convert chat-completions history into a `/responses` input list.
///
/// String content is kept as-is; part lists are mapped part by part and a
/// message whose parts all drop out is omitted.
pub fn to_response_input(messages: &[ChatMessage]) -> Vec<Value> {
    let mut input = Vec::with_capacity(messages.len());
    for message in messages {
        let role = message.role.as_str();
        match &message.content {
            MessageContent::Text(text) => {
                input.push(json!({"role": role, "content": text}));
            }
            MessageContent::Parts(parts) => {
                let content = to_response_content(parts);
                if !content.is_empty() {
                    input.push(json!({"role": role, "content": content}));
                }
            }
        }
    }
    input
}

fn to_response_content(parts: &[ContentPart]) -> Vec<Value> {
    let mut content = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            ContentPart::Text { text } if !text.trim().is_empty() => {
                content.push(json!({"type": "input_text", "text": text}));
            }
            ContentPart::Refusal { refusal } if !refusal.trim().is_empty() => {
                content.push(json!({"type": "input_text", "text": refusal}));
            }
            ContentPart::ImageUrl { image_url } if !image_url.url.is_empty() => {
                content.push(json!({
                    "type": "input_image",
                    "image_url": image_url.url,
                    "detail": image_url.detail.unwrap_or_default().as_str(),
                }));
            }
            ContentPart::File { file } if file.file_data.is_some() || file.file_id.is_some() => {
                let mut entry = json!({"type": "input_file"});
                if let Some(data) = &file.file_data {
                    entry["file_data"] = json!(data);
                }
                if let Some(id) = &file.file_id {
                    entry["file_id"] = json!(id);
                }
                if let Some(name) = &file.filename {
                    entry["filename"] = json!(name);
                }
                content.push(entry);
            }
            _ => {}
        }
    }
    content
}

/// Zone name from a `TZ` value. File paths (`:/etc/localtime`) name no zone.
fn zone_from_tz(raw: &str) -> Option<String> {
    let tz = raw.trim().trim_start_matches(':');
    (!tz.is_empty() && !tz.starts_with('/')).then(|| tz.to_string())
}

/// IANA zone name of the host, or `UTC` when it cannot be determined.
pub fn client_timezone() -> String {
    if let Some(tz) = std::env::var("TZ").ok().as_deref().and_then(zone_from_tz) {
        return tz;
    }

    std::fs::read_link("/etc/localtime")
        .ok()
        .and_then(|target| {
            let target = target.to_string_lossy().into_owned();
            target
                .split_once("zoneinfo/")
                .map(|(_, zone)| zone.to_string())
        })
        .filter(|zone| !zone.is_empty())
        .unwrap_or_else(|| "UTC".to_string())
}
