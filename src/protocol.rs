//! Conversation and panel protocol types.
//!
//! Conversation history is kept in the chat-completions encoding
//! (`text`, `refusal`, `image_url`, `file` parts). The structured-input
//! request path converts from it at dispatch time.
//!
//! The panel protocol is a pair of tagged enums: [`PanelRequest`] for
//! messages coming from the host panel and [`PanelEvent`] for messages
//! going back to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attachments::{FileAttachment, ImageAttachment, ImageDetail};

// ── Conversation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Developer => "developer",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One typed fragment of a structured message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Refusal { refusal: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileRef },
    /// Any part type this client does not understand; skipped on dispatch.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(image: &ImageAttachment) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url.clone(),
                detail: Some(image.detail.unwrap_or_default()),
            },
        }
    }

    pub fn file(file: &FileAttachment) -> Self {
        Self::File {
            file: FileRef {
                file_data: Some(file.data.clone()),
                file_id: None,
                filename: file.name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    /// Build the user turn for a send: a plain string when there are no
    /// attachments, otherwise text first (if any), then images, then files.
    pub fn user_with_attachments(
        text: &str,
        images: &[ImageAttachment],
        files: &[FileAttachment],
    ) -> Self {
        if images.is_empty() && files.is_empty() {
            return Self::text(Role::User, text);
        }

        let mut parts = Vec::with_capacity(1 + images.len() + files.len());
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        parts.extend(images.iter().map(ContentPart::image));
        parts.extend(files.iter().map(ContentPart::file));
        Self::parts(Role::User, parts)
    }

    /// Whether this message carries at least one image part.
    pub fn has_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
        }
    }
}

// ── Completion result ───────────────────────────────────────────────────────

/// Which upstream request shape served a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiMode {
    #[serde(rename = "responses")]
    Responses,
    #[serde(rename = "chat.completions")]
    ChatCompletions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReply {
    pub text: String,
    /// Usage/metering block exactly as the API returned it (or null).
    pub usage: Value,
    pub api_mode: ApiMode,
}

// ── Panel protocol ──────────────────────────────────────────────────────────

/// Message from the host panel.
///
/// `send` fields are left as raw JSON: they are untrusted and normalized by
/// the panel, never rejected at decode time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelRequest {
    Ready,
    SignIn,
    Reset,
    Send {
        #[serde(default)]
        text: Value,
        #[serde(default)]
        model: Value,
        #[serde(default)]
        images: Value,
        #[serde(default)]
        files: Value,
    },
}

impl PanelRequest {
    /// Decode an inbound message; unknown or malformed messages yield `None`.
    pub fn decode(raw: &Value) -> Option<Self> {
        serde_json::from_value(raw.clone()).ok()
    }
}

/// Message to the host panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelEvent {
    Status {
        authenticated: bool,
        login: Option<String>,
    },
    Assistant {
        text: String,
        model: String,
        usage: Value,
        #[serde(rename = "apiMode")]
        api_mode: ApiMode,
    },
    Error {
        message: String,
    },
    Cleared,
}
