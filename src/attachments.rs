//! Attachment normalization.
//!
//! The panel sends attachment arrays as loosely typed JSON. These functions
//! keep the well-formed entries and silently drop the rest, so one bad
//! attachment never fails a whole send.
//!
//! File payloads are canonicalized to data URLs: a payload without a
//! `data:` prefix gets `data:<mime>;base64,` prepended, using the declared
//! type or `application/octet-stream`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::guards::{as_record, to_number, to_trimmed_string};

const IMAGE_DATA_URL_PREFIX: &str = "data:image/";
const DEFAULT_FILE_MIME: &str = "application/octet-stream";

/// Vision detail hint accepted by the completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    #[default]
    Auto,
}

impl ImageDetail {
    /// Exact match on `low`, `high` or `auto`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "high" => Some(Self::High),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data_url: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<f64>,
    pub detail: Option<ImageDetail>,
}

impl ImageAttachment {
    fn bare(data_url: String) -> Self {
        Self {
            data_url,
            name: None,
            mime_type: None,
            size: None,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Payload as a `data:<mime>;base64,...` URL.
    pub data: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<f64>,
}

/// Keep only entries that describe a usable image.
pub fn normalize_image_inputs(value: &Value) -> Vec<ImageAttachment> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(normalize_image).collect()
}

fn normalize_image(item: &Value) -> Option<ImageAttachment> {
    if let Some(raw) = item.as_str() {
        return raw
            .starts_with(IMAGE_DATA_URL_PREFIX)
            .then(|| ImageAttachment::bare(raw.to_string()));
    }

    let record = as_record(item)?;
    let data_url = to_trimmed_string(record.get("dataUrl"))
        .filter(|url| url.starts_with(IMAGE_DATA_URL_PREFIX))?;

    Some(ImageAttachment {
        data_url,
        name: to_trimmed_string(record.get("name")),
        mime_type: to_trimmed_string(record.get("type")),
        size: to_number(record.get("size")),
        detail: to_trimmed_string(record.get("detail")).and_then(|d| ImageDetail::parse(&d)),
    })
}

/// Keep only entries with a non-empty payload, canonicalized to a data URL.
pub fn normalize_file_inputs(value: &Value) -> Vec<FileAttachment> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(normalize_file).collect()
}

fn normalize_file(item: &Value) -> Option<FileAttachment> {
    let record = as_record(item)?;
    let payload = to_trimmed_string(record.get("data"))
        .or_else(|| to_trimmed_string(record.get("file_data")))?;
    let mime_type = to_trimmed_string(record.get("type"));

    Some(FileAttachment {
        data: ensure_data_url(payload, mime_type.as_deref()),
        name: to_trimmed_string(record.get("name")),
        mime_type,
        size: to_number(record.get("size")),
    })
}

fn ensure_data_url(payload: String, mime_type: Option<&str>) -> String {
    if payload.starts_with("data:") {
        return payload;
    }
    let mime = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_FILE_MIME);
    format!("data:{};base64,{}", mime, payload)
}
