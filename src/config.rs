use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const COPILOT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";
pub const COPILOT_API_BASE_URL: &str = "https://api.githubcopilot.com";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Product headers GitHub's Copilot endpoints expect from an editor client.
pub const BASE_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "GitHubCopilotChat/0.26.7"),
    ("Editor-Version", "vscode/1.99.3"),
    ("Openai-Intent", "conversation-edits"),
    ("X-Initiator", "user"),
    ("Editor-Plugin-Version", "copilot-chat/0.26.7"),
    ("Copilot-Integration-Id", "vscode-chat"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Copilot proxy-token exchange endpoint
    pub token_url: String,
    /// Base URL of the completion API
    pub api_base_url: String,
    /// Model used when a send request names none
    pub default_model: String,
    /// System instructions sent with every request (blank disables them)
    pub instructions: String,
    /// Product headers attached to token and completion requests
    pub headers: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_url: COPILOT_TOKEN_URL.to_string(),
            api_base_url: COPILOT_API_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            headers: BASE_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl Config {
    /// Default location: `~/.copilot-chat/config.toml`.
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".copilot-chat").join("config.toml")
    }

    /// Load configuration from file, falling back to built-in defaults when
    /// the file does not exist. Missing keys take their default values.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Trimmed instructions, or `None` when blank.
    pub fn trimmed_instructions(&self) -> Option<&str> {
        let trimmed = self.instructions.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
