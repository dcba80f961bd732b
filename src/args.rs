use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::Config;

/// Copilot chat sidecar: reads panel messages as JSON lines on stdin and
/// writes panel events as JSON lines on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "copilot-chat", version, about)]
pub struct Cli {
    /// Path to a config.toml file
    #[arg(short = 'c', long, value_name = "PATH", env = "COPILOT_CHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub OAuth token used as the identity session
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Account label reported in status events
    #[arg(long, value_name = "LOGIN", env = "GITHUB_USER")]
    pub login: Option<String>,

    /// Override the default model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Completion API base URL override
    #[arg(long, value_name = "URL", env = "COPILOT_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Debug-level logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file and apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.clone())?;
        if let Some(model) = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            config.default_model = model.to_string();
        }
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        Ok(config)
    }
}
