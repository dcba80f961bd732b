//! Core of a GitHub Copilot chat panel: proxy-token handling, attachment
//! normalization, completion dispatch and the conversation controller.

pub mod args;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod guards;
pub mod host;
pub mod logging;
pub mod panel;
pub mod protocol;
pub mod secret;

pub use auth::{IdentitySession, SessionProvider, TokenAuthority};
pub use config::Config;
pub use dispatcher::{CompletionDispatcher, CompletionTransport, HttpTransport, UpstreamRequest};
pub use error::{ChatError, Result};
pub use panel::{ChatPanel, PanelRegistry};
pub use protocol::{ChatMessage, PanelEvent, PanelRequest};
