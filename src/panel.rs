//! Conversation controller for one chat panel, plus the registry that owns
//! the live panel.
//!
//! A [`ChatPanel`] holds the in-memory history of one chat session, turns
//! inbound [`PanelRequest`]s into completion calls, and reports results as
//! [`PanelEvent`]s on an unbounded channel. Each panel has its own
//! [`TokenAuthority`] and session id; nothing is shared across panels.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::attachments::{normalize_file_inputs, normalize_image_inputs};
use crate::auth::{SessionProvider, TokenAuthority};
use crate::config::Config;
use crate::dispatcher::{CompletionDispatcher, CompletionTransport, HttpTransport, requires_vision};
use crate::error::ChatError;
use crate::guards::{to_error_message, to_trimmed_string};
use crate::protocol::{ChatMessage, PanelEvent, PanelRequest, Role};

/// Assistant text recorded when the API returns no extractable text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text output returned]";

pub type EventSender = mpsc::UnboundedSender<PanelEvent>;

pub struct ChatPanel {
    dispatcher: CompletionDispatcher,
    default_model: String,
    session_id: String,
    history: Mutex<Vec<ChatMessage>>,
    events: EventSender,
    awaiting_reply: AtomicBool,
    cancel: CancellationToken,
}

impl ChatPanel {
    pub fn new(
        config: &Config,
        auth: Arc<TokenAuthority>,
        transport: Arc<dyn CompletionTransport>,
        events: EventSender,
    ) -> Self {
        Self {
            dispatcher: CompletionDispatcher::new(auth, transport, config),
            default_model: config.default_model.clone(),
            session_id: uuid::Uuid::new_v4().to_string(),
            history: Mutex::new(Vec::new()),
            events,
            awaiting_reply: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Build a panel that talks to the real Copilot endpoints.
    pub fn connect(
        config: &Config,
        sessions: Arc<dyn SessionProvider>,
        events: EventSender,
    ) -> Self {
        let http = reqwest::Client::new();
        let auth = Arc::new(TokenAuthority::new(http.clone(), config, sessions));
        let transport = Arc::new(HttpTransport::new(http, config));
        Self::new(config, auth, transport, events)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Snapshot of the conversation so far.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Close the panel; an in-flight request is abandoned without an event.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            info!(session_id = %self.session_id, "Disposing chat panel");
            self.cancel.cancel();
        }
    }

    /// Handle one raw message from the host panel. Unknown messages are
    /// ignored, as is everything after the panel is disposed.
    pub async fn handle_message(&self, raw: &Value) {
        if self.is_disposed() {
            return;
        }
        let Some(request) = PanelRequest::decode(raw) else {
            debug!("Ignoring unrecognized panel message");
            return;
        };

        match request {
            PanelRequest::Ready => self.send_status(false).await,
            PanelRequest::SignIn => self.send_status(true).await,
            PanelRequest::Reset => self.reset().await,
            PanelRequest::Send {
                text,
                model,
                images,
                files,
            } => self.send(&text, &model, &images, &files).await,
        }
    }

    /// Report whether a GitHub session exists, optionally prompting for one.
    pub async fn send_status(&self, interactive: bool) {
        let event = match self.dispatcher.auth().get_session(interactive).await {
            Ok(session) => PanelEvent::Status {
                authenticated: session.is_some(),
                login: session
                    .map(|s| s.account_label)
                    .filter(|label| !label.is_empty()),
            },
            Err(err) => PanelEvent::Error {
                message: to_error_message(&err),
            },
        };
        self.emit(event);
    }

    /// Drop the whole conversation.
    pub async fn reset(&self) {
        self.history.lock().await.clear();
        self.emit(PanelEvent::Cleared);
    }

    /// Normalize and send one user turn.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn send(&self, text: &Value, model: &Value, images: &Value, files: &Value) {
        let text = to_trimmed_string(Some(text)).unwrap_or_default();
        let images = normalize_image_inputs(images);
        let files = normalize_file_inputs(files);
        if text.is_empty() && images.is_empty() && files.is_empty() {
            debug!("Nothing to send");
            return;
        }

        let model = to_trimmed_string(Some(model)).unwrap_or_else(|| self.default_model.clone());
        let history = {
            let mut history = self.history.lock().await;
            history.push(ChatMessage::user_with_attachments(&text, &images, &files));
            history.clone()
        };

        self.awaiting_reply.store(true, Ordering::SeqCst);
        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ChatError::Cancelled),
            reply = self.dispatcher.send_chat(
                &model,
                &history,
                &self.session_id,
                requires_vision(&history),
            ) => reply,
        };
        self.awaiting_reply.store(false, Ordering::SeqCst);

        match result {
            Ok(reply) => {
                let text = if reply.text.is_empty() {
                    NO_TEXT_PLACEHOLDER.to_string()
                } else {
                    reply.text
                };
                self.history
                    .lock()
                    .await
                    .push(ChatMessage::text(Role::Assistant, text.clone()));
                self.emit(PanelEvent::Assistant {
                    text,
                    model,
                    usage: reply.usage,
                    api_mode: reply.api_mode,
                });
            }
            Err(ChatError::Cancelled) => {
                debug!("Request abandoned: panel disposed");
            }
            Err(err) => {
                warn!(error = %err, "Chat request failed");
                self.emit(PanelEvent::Error {
                    message: to_error_message(&err),
                });
            }
        }
    }

    fn emit(&self, event: PanelEvent) {
        if self.events.send(event).is_err() {
            debug!("Panel event receiver closed");
        }
    }
}

/// Holds at most one live panel per host.
#[derive(Default)]
pub struct PanelRegistry {
    current: Mutex<Option<Arc<ChatPanel>>>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live panel, or build one with `factory`. The flag is
    /// `true` when a new panel was created.
    pub async fn create_or_show<F>(&self, factory: F) -> (Arc<ChatPanel>, bool)
    where
        F: FnOnce() -> ChatPanel,
    {
        let mut current = self.current.lock().await;
        if let Some(panel) = current.as_ref().filter(|p| !p.is_disposed()) {
            return (Arc::clone(panel), false);
        }
        let panel = Arc::new(factory());
        *current = Some(Arc::clone(&panel));
        (panel, true)
    }

    pub async fn current(&self) -> Option<Arc<ChatPanel>> {
        self.current.lock().await.clone()
    }

    /// Dispose and forget the live panel. Returns whether one existed.
    pub async fn dispose(&self) -> bool {
        match self.current.lock().await.take() {
            Some(panel) => {
                panel.dispose();
                true
            }
            None => false,
        }
    }
}
