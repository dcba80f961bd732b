//! Stdio host adapter.
//!
//! Lets an editor extension run the chat core as a child process: each
//! stdin line is one inbound panel message, each stdout line one outbound
//! panel event. Messages are handled in arrival order on a single worker,
//! which keeps at most one request in flight.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{IdentitySession, SessionProvider};
use crate::panel::ChatPanel;
use crate::protocol::PanelEvent;
use crate::secret::SecretString;

/// Session provider backed by a credential handed over at startup.
///
/// There is no sign-in UI behind it: an interactive request without a
/// configured token simply reports no session.
pub struct StaticSessionProvider {
    session: Option<IdentitySession>,
}

impl StaticSessionProvider {
    pub fn new(access_token: Option<String>, login: Option<String>) -> Self {
        let session = access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|token| IdentitySession {
                access_token: SecretString::new(token),
                account_label: login.unwrap_or_default(),
            });
        Self { session }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn get_session(
        &self,
        interactive: bool,
    ) -> crate::error::Result<Option<IdentitySession>> {
        if self.session.is_none() && interactive {
            warn!("No GitHub token configured; set GITHUB_TOKEN or pass --github-token");
        }
        Ok(self.session.clone())
    }
}

/// Pump panel messages from `input` and panel events to `output` until
/// `input` reaches EOF and every queued message has been handled.
///
/// Returns `output` once all events have been written.
pub async fn run_stdio<R, W>(
    panel: Arc<ChatPanel>,
    events: mpsc::UnboundedReceiver<PanelEvent>,
    mut input: R,
    output: W,
) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let done = CancellationToken::new();
    let writer = tokio::spawn(write_events(events, output, done.clone()));

    let (queue, mut pending) = mpsc::unbounded_channel::<Value>();
    let worker = tokio::spawn(async move {
        while let Some(message) = pending.recv().await {
            panel.handle_message(&message).await;
        }
    });

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = input
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(err) => {
                warn!(error = %err, "Skipping panel message that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(message) => {
                if queue.send(message).is_err() {
                    break;
                }
            }
            Err(err) => warn!(error = %err, "Skipping malformed panel message"),
        }
    }
    debug!("Input closed, draining queued messages");

    drop(queue);
    worker.await.context("Panel worker panicked")?;
    done.cancel();
    writer.await.context("Event writer panicked")?
}

async fn write_events<W>(
    mut events: mpsc::UnboundedReceiver<PanelEvent>,
    mut output: W,
    done: CancellationToken,
) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = done.cancelled() => {
                while let Ok(event) = events.try_recv() {
                    write_line(&mut output, &event).await?;
                }
                break;
            }
        };
        write_line(&mut output, &event).await?;
    }
    output.flush().await.context("Failed to flush stdout")?;
    Ok(output)
}

async fn write_line<W>(output: &mut W, event: &PanelEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(event).context("Failed to encode panel event")?;
    line.push('\n');
    output
        .write_all(line.as_bytes())
        .await
        .context("Failed to write panel event")?;
    output.flush().await.context("Failed to flush stdout")
}
