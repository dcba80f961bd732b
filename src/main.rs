use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use copilot_chat::args::Cli;
use copilot_chat::host::{StaticSessionProvider, run_stdio};
use copilot_chat::logging::{self, LogConfig};
use copilot_chat::panel::{ChatPanel, PanelRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose {
        LogConfig::debug()
    } else {
        LogConfig::from_env()
    });
    let config = cli.resolve_config()?;

    let sessions = Arc::new(StaticSessionProvider::new(
        cli.github_token.clone(),
        cli.login.clone(),
    ));
    let registry = PanelRegistry::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let (panel, _) = registry
        .create_or_show(|| ChatPanel::connect(&config, sessions, tx))
        .await;
    info!(session_id = panel.session_id(), model = %config.default_model, "Chat panel ready");

    // Ctrl+C everywhere, SIGTERM on Unix.
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        on_signal.cancel();
    });
    #[cfg(unix)]
    {
        let on_term = shutdown.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                on_term.cancel();
            }
        });
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tokio::select! {
        result = run_stdio(panel, rx, stdin, stdout) => {
            result?;
            info!("Input closed, shutting down");
        }
        _ = shutdown.cancelled() => {
            info!("Shutdown signal received");
        }
    }
    registry.dispose().await;

    Ok(())
}
