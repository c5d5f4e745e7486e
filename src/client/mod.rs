//! CLI client for daemon operations.
//!
//! One-shot commands connect, perform a single request, print the result
//! and exit. `watch` subscribes and prints panel pushes until the daemon
//! goes away, which makes it a minimal text presenter.

mod daemon_client;
mod format;

use crate::cli::ClientAction;
use daemon_client::DaemonClient;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon: {0}")]
    Daemon(String),
    #[error(transparent)]
    Engine(#[from] crate::engine::EngineError),
}

/// Run the client command. Called from `main.rs` for `Command::Client`.
pub async fn run(action: ClientAction) -> Result<(), ClientError> {
    let socket_path = crate::engine::resolve_socket_path()?;
    let mut daemon = DaemonClient::connect_to(&socket_path).await?;

    match action {
        ClientAction::List => {
            let listing = daemon.list_history().await?;
            format::print_history(&listing);
        }
        ClientAction::Select { index } => {
            let text = daemon.select(index).await?;
            format::print_selected(index, text.as_deref());
        }
        ClientAction::Toggle => {
            let visible = daemon.toggle().await?;
            format::print_visibility(visible);
        }
        ClientAction::Dismiss => {
            let visible = daemon.dismiss().await?;
            format::print_visibility(visible);
        }
        ClientAction::Capture => {
            let outcome = daemon.capture().await?;
            format::print_capture(&outcome);
        }
        ClientAction::Watch => {
            daemon.subscribe().await?;
            while let Some(update) = daemon.next_panel().await? {
                format::print_panel(&update);
            }
            tracing::info!("daemon closed the connection");
        }
    }

    Ok(())
}
