//! Clipboard-history daemon — the serialized engine loop.
//!
//! Architecture: channel-based actor. A single loop owns all mutable state
//! ([`state::EngineState`]). Input-hook events arrive on a channel from the
//! platform thread, IPC connection tasks forward requests with a oneshot
//! reply, and debounced capture reads come back as timer completions. Every
//! mutation therefore happens in arrival order on one task.
//!
//! After each event the loop re-declares which quick-select chords the
//! hook should intercept, so digits are only consumed while the panel is
//! visible and an entry exists for them.

mod connection;
mod fanout;
mod handler;
pub mod selection;
pub mod state;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use connection::{ConnectionId, DisconnectNotice, EngineCommand};
use fanout::FanoutPresenter;
use state::{EngineState, Ports};

use crate::config::EngineConfig;
use crate::ipc::protocol::Message;
use crate::platform::x11::X11Shared;
use crate::platform::x11::clipboard::XclipClipboard;
use crate::platform::x11::hook::X11InputHook;
use crate::platform::x11::paste::XdotoolPaste;
use crate::platform::{InputHook, PlatformError};
use crate::trigger::Trigger;

/// Daemon startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("$XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("clipstack already running at {0}")]
    AlreadyRunning(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    MkdirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("input hook stopped delivering events")]
    HookClosed,
}

/// Run the daemon until SIGTERM or SIGINT.
///
/// # Errors
///
/// Returns `EngineError` if `$XDG_RUNTIME_DIR` is unset, another daemon
/// owns the socket, the X display is unreachable, or the input hook cannot
/// be installed.
pub async fn run(config: EngineConfig) -> Result<(), EngineError> {
    let socket_path = resolve_socket_path()?;
    let shared = X11Shared::connect()?;
    let listener = bind_socket(&socket_path).await?;
    tracing::info!(path = %socket_path.display(), "daemon listening");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
    };

    crate::platform::x11::warn_missing_tools();
    let ports = Ports {
        clipboard: Box::new(XclipClipboard::new()),
        paste: Box::new(XdotoolPaste::new()),
    };
    let mut hook = X11InputHook::new(shared);
    let result = serve(&config, ports, &mut hook, listener, shutdown).await;
    hook.uninstall();

    if let Err(e) = std::fs::remove_file(&socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "failed to remove socket");
    }
    tracing::info!("daemon stopped");
    result
}

/// Install the hook and run the engine loop until `shutdown` resolves.
///
/// The caller owns hook teardown and socket removal.
async fn serve<H: InputHook>(
    config: &EngineConfig,
    ports: Ports,
    hook: &mut H,
    listener: UnixListener,
    shutdown: impl Future<Output = ()>,
) -> Result<(), EngineError> {
    let mut hook_rx = hook.install(&config.bindings())?;
    tracing::info!(
        toggle = %config.toggle,
        primary = %config.primary,
        max_entries = config.max_entries,
        "input hook installed"
    );

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<EngineCommand>();
    let (disconnect_tx, mut disconnect_rx) = mpsc::unbounded_channel::<DisconnectNotice>();
    let (due_tx, mut due_rx) = mpsc::unbounded_channel::<()>();

    // Per-connection push channels, handed to the presenter on subscribe.
    let mut push_senders: HashMap<ConnectionId, mpsc::UnboundedSender<Message>> = HashMap::new();

    let mut engine = EngineState::new(config, ports, FanoutPresenter::new());
    let mut armed = 0;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // -- New connection --
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        accept_connection(stream, &cmd_tx, &disconnect_tx, &mut push_senders);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }

            // -- Key event from the input hook --
            event = hook_rx.recv() => {
                let Some(event) = event else {
                    return Err(EngineError::HookClosed);
                };
                let trigger = engine.handle_key(&event);
                if trigger != Trigger::Ignore {
                    tracing::debug!(?trigger, consumed = trigger.consumes(), "trigger");
                }
                if trigger == Trigger::Capture {
                    schedule_capture(&due_tx, config.capture_delay);
                }
            }

            // -- Debounced capture is due --
            Some(()) = due_rx.recv() => {
                engine.capture_clipboard();
            }

            // -- Request from connection task --
            Some(cmd) = cmd_rx.recv() => {
                let (response, subscribe) =
                    handler::handle_message(&mut engine, cmd.request, cmd.connection_id);
                let _ = cmd.response_tx.send(response);

                if let Some(action) = subscribe
                    && let Some(tx) = push_senders.get(&action.connection_id)
                {
                    let view = engine.view();
                    engine
                        .presenter_mut()
                        .subscribe(action.connection_id, tx.clone(), &view);
                }
            }

            // -- Connection disconnected --
            Some(notice) = disconnect_rx.recv() => {
                let conn_id = notice.connection_id;
                push_senders.remove(&conn_id);
                engine.presenter_mut().unsubscribe(conn_id);
                tracing::debug!(?conn_id, "connection cleaned up");
            }

            // -- Shutdown --
            () = &mut shutdown => break,
        }

        sync_quick_select(hook, &engine, &mut armed);
    }

    hook.arm_quick_select(0)?;
    Ok(())
}

/// Read the clipboard after `delay`. Each copy key gets its own timer;
/// rapid repeats produce repeated reads, which head-dedup absorbs.
fn schedule_capture(due_tx: &mpsc::UnboundedSender<()>, delay: Duration) {
    let due_tx = due_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = due_tx.send(());
    });
}

/// Align the hook's quick-select grabs with the engine state.
fn sync_quick_select<H: InputHook, P: crate::panel::Presenter>(
    hook: &mut H,
    engine: &EngineState<P>,
    armed: &mut usize,
) {
    let slots = engine.quick_select_slots();
    if slots == *armed {
        return;
    }
    if let Err(e) = hook.arm_quick_select(slots) {
        tracing::warn!(error = %e, slots, "failed to update quick-select interception");
    }
    *armed = slots;
}

/// Accept a new connection — create its push channel and spawn its task.
fn accept_connection(
    stream: UnixStream,
    cmd_tx: &mpsc::UnboundedSender<EngineCommand>,
    disconnect_tx: &mpsc::UnboundedSender<DisconnectNotice>,
    push_senders: &mut HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
) {
    let conn_id = ConnectionId::new();
    let (push_tx, push_rx) = mpsc::unbounded_channel();
    push_senders.insert(conn_id, push_tx);

    connection::spawn_connection(
        stream,
        conn_id,
        cmd_tx.clone(),
        push_rx,
        disconnect_tx.clone(),
    );

    tracing::debug!(?conn_id, "accepted connection");
}

// -- Socket setup --

/// Resolve the daemon socket path from `$XDG_RUNTIME_DIR`.
pub fn resolve_socket_path() -> Result<PathBuf, EngineError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").map_err(|_| EngineError::NoRuntimeDir)?;
    Ok(PathBuf::from(runtime_dir)
        .join("clipstack")
        .join("daemon.sock"))
}

/// Create the socket directory (mode 0700) and bind the listener.
///
/// On `EADDRINUSE` the existing socket is probed: a live peer means
/// another daemon is running, otherwise the stale file is replaced.
async fn bind_socket(path: &Path) -> Result<UnixListener, EngineError> {
    let parent = path.parent().ok_or_else(|| EngineError::BindFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "socket path has no parent"),
    })?;
    let mkdir_failed = |source| EngineError::MkdirFailed {
        path: parent.to_path_buf(),
        source,
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(mkdir_failed)?;
    }
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
            .map_err(mkdir_failed)?;
    }

    let bind_failed = |source| EngineError::BindFailed {
        path: path.to_path_buf(),
        source,
    };
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(EngineError::AlreadyRunning(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path).map_err(bind_failed)?;
            UnixListener::bind(path).map_err(bind_failed)
        }
        Err(e) => Err(bind_failed(e)),
    }
}
