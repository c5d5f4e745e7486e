//! X11 platform adapters — reference implementation of the ports.
//!
//! - [`hook::X11InputHook`]: XInput2 raw key events for observation plus
//!   `XGrabKey` for the chords that must be consumed.
//! - [`clipboard::XclipClipboard`]: `xclip` subprocess.
//! - [`paste::XdotoolPaste`]: `xdotool key` subprocess.
//!
//! The hook shares one `Arc<RustConnection>` between the engine side
//! (grab/ungrab) and its event thread.

pub mod clipboard;
pub mod hook;
pub mod keymap;
pub mod paste;

use std::ffi::OsStr;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ModMask, Window};
use x11rb::rust_connection::RustConnection;

use super::PlatformError;
use keymap::{KeyboardMap, XK_NUM_LOCK};

/// CapsLock modifier bit (always LockMask).
pub const LOCK_MASK: u16 = 0x0002;

/// Connection state shared by the X11 adapters.
pub struct X11Shared {
    pub conn: Arc<RustConnection>,
    /// Root window of the default screen.
    pub root: Window,
    /// Dynamically detected NumLock modifier mask.
    pub numlock_mask: u16,
    pub keymap: KeyboardMap,
}

impl X11Shared {
    /// Connect to `$DISPLAY` and load the keyboard mapping.
    pub fn connect() -> Result<Self, PlatformError> {
        let (conn, screen_num) = RustConnection::connect(None)
            .map_err(|e| PlatformError::Hook(format!("X11 connect failed: {e}")))?;

        let root = conn.setup().roots[screen_num].root;
        let keymap = KeyboardMap::fetch(&conn)?;
        let numlock_mask = detect_numlock_mask(&conn, &keymap);
        tracing::debug!(
            screen = screen_num,
            numlock_mask = format_args!("0x{numlock_mask:04x}"),
            "connected to X11 display"
        );

        Ok(Self {
            conn: Arc::new(conn),
            root,
            numlock_mask,
            keymap,
        })
    }

    /// Lock-mask combinations a grab must cover: none, CapsLock, NumLock,
    /// both.
    pub fn lock_masks(&self) -> [u16; 4] {
        [
            0,
            LOCK_MASK,
            self.numlock_mask,
            LOCK_MASK | self.numlock_mask,
        ]
    }
}

/// Find the modifier bit NumLock is mapped to.
///
/// Falls back to Mod2, the common default, if the modifier mapping cannot
/// be read or does not contain NumLock.
fn detect_numlock_mask(conn: &RustConnection, keymap: &KeyboardMap) -> u16 {
    let fallback = u16::from(ModMask::M2);

    let reply = match x11rb::protocol::xproto::get_modifier_mapping(conn).map(|c| c.reply()) {
        Ok(Ok(reply)) => reply,
        _ => return fallback,
    };
    let per_modifier = reply.keycodes_per_modifier() as usize;
    if per_modifier == 0 {
        return fallback;
    }

    let numlock_keycodes = keymap.keycodes(XK_NUM_LOCK);

    // 8 rows (Shift, Lock, Control, Mod1..Mod5); row i is bit 1 << i.
    reply
        .keycodes
        .chunks(per_modifier)
        .take(8)
        .position(|row| {
            row.iter()
                .any(|&kc| kc != 0 && numlock_keycodes.contains(&kc))
        })
        .map_or(fallback, |row| 1u16 << row)
}

/// Spawn a thread that polls the X11 connection and forwards every event.
///
/// `poll()` on the connection fd with a 100ms timeout, then drain with
/// `poll_for_event()`. The `stop` flag is checked each iteration.
pub fn spawn_event_thread(
    conn: Arc<RustConnection>,
    stop: Arc<AtomicBool>,
) -> Result<(std::sync::mpsc::Receiver<Event>, JoinHandle<()>), PlatformError> {
    let (tx, rx) = std::sync::mpsc::channel();

    let handle = std::thread::Builder::new()
        .name("x11-events".into())
        .spawn(move || {
            let raw_fd = conn.stream().as_raw_fd();

            while !stop.load(Ordering::Relaxed) {
                // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
                let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
                let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

                match poll(&mut fds, PollTimeout::from(100u16)) {
                    Ok(0) => continue,
                    Ok(_) => loop {
                        match conn.poll_for_event() {
                            Ok(Some(event)) => {
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "X11 connection error");
                                return;
                            }
                        }
                    },
                    Err(nix::Error::EINTR) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "poll error on X11 fd");
                        return;
                    }
                }
            }
        })
        .map_err(|e| PlatformError::Hook(format!("spawn x11 event thread: {e}")))?;

    Ok((rx, handle))
}

/// Helper binaries the adapters shell out to, and what stops working
/// without them.
const HELPER_TOOLS: [(&str, &str); 2] = [
    ("xclip", "clipboard capture and restore"),
    ("xdotool", "paste replay"),
];

/// Warn about missing helper binaries. Their features degrade to no-ops;
/// startup continues.
pub fn warn_missing_tools() {
    let path = std::env::var_os("PATH").unwrap_or_default();
    for (tool, feature) in HELPER_TOOLS {
        if find_on_path(tool, &path).is_none() {
            tracing::warn!(tool, feature, "helper not found on PATH, feature disabled");
        }
    }
}

fn find_on_path(tool: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(tool))
        .find(|candidate| candidate.is_file())
}
