//! Platform ports — clipboard, input hook, paste replay.
//!
//! Everything OS-specific sits behind these three traits. The engine only
//! talks to the traits; adapters are composed once at startup. The X11
//! adapters in [`x11`] are the reference implementation.

pub mod x11;

#[cfg(test)]
pub mod fake;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::trigger::{Chord, KeyEvent, TriggerBindings};

/// Errors returned by platform adapters.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Input hook installation or grab management failed (no display,
    /// missing input extension, toggle chord held by another client).
    #[error("input hook: {0}")]
    Hook(String),

    /// Clipboard read/write failed (e.g. xclip missing, pipe error).
    #[error("clipboard: {0}")]
    Clipboard(String),

    /// Keystroke synthesis is not possible on this system.
    #[error("paste replay unavailable: {0}")]
    PasteUnavailable(String),

    /// Keystroke synthesis was attempted and failed.
    #[error("paste replay failed: {0}")]
    Paste(String),
}

/// Reads and writes plain text on the system clipboard.
///
/// `Send` is required because the engine loop may run inside a spawned
/// tokio task.
pub trait ClipboardPort: Send {
    /// Current clipboard text, or `None` if the clipboard is empty, holds
    /// non-text content, or cannot be read.
    fn read_text(&self) -> Option<String>;

    /// Replace the clipboard contents with `text`.
    fn write_text(&self, text: &str) -> Result<(), PlatformError>;
}

/// Synthesizes a key chord into the focused application.
pub trait PasteSynthesizer: Send {
    fn send_chord(&self, chord: &Chord) -> Result<(), PlatformError>;
}

/// System-wide key observation with selective interception.
///
/// Events arrive on the returned channel from a platform thread; the
/// engine never touches its state from that thread. Which events are
/// consumed (withheld from the focused application) is declared up front:
/// the toggle chord always, plus quick-select chords while armed.
pub trait InputHook: Send {
    /// Start observing key events and intercept the toggle chord.
    ///
    /// Fails if the process cannot access global input at all; there is no
    /// degraded mode.
    fn install(
        &mut self,
        bindings: &TriggerBindings,
    ) -> Result<UnboundedReceiver<KeyEvent>, PlatformError>;

    /// Intercept quick-select chords for the first `slots` history entries
    /// and release the rest. `0` releases all of them.
    fn arm_quick_select(&mut self, slots: usize) -> Result<(), PlatformError>;

    /// Release every interception and stop delivering events.
    fn uninstall(&mut self);
}
