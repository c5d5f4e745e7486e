//! Selection protocol — restore a history entry into the focused app.
//!
//! Shared by quick-select, panel clicks and the `select` IPC request:
//! promote the entry, put it on the clipboard, hide the panel, then replay
//! the paste chord so it lands in whatever had focus.

use crate::panel::{Presenter, Visibility};
use crate::platform::PlatformError;

use super::state::EngineState;

/// Result of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The entry was promoted and the panel hidden.
    Restored {
        text: String,
        /// Whether the paste chord was delivered.
        pasted: bool,
    },
    /// Index no longer refers to an entry (e.g. history shrank between
    /// render and click). Nothing changed.
    Stale,
}

impl<P: Presenter> EngineState<P> {
    /// Select the entry at `index` (0 = most recent).
    pub fn select(&mut self, index: usize) -> Selection {
        let text = match self.history.select(index) {
            Ok(text) => text.to_string(),
            Err(e) => {
                tracing::debug!(error = %e, "stale selection ignored");
                return Selection::Stale;
            }
        };

        let written = match self.clipboard.write_text(&text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed, skipping paste");
                false
            }
        };

        // Hide before pasting so focus is back on the target application.
        self.set_visibility(Visibility::Hidden);

        let pasted = written && self.paste_on_select && self.replay_paste();
        tracing::info!(index, pasted, "entry selected");

        Selection::Restored { text, pasted }
    }

    fn replay_paste(&self) -> bool {
        let chord = self.bindings.paste_chord();
        match self.paste.send_chord(&chord) {
            Ok(()) => true,
            Err(PlatformError::PasteUnavailable(reason)) => {
                tracing::warn!(%reason, "paste replay unavailable, text left on clipboard");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "paste replay failed");
                false
            }
        }
    }
}
