//! X11 clipboard via `xclip`.
//!
//! Synchronous `std::process::Command` calls; both directions complete in
//! a few milliseconds, which the engine loop tolerates.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::platform::{ClipboardPort, PlatformError};

/// `ClipboardPort` backed by `xclip -selection clipboard`.
pub struct XclipClipboard;

impl XclipClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XclipClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardPort for XclipClipboard {
    /// Requests the `UTF8_STRING` target so image or file clipboards read
    /// as "no text" instead of garbage.
    fn read_text(&self) -> Option<String> {
        let output = Command::new("xclip")
            .args(["-selection", "clipboard", "-o", "-t", "UTF8_STRING"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => String::from_utf8(output.stdout).ok(),
            Ok(output) => {
                tracing::debug!(status = %output.status, "xclip -o reported no text");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn xclip -o");
                None
            }
        }
    }

    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        let mut child = Command::new("xclip")
            .args(["-selection", "clipboard"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlatformError::Clipboard(format!("failed to spawn xclip: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| PlatformError::Clipboard(format!("failed to write to xclip: {e}")))?;
            // Dropping stdin closes the pipe so xclip can take ownership.
        }

        let status = child
            .wait()
            .map_err(|e| PlatformError::Clipboard(format!("failed to wait for xclip: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(PlatformError::Clipboard(format!(
                "xclip exited with status {status}"
            )))
        }
    }
}
