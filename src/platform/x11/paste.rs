//! Paste replay via `xdotool key`.

use std::process::{Command, Stdio};

use crate::platform::{PasteSynthesizer, PlatformError};
use crate::trigger::chord::NamedKey;
use crate::trigger::{Chord, Key, Modifiers};

/// `PasteSynthesizer` backed by `xdotool`.
///
/// `--clearmodifiers` matters here: quick-select fires while the user
/// still holds the primary modifier, and a stray Alt from the toggle chord
/// would turn the paste into something else.
pub struct XdotoolPaste;

impl XdotoolPaste {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XdotoolPaste {
    fn default() -> Self {
        Self::new()
    }
}

impl PasteSynthesizer for XdotoolPaste {
    fn send_chord(&self, chord: &Chord) -> Result<(), PlatformError> {
        let keyseq = keyseq(chord)
            .ok_or_else(|| PlatformError::Paste(format!("cannot express {chord} for xdotool")))?;

        let status = Command::new("xdotool")
            .args(["key", "--clearmodifiers", &keyseq])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlatformError::PasteUnavailable("xdotool not found".into())
                } else {
                    PlatformError::Paste(e.to_string())
                }
            })?;

        if !status.success() {
            return Err(PlatformError::Paste(format!(
                "xdotool exited with status {status}"
            )));
        }
        Ok(())
    }
}

/// Render a chord in xdotool keysequence syntax, e.g. `ctrl+v`.
fn keyseq(chord: &Chord) -> Option<String> {
    let mut parts: Vec<String> = [
        (Modifiers::CONTROL, "ctrl"),
        (Modifiers::ALT, "alt"),
        (Modifiers::SHIFT, "shift"),
        (Modifiers::SUPER, "super"),
    ]
    .iter()
    .filter(|(m, _)| chord.modifiers.contains(*m))
    .map(|(_, name)| name.to_string())
    .collect();

    let key = match chord.key {
        Key::Char(c) if c.is_ascii_alphanumeric() => c.to_string(),
        Key::Function(n) => format!("F{n}"),
        Key::Named(NamedKey::Return) => "Return".into(),
        Key::Named(NamedKey::Insert) => "Insert".into(),
        _ => return None,
    };
    parts.push(key);
    Some(parts.join("+"))
}
