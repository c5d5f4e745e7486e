//! Engine startup configuration.
//!
//! Populated from CLI flags (see `cli.rs`); every field has a default so
//! `clipstack daemon` with no flags behaves like the stock build.

use std::time::Duration;

use crate::history::DEFAULT_MAX_ENTRIES;
use crate::trigger::{Chord, ChordError, Modifiers, TriggerBindings};

/// Default toggle chord.
pub const DEFAULT_TOGGLE: &str = "Control+Alt+V";

/// Default primary modifier (copy/cut/paste and quick-select).
pub const DEFAULT_PRIMARY: &str = "Control";

/// Delay between observing copy/cut and reading the clipboard.
///
/// Empirical: applications publish the new selection asynchronously after
/// the key press. This narrows the race but does not close it; a slow
/// application can still leave stale content for us to read.
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_millis(100);

/// Configuration errors, reported before any platform setup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--max-entries must be at least 1")]
    ZeroCapacity,
    #[error("invalid toggle chord: {0}")]
    Toggle(#[from] ChordError),
    #[error("unknown primary modifier: {0:?}")]
    UnknownPrimary(String),
    #[error("toggle chord {0} collides with a quick-select digit")]
    ToggleShadowsQuickSelect(Chord),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum retained history entries.
    pub max_entries: usize,
    pub toggle: Chord,
    pub primary: Modifiers,
    pub capture_delay: Duration,
    /// Replay primary+V after restoring an entry.
    pub paste_on_select: bool,
}

impl EngineConfig {
    /// Build and validate a configuration from raw CLI values.
    pub fn from_args(
        max_entries: usize,
        toggle: &str,
        primary: &str,
        capture_delay_ms: u64,
        paste_on_select: bool,
    ) -> Result<Self, ConfigError> {
        if max_entries == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let toggle: Chord = toggle.parse()?;
        let primary = Modifiers::parse_name(primary.trim())
            .ok_or_else(|| ConfigError::UnknownPrimary(primary.to_string()))?;

        // The hook grabs the toggle permanently and quick-select digits only
        // while the panel is up; one chord cannot be both.
        let bindings = TriggerBindings { toggle, primary };
        if bindings.shadows_quick_select(toggle) {
            return Err(ConfigError::ToggleShadowsQuickSelect(toggle));
        }

        Ok(Self {
            max_entries,
            toggle,
            primary,
            capture_delay: Duration::from_millis(capture_delay_ms),
            paste_on_select,
        })
    }

    pub fn bindings(&self) -> TriggerBindings {
        TriggerBindings {
            toggle: self.toggle,
            primary: self.primary,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            toggle: Chord::new(
                Modifiers::CONTROL | Modifiers::ALT,
                crate::trigger::Key::Char('v'),
            ),
            primary: Modifiers::CONTROL,
            capture_delay: DEFAULT_CAPTURE_DELAY,
            paste_on_select: true,
        }
    }
}
