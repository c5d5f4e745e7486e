//! Engine state — history, panel visibility and the ports they drive.
//!
//! All methods run on the engine loop. Nothing here does async I/O or
//! scheduling; the loop owns timers (see `engine::run`).

use crate::config::EngineConfig;
use crate::history::{CaptureOutcome, HistoryStore};
use crate::panel::{PanelView, Presenter, Visibility};
use crate::platform::{ClipboardPort, PasteSynthesizer};
use crate::trigger::{self, KeyEvent, QUICK_SELECT_SLOTS, Trigger, TriggerBindings};

/// Platform ports the engine writes through.
pub struct Ports {
    pub clipboard: Box<dyn ClipboardPort>,
    pub paste: Box<dyn PasteSynthesizer>,
}

/// Owned exclusively by the engine loop.
pub struct EngineState<P> {
    pub(super) history: HistoryStore,
    pub(super) visibility: Visibility,
    pub(super) bindings: TriggerBindings,
    pub(super) paste_on_select: bool,
    pub(super) clipboard: Box<dyn ClipboardPort>,
    pub(super) paste: Box<dyn PasteSynthesizer>,
    pub(super) presenter: P,
}

impl<P: Presenter> EngineState<P> {
    pub fn new(config: &EngineConfig, ports: Ports, presenter: P) -> Self {
        Self {
            history: HistoryStore::new(config.max_entries),
            visibility: Visibility::Hidden,
            bindings: config.bindings(),
            paste_on_select: config.paste_on_select,
            clipboard: ports.clipboard,
            paste: ports.paste,
            presenter,
        }
    }

    /// Classify a hook event and apply toggle/select immediately.
    ///
    /// `Trigger::Capture` is returned to the caller, which schedules the
    /// debounced clipboard read.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Trigger {
        let trigger = trigger::classify(event, &self.bindings, self.visibility, self.history.len());
        match trigger {
            Trigger::Toggle => {
                self.toggle();
            }
            Trigger::Select(index) => {
                self.select(index);
            }
            Trigger::Capture | Trigger::Ignore => {}
        }
        trigger
    }

    /// Read the clipboard and record it.
    ///
    /// `None` if the clipboard holds no text, which is not an error.
    pub fn capture_clipboard(&mut self) -> Option<CaptureOutcome> {
        let Some(text) = self.clipboard.read_text() else {
            tracing::debug!("clipboard holds no text, capture skipped");
            return None;
        };
        Some(self.capture_text(&text))
    }

    /// Record `text` in history, re-rendering if the panel is up.
    pub fn capture_text(&mut self, text: &str) -> CaptureOutcome {
        let outcome = self.history.capture(text);
        tracing::debug!(
            outcome = outcome.as_str(),
            entries = self.history.len(),
            capacity = self.history.capacity(),
            "capture"
        );
        if outcome == CaptureOutcome::Inserted && self.visibility.is_visible() {
            self.render();
        }
        outcome
    }

    /// Flip visibility. Showing renders the current snapshot.
    pub fn toggle(&mut self) -> Visibility {
        self.set_visibility(self.visibility.toggled());
        self.visibility
    }

    /// Hide the panel (focus loss, outside click, explicit dismiss).
    pub fn dismiss(&mut self) -> Visibility {
        self.set_visibility(Visibility::Hidden);
        self.visibility
    }

    pub(super) fn set_visibility(&mut self, visibility: Visibility) {
        if self.visibility == visibility {
            return;
        }
        self.visibility = visibility;
        tracing::info!(visible = visibility.is_visible(), "panel visibility changed");
        self.render();
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.history.snapshot()
    }

    /// Current view for presenters.
    pub fn view(&self) -> PanelView {
        PanelView::from_entries(self.visibility, self.history.entries())
    }

    /// Number of quick-select chords that should be intercepted right now.
    pub fn quick_select_slots(&self) -> usize {
        if !self.visibility.is_visible() || self.history.is_empty() {
            return 0;
        }
        self.history.len().min(QUICK_SELECT_SLOTS)
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn render(&mut self) {
        let view = self.view();
        self.presenter.render(&view);
    }
}
