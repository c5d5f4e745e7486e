//! In-memory port implementations for tests.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{ClipboardPort, InputHook, PasteSynthesizer, PlatformError};
use crate::panel::{PanelView, Presenter};
use crate::trigger::{Chord, KeyEvent, TriggerBindings};

/// Clipboard backed by a shared string. Clones share state.
#[derive(Clone, Default)]
pub struct FakeClipboard {
    contents: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate another application copying `text`.
    pub fn set(&self, text: &str) {
        *self.contents.lock().unwrap() = Some(text.to_string());
    }

    pub fn clear(&self) {
        *self.contents.lock().unwrap() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

impl ClipboardPort for FakeClipboard {
    fn read_text(&self) -> Option<String> {
        self.get()
    }

    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(PlatformError::Clipboard("write refused".into()));
        }
        self.set(text);
        Ok(())
    }
}

/// Records synthesized chords, or refuses them when unavailable.
#[derive(Clone, Default)]
pub struct FakePaste {
    sent: Arc<Mutex<Vec<Chord>>>,
    unavailable: bool,
}

impl FakePaste {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            sent: Arc::default(),
            unavailable: true,
        }
    }

    pub fn sent(&self) -> Vec<Chord> {
        self.sent.lock().unwrap().clone()
    }
}

impl PasteSynthesizer for FakePaste {
    fn send_chord(&self, chord: &Chord) -> Result<(), PlatformError> {
        if self.unavailable {
            return Err(PlatformError::PasteUnavailable("no permission".into()));
        }
        self.sent.lock().unwrap().push(*chord);
        Ok(())
    }
}

/// Input hook fed by a test-held sender.
pub struct FakeHook {
    tx: Option<UnboundedSender<KeyEvent>>,
    rx: Option<UnboundedReceiver<KeyEvent>>,
    armed: Arc<Mutex<Vec<usize>>>,
    refuse_install: bool,
}

impl FakeHook {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
            armed: Arc::default(),
            refuse_install: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse_install: true,
            ..Self::new()
        }
    }

    /// Sender used by the test to inject key events. Dropping every
    /// sender simulates the hook thread dying.
    pub fn take_sender(&mut self) -> UnboundedSender<KeyEvent> {
        self.tx.take().expect("sender already taken")
    }

    /// Shared log of `arm_quick_select` calls.
    pub fn armed_log(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.armed)
    }
}

impl InputHook for FakeHook {
    fn install(
        &mut self,
        _bindings: &TriggerBindings,
    ) -> Result<UnboundedReceiver<KeyEvent>, PlatformError> {
        if self.refuse_install {
            return Err(PlatformError::Hook("access denied".into()));
        }
        self.rx
            .take()
            .ok_or_else(|| PlatformError::Hook("already installed".into()))
    }

    fn arm_quick_select(&mut self, slots: usize) -> Result<(), PlatformError> {
        self.armed.lock().unwrap().push(slots);
        Ok(())
    }

    fn uninstall(&mut self) {
        self.tx = None;
    }
}

/// Presenter that keeps every rendered view.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    views: Arc<Mutex<Vec<PanelView>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> Vec<PanelView> {
        self.views.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<PanelView> {
        self.views.lock().unwrap().last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, view: &PanelView) {
        self.views.lock().unwrap().push(view.clone());
    }
}
