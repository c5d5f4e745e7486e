//! X11 input hook — XInput2 raw key observation plus selective grabs.
//!
//! Two X11 mechanisms are combined:
//!
//! - **Raw key presses** (XInput2 `XI_RawKeyPress` on the root window)
//!   observe every key press system-wide without affecting delivery. This
//!   is how copy/cut keystrokes reach the dispatcher while still reaching
//!   the focused application.
//! - **Key grabs** (`XGrabKey`) withhold the chords the engine consumes:
//!   the toggle chord permanently, quick-select digits only while armed.
//!   A quick-select slot is grabbed under every modifier set the dispatcher
//!   accepts for it (primary plus any extras). Grabbed chords arrive as
//!   core `KeyPress`/`KeyRelease` events.
//!
//! Raw presses that match an active grab are dropped so each physical
//! press is delivered exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xinput;
use x11rb::protocol::xproto::{self, GrabMode, ModMask, Window};
use x11rb::rust_connection::RustConnection;

use super::keymap::{self, Binding, KeyboardMap};
use super::{X11Shared, spawn_event_thread};
use crate::platform::{InputHook, PlatformError};
use crate::trigger::{KeyEvent, KeyEventKind, TriggerBindings};

/// Active grabs as (keycode, modifier mask without lock bits).
type GrabSet = Arc<Mutex<HashSet<(u8, u16)>>>;

/// X11 implementation of [`InputHook`].
pub struct X11InputHook {
    shared: X11Shared,
    bindings: Option<TriggerBindings>,
    toggle: Option<Binding>,
    /// Quick-select grabs currently held, one group per slot in index order.
    armed: Vec<Vec<Binding>>,
    grabs: GrabSet,
    stop: Option<Arc<AtomicBool>>,
    event_thread: Option<JoinHandle<()>>,
    bridge_thread: Option<JoinHandle<()>>,
}

impl X11InputHook {
    pub fn new(shared: X11Shared) -> Self {
        Self {
            shared,
            bindings: None,
            toggle: None,
            armed: Vec::new(),
            grabs: Arc::default(),
            stop: None,
            event_thread: None,
            bridge_thread: None,
        }
    }

    /// Grab a binding on the root window with every lock-mask variant.
    ///
    /// Returns `Ok(false)` if another client already holds the chord.
    fn grab(&self, binding: &Binding) -> Result<bool, PlatformError> {
        let mut all_ok = true;

        for lock_mask in self.shared.lock_masks() {
            let mods = ModMask::from(binding.modifiers | lock_mask);
            let cookie = xproto::grab_key(
                &*self.shared.conn,
                true,
                self.shared.root,
                mods,
                binding.keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .map_err(|e| PlatformError::Hook(format!("grab_key send: {e}")))?;

            if let Err(e) = cookie.check() {
                tracing::warn!(
                    chord = %binding.chord,
                    lock_mask,
                    error = %e,
                    "XGrabKey failed — chord may be held by another application"
                );
                all_ok = false;
            }
        }

        if all_ok {
            self.grab_set().insert((binding.keycode, binding.modifiers));
        }
        Ok(all_ok)
    }

    /// Release a binding. Best-effort; errors are logged.
    fn ungrab(&self, binding: &Binding) {
        for lock_mask in self.shared.lock_masks() {
            let mods = ModMask::from(binding.modifiers | lock_mask);
            if let Err(e) =
                xproto::ungrab_key(&*self.shared.conn, binding.keycode, self.shared.root, mods)
            {
                tracing::debug!(chord = %binding.chord, error = %e, "XUngrabKey failed");
            }
        }
        if let Err(e) = self.shared.conn.flush() {
            tracing::debug!(error = %e, "flush after ungrab failed");
        }
        self.grab_set().remove(&(binding.keycode, binding.modifiers));
    }

    fn grab_set(&self) -> std::sync::MutexGuard<'_, HashSet<(u8, u16)>> {
        self.grabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe the root window to XInput2 raw key presses.
    fn select_raw_events(&self) -> Result<(), PlatformError> {
        let conn = &*self.shared.conn;

        let version = xinput::xi_query_version(conn, 2, 0)
            .map_err(|e| PlatformError::Hook(format!("XInput2 unavailable: {e}")))?
            .reply()
            .map_err(|e| PlatformError::Hook(format!("xi_query_version reply: {e}")))?;
        if version.major_version < 2 {
            return Err(PlatformError::Hook(format!(
                "XInput {}.{} too old, need 2.0",
                version.major_version, version.minor_version
            )));
        }

        let mask = xinput::EventMask {
            deviceid: xinput::Device::ALL_MASTER.into(),
            mask: vec![xinput::XIEventMask::RAW_KEY_PRESS.into()],
        };
        xinput::xi_select_events(conn, self.shared.root, &[mask])
            .map_err(|e| PlatformError::Hook(format!("xi_select_events send: {e}")))?
            .check()
            .map_err(|e| PlatformError::Hook(format!("xi_select_events: {e}")))?;

        Ok(())
    }
}

impl InputHook for X11InputHook {
    fn install(
        &mut self,
        bindings: &TriggerBindings,
    ) -> Result<UnboundedReceiver<KeyEvent>, PlatformError> {
        let toggle = keymap::resolve(bindings.toggle, &self.shared.keymap)?;
        if !self.grab(&toggle)? {
            return Err(PlatformError::Hook(format!(
                "toggle chord {} is held by another application",
                bindings.toggle
            )));
        }
        tracing::info!(chord = %toggle.chord, keycode = toggle.keycode, "toggle chord grabbed");
        self.toggle = Some(toggle);
        self.bindings = Some(*bindings);

        self.select_raw_events()?;

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Some(Arc::clone(&stop));
        let (raw_rx, event_thread) = spawn_event_thread(Arc::clone(&self.shared.conn), stop)?;
        self.event_thread = Some(event_thread);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let bridge = Bridge {
            conn: Arc::clone(&self.shared.conn),
            root: self.shared.root,
            lock_bits: LOCK_BITS | self.shared.numlock_mask,
            keymap: self.shared.keymap.clone(),
            grabs: Arc::clone(&self.grabs),
            tx: event_tx,
        };
        let bridge_thread = std::thread::Builder::new()
            .name("x11-key-bridge".into())
            .spawn(move || {
                while let Ok(event) = raw_rx.recv() {
                    if !bridge.forward(&event) {
                        return;
                    }
                }
            })
            .map_err(|e| PlatformError::Hook(format!("spawn key bridge thread: {e}")))?;
        self.bridge_thread = Some(bridge_thread);

        Ok(event_rx)
    }

    fn arm_quick_select(&mut self, slots: usize) -> Result<(), PlatformError> {
        let Some(bindings) = self.bindings else {
            return Err(PlatformError::Hook("hook not installed".into()));
        };

        while self.armed.len() > slots {
            for binding in self.armed.pop().unwrap_or_default() {
                self.ungrab(&binding);
            }
        }

        while self.armed.len() < slots {
            let chords = bindings.quick_select_chords(self.armed.len());
            if chords.is_empty() {
                break;
            }
            let mut group = Vec::with_capacity(chords.len());
            for chord in chords {
                let binding = keymap::resolve(chord, &self.shared.keymap)?;
                if !self.grab(&binding)? {
                    tracing::warn!(chord = %chord, "quick-select chord not intercepted");
                }
                group.push(binding);
            }
            self.armed.push(group);
        }

        if let Err(e) = self.shared.conn.flush() {
            tracing::debug!(error = %e, "flush after quick-select grabs failed");
        }
        tracing::debug!(slots = self.armed.len(), "quick-select armed");
        Ok(())
    }

    fn uninstall(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
        }

        for binding in std::mem::take(&mut self.armed).into_iter().flatten() {
            self.ungrab(&binding);
        }
        if let Some(toggle) = self.toggle.take() {
            self.ungrab(&toggle);
        }

        // Exits within 100ms due to the poll timeout.
        if let Some(handle) = self.event_thread.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!("X11 event thread panicked: {e:?}");
        }
        // Exits once the event thread drops its sender.
        if let Some(handle) = self.bridge_thread.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!("X11 key bridge thread panicked: {e:?}");
        }
    }
}

/// CapsLock bit, combined with the detected NumLock bit at install time.
const LOCK_BITS: u16 = super::LOCK_MASK;

/// Translates raw X11 events into [`KeyEvent`]s on the bridge thread.
struct Bridge {
    conn: Arc<RustConnection>,
    root: Window,
    lock_bits: u16,
    keymap: KeyboardMap,
    grabs: GrabSet,
    tx: UnboundedSender<KeyEvent>,
}

impl Bridge {
    /// Forward one event. Returns `false` once the engine side is gone.
    fn forward(&self, event: &Event) -> bool {
        let translated = match event {
            Event::KeyPress(e) => Some(self.translate(KeyEventKind::Press, e.detail, e.state.into())),
            Event::KeyRelease(e) => {
                Some(self.translate(KeyEventKind::Release, e.detail, e.state.into()))
            }
            Event::XinputRawKeyPress(e) => self.translate_raw(e.detail),
            _ => None,
        };

        match translated {
            Some(key_event) => self.tx.send(key_event).is_ok(),
            None => true,
        }
    }

    fn translate(&self, kind: KeyEventKind, keycode: u8, state: u16) -> KeyEvent {
        let key = self
            .keymap
            .keysym(keycode)
            .map_or(crate::trigger::Key::Other(u32::from(keycode)), keymap::keysym_to_key);
        let modifiers = keymap::mask_to_modifiers(state & !self.lock_bits);
        match kind {
            KeyEventKind::Press => KeyEvent::press(modifiers, key),
            KeyEventKind::Release => KeyEvent::release(modifiers, key),
        }
    }

    /// Raw events carry no modifier state; read it from the pointer query.
    fn translate_raw(&self, detail: u32) -> Option<KeyEvent> {
        let keycode = u8::try_from(detail).ok()?;
        let state = match xproto::query_pointer(&*self.conn, self.root).map(|c| c.reply()) {
            Ok(Ok(reply)) => u16::from(reply.mask),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "query_pointer failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "query_pointer send failed");
                return None;
            }
        };

        let clean = state & !self.lock_bits & 0x00ff;
        let grabbed = self
            .grabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(keycode, clean));
        if grabbed {
            return None;
        }

        Some(self.translate(KeyEventKind::Press, keycode, state))
    }
}
