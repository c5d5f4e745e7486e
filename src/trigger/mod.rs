//! Trigger dispatcher — classifies raw key events into engine actions.
//!
//! [`classify`] is a pure function of the event, the configured bindings,
//! the panel visibility and the current history length. It never mutates
//! anything: the input hook sees every keystroke system-wide, so anything
//! that is not a trigger must pass through untouched.
//!
//! Evaluation order:
//! 1. toggle chord (exact modifier-set match)
//! 2. quick-select (panel visible, primary modifier held, digit in range)
//! 3. capture (primary modifier + `c`/`x`)
//!
//! Toggle is checked first so the capture filter never fires for the
//! toggle key itself, even if someone binds toggle to `Control+C`.

pub mod chord;

pub use chord::{Chord, ChordError, Key, Modifiers};

use crate::panel::Visibility;

/// Number of history slots reachable by quick-select (digits 1–9, 0).
pub const QUICK_SELECT_SLOTS: usize = 10;

/// Key transition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    Release,
}

/// A platform-neutral key event delivered by an input hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub modifiers: Modifiers,
    pub key: Key,
}

impl KeyEvent {
    pub fn press(modifiers: Modifiers, key: Key) -> Self {
        Self {
            kind: KeyEventKind::Press,
            modifiers,
            key,
        }
    }

    pub fn release(modifiers: Modifiers, key: Key) -> Self {
        Self {
            kind: KeyEventKind::Release,
            modifiers,
            key,
        }
    }
}

/// What the engine should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Not ours; pass through.
    Ignore,
    /// Copy/cut observed; schedule a debounced clipboard read.
    Capture,
    /// Flip panel visibility.
    Toggle,
    /// Quick-select the history entry at this index.
    Select(usize),
}

impl Trigger {
    /// Whether the event should be withheld from the focused application.
    ///
    /// Capture observes the copy/cut keystroke but must let it through so
    /// the application actually copies.
    pub fn consumes(self) -> bool {
        matches!(self, Trigger::Toggle | Trigger::Select(_))
    }
}

/// Configured chords the dispatcher recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerBindings {
    /// Panel toggle chord.
    pub toggle: Chord,
    /// Platform primary modifier (copy/cut/paste and quick-select).
    pub primary: Modifiers,
}

impl TriggerBindings {
    /// Keys that signal a copy or cut in combination with `primary`.
    const CAPTURE_KEYS: [Key; 2] = [Key::Char('c'), Key::Char('x')];

    /// The chord that quick-selects `index`, or `None` past the last slot.
    pub fn quick_select_chord(&self, index: usize) -> Option<Chord> {
        let digit = match index {
            0..=8 => index as u32 + 1,
            9 => 0,
            _ => return None,
        };
        let ch = char::from_digit(digit, 10)?;
        Some(Chord::new(self.primary, Key::Char(ch)))
    }

    /// Every chord [`classify`] turns into `Select(index)`: the slot's digit
    /// with the primary modifier plus any combination of the others.
    ///
    /// An input hook that consumes quick-select must intercept all of them,
    /// otherwise e.g. Control+Shift+2 selects and still reaches the focused
    /// application. The toggle chord is never included.
    pub fn quick_select_chords(&self, index: usize) -> Vec<Chord> {
        let Some(base) = self.quick_select_chord(index) else {
            return Vec::new();
        };
        self.primary
            .supersets()
            .map(|modifiers| Chord::new(modifiers, base.key))
            .filter(|chord| *chord != self.toggle)
            .collect()
    }

    /// True if `chord` would also be read as a quick-select digit.
    pub fn shadows_quick_select(&self, chord: Chord) -> bool {
        chord.modifiers.contains(self.primary) && quick_select_index(chord.key).is_some()
    }

    /// The chord that pastes into the focused application.
    pub fn paste_chord(&self) -> Chord {
        Chord::new(self.primary, Key::Char('v'))
    }
}

/// Map a digit key to its quick-select index: 1–9 → 0–8, 0 → 9.
pub fn quick_select_index(key: Key) -> Option<usize> {
    match key.digit()? {
        0 => Some(9),
        d => Some(d as usize - 1),
    }
}

/// Classify one key event.
pub fn classify(
    event: &KeyEvent,
    bindings: &TriggerBindings,
    visibility: Visibility,
    history_len: usize,
) -> Trigger {
    if event.kind != KeyEventKind::Press {
        return Trigger::Ignore;
    }

    if event.key == bindings.toggle.key && event.modifiers == bindings.toggle.modifiers {
        return Trigger::Toggle;
    }

    if visibility == Visibility::Visible
        && event.modifiers.contains(bindings.primary)
        && let Some(index) = quick_select_index(event.key)
        && index < history_len
    {
        return Trigger::Select(index);
    }

    if event.modifiers.contains(bindings.primary)
        && TriggerBindings::CAPTURE_KEYS.contains(&event.key)
    {
        return Trigger::Capture;
    }

    Trigger::Ignore
}
