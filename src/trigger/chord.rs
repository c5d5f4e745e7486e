//! Key chords — "Control+Alt+V" → (modifier set, key).
//!
//! Platform-neutral key model shared by the dispatcher and the input hook
//! adapters. Resolution to platform keycodes lives in the adapters
//! (see `platform::x11::keymap`).

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Chord parse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordError {
    #[error("empty key chord")]
    Empty,
    #[error("bare key without modifier: {0:?}")]
    NoModifier(String),
    #[error("unknown modifier: {0:?}")]
    UnknownModifier(String),
    #[error("unknown key: {0:?}")]
    UnknownKey(String),
}

/// Set of held modifier keys.
///
/// Lock modifiers (CapsLock, NumLock) are never part of the set; adapters
/// strip them before building events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const CONTROL: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const SUPER: Modifiers = Modifiers(1 << 3);

    /// True if every modifier in `other` is held.
    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every modifier set that contains `self`, `self` first.
    pub fn supersets(self) -> impl Iterator<Item = Modifiers> {
        (0..16u8)
            .filter(move |extra| extra & self.0 == 0)
            .map(move |extra| Modifiers(self.0 | extra))
    }

    /// Parse a single modifier name (case-insensitive).
    pub fn parse_name(name: &str) -> Option<Modifiers> {
        match name.to_ascii_lowercase().as_str() {
            "shift" => Some(Modifiers::SHIFT),
            "control" | "ctrl" => Some(Modifiers::CONTROL),
            "alt" | "option" | "mod1" => Some(Modifiers::ALT),
            "super" | "cmd" | "command" | "mod4" => Some(Modifiers::SUPER),
            _ => None,
        }
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::CONTROL, "Control"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::SUPER, "Super"),
        ];
        let held: Vec<&str> = names
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        f.write_str(&held.join("+"))
    }
}

/// Named non-character keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Return,
    Escape,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl NamedKey {
    fn parse(name: &str) -> Option<NamedKey> {
        match name.to_ascii_lowercase().as_str() {
            "space" => Some(NamedKey::Space),
            "return" | "enter" => Some(NamedKey::Return),
            "escape" | "esc" => Some(NamedKey::Escape),
            "tab" => Some(NamedKey::Tab),
            "backspace" => Some(NamedKey::Backspace),
            "delete" => Some(NamedKey::Delete),
            "insert" => Some(NamedKey::Insert),
            "home" => Some(NamedKey::Home),
            "end" => Some(NamedKey::End),
            "page_up" | "pageup" | "prior" => Some(NamedKey::PageUp),
            "page_down" | "pagedown" | "next" => Some(NamedKey::PageDown),
            "up" => Some(NamedKey::Up),
            "down" => Some(NamedKey::Down),
            "left" => Some(NamedKey::Left),
            "right" => Some(NamedKey::Right),
            _ => None,
        }
    }
}

/// A physical key, independent of platform keycodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Character key, always lowercase for letters.
    Char(char),
    /// Function key F1–F12.
    Function(u8),
    Named(NamedKey),
    /// Platform code with no neutral mapping.
    Other(u32),
}

impl Key {
    /// Digit value for the top-row number keys.
    pub fn digit(self) -> Option<u8> {
        match self {
            Key::Char(c) => c.to_digit(10).map(|d| d as u8),
            _ => None,
        }
    }

    /// Parse a key name: single letter or digit, `F1`–`F12`, or a named key.
    pub fn parse_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next())
            && (ch.is_ascii_alphabetic() || ch.is_ascii_digit())
        {
            return Some(Key::Char(ch.to_ascii_lowercase()));
        }

        if let Some(rest) = name.strip_prefix('F').or_else(|| name.strip_prefix('f'))
            && let Ok(n) = rest.parse::<u8>()
            && (1..=12).contains(&n)
        {
            return Some(Key::Function(n));
        }

        NamedKey::parse(name).map(Key::Named)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Function(n) => write!(f, "F{n}"),
            Key::Named(named) => write!(f, "{named:?}"),
            Key::Other(code) => write!(f, "0x{code:04x}"),
        }
    }
}

/// A modifier set plus a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Chord {
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }
}

impl FromStr for Chord {
    type Err = ChordError;

    /// Format: `Modifier[+Modifier...]+Key`. At least one modifier is
    /// required so a chord never swallows plain typing.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = spec.split('+').map(str::trim).collect();

        if parts.iter().all(|p| p.is_empty()) {
            return Err(ChordError::Empty);
        }
        if parts.len() < 2 {
            return Err(ChordError::NoModifier(spec.to_string()));
        }

        let (modifier_parts, key_name) = parts.split_at(parts.len() - 1);
        let key_name = key_name[0];

        let mut modifiers = Modifiers::NONE;
        for &m in modifier_parts {
            let parsed =
                Modifiers::parse_name(m).ok_or_else(|| ChordError::UnknownModifier(m.into()))?;
            modifiers = modifiers | parsed;
        }

        let key = Key::parse_name(key_name).ok_or_else(|| ChordError::UnknownKey(key_name.into()))?;

        Ok(Chord { modifiers, key })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.modifiers, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modifier_names() {
        assert_eq!(Modifiers::parse_name("Shift"), Some(Modifiers::SHIFT));
        assert_eq!(Modifiers::parse_name("ctrl"), Some(Modifiers::CONTROL));
        assert_eq!(Modifiers::parse_name("Control"), Some(Modifiers::CONTROL));
        assert_eq!(Modifiers::parse_name("Option"), Some(Modifiers::ALT));
        assert_eq!(Modifiers::parse_name("alt"), Some(Modifiers::ALT));
        assert_eq!(Modifiers::parse_name("Cmd"), Some(Modifiers::SUPER));
        assert_eq!(Modifiers::parse_name("Hyper"), None);
        assert_eq!(Modifiers::parse_name(""), None);
    }

    #[test]
    fn supersets_hold_every_extra_combination() {
        let sets: Vec<Modifiers> = Modifiers::CONTROL.supersets().collect();
        assert_eq!(sets.len(), 8);
        assert_eq!(sets[0], Modifiers::CONTROL);
        assert!(sets.iter().all(|m| m.contains(Modifiers::CONTROL)));
        assert!(sets.contains(&(Modifiers::CONTROL | Modifiers::SHIFT)));
        assert!(sets.contains(
            &(Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::ALT | Modifiers::SUPER)
        ));

        let all = Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER;
        assert_eq!(all.supersets().collect::<Vec<_>>(), vec![all]);
    }

    #[test]
    fn modifiers_contains_is_subset_check() {
        let held = Modifiers::CONTROL | Modifiers::SHIFT;
        assert!(held.contains(Modifiers::CONTROL));
        assert!(held.contains(Modifiers::NONE));
        assert!(!held.contains(Modifiers::ALT));
        assert!(!Modifiers::CONTROL.contains(held));
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::parse_name("V"), Some(Key::Char('v')));
        assert_eq!(Key::parse_name("7"), Some(Key::Char('7')));
        assert_eq!(Key::parse_name("F12"), Some(Key::Function(12)));
        assert_eq!(Key::parse_name("f1"), Some(Key::Function(1)));
        assert_eq!(Key::parse_name("F13"), None);
        assert_eq!(Key::parse_name("Enter"), Some(Key::Named(NamedKey::Return)));
        assert_eq!(Key::parse_name("esc"), Some(Key::Named(NamedKey::Escape)));
        assert_eq!(Key::parse_name("FooBar"), None);
        assert_eq!(Key::parse_name(""), None);
    }

    #[test]
    fn key_digit_value() {
        assert_eq!(Key::Char('0').digit(), Some(0));
        assert_eq!(Key::Char('9').digit(), Some(9));
        assert_eq!(Key::Char('a').digit(), None);
        assert_eq!(Key::Function(1).digit(), None);
    }

    #[test]
    fn parse_default_toggle() {
        let chord: Chord = "Control+Alt+V".parse().unwrap();
        assert_eq!(chord.modifiers, Modifiers::CONTROL | Modifiers::ALT);
        assert_eq!(chord.key, Key::Char('v'));
    }

    #[test]
    fn parse_tolerates_spaces_and_case() {
        let chord: Chord = " ctrl + shift + f5 ".parse().unwrap();
        assert_eq!(chord.modifiers, Modifiers::CONTROL | Modifiers::SHIFT);
        assert_eq!(chord.key, Key::Function(5));
    }

    #[test]
    fn parse_rejects_bare_key() {
        assert_eq!(
            "V".parse::<Chord>(),
            Err(ChordError::NoModifier("V".into()))
        );
    }

    #[test]
    fn parse_rejects_unknown_parts() {
        assert_eq!(
            "Meta+V".parse::<Chord>(),
            Err(ChordError::UnknownModifier("Meta".into()))
        );
        assert_eq!(
            "Control+Blorp".parse::<Chord>(),
            Err(ChordError::UnknownKey("Blorp".into()))
        );
        assert_eq!("".parse::<Chord>(), Err(ChordError::Empty));
    }

    #[test]
    fn display_round_trips() {
        let chord: Chord = "alt+ctrl+v".parse().unwrap();
        assert_eq!(chord.to_string(), "Control+Alt+V");
        assert_eq!(chord.to_string().parse::<Chord>(), Ok(chord));
    }
}
