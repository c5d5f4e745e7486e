//! Keysym tables and chord resolution.
//!
//! Translates between the neutral [`Key`]/[`Modifiers`] model and X11
//! keysyms, keycodes and modifier masks. The keyboard mapping is fetched
//! once at connect time.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, Keysym, ModMask};

use crate::platform::PlatformError;
use crate::trigger::chord::NamedKey;
use crate::trigger::{Chord, Key, Modifiers};

/// XK_Num_Lock, for NumLock modifier detection.
pub const XK_NUM_LOCK: Keysym = 0xff7f;

/// XK_F1; F2..F12 follow consecutively.
const XK_F1: Keysym = 0xffbe;

const NAMED_KEYSYMS: [(NamedKey, Keysym); 15] = [
    (NamedKey::Space, 0x0020),
    (NamedKey::Return, 0xff0d),
    (NamedKey::Escape, 0xff1b),
    (NamedKey::Tab, 0xff09),
    (NamedKey::Backspace, 0xff08),
    (NamedKey::Delete, 0xffff),
    (NamedKey::Insert, 0xff63),
    (NamedKey::Home, 0xff50),
    (NamedKey::End, 0xff57),
    (NamedKey::PageUp, 0xff55),
    (NamedKey::PageDown, 0xff56),
    (NamedKey::Up, 0xff52),
    (NamedKey::Down, 0xff54),
    (NamedKey::Left, 0xff51),
    (NamedKey::Right, 0xff53),
];

/// Snapshot of the server's keycode → keysym table.
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    min_keycode: u8,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    /// Fetch the full keyboard mapping from the server.
    pub fn fetch(conn: &impl Connection) -> Result<Self, PlatformError> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;

        let reply = xproto::get_keyboard_mapping(conn, min_keycode, count)
            .map_err(|e| PlatformError::Hook(format!("get_keyboard_mapping: {e}")))?
            .reply()
            .map_err(|e| PlatformError::Hook(format!("get_keyboard_mapping reply: {e}")))?;

        Ok(Self::from_raw(
            min_keycode,
            reply.keysyms_per_keycode as usize,
            reply.keysyms,
        ))
    }

    pub fn from_raw(min_keycode: u8, keysyms_per_keycode: usize, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Unshifted keysym of `keycode` (column 0), or `None` if unmapped.
    pub fn keysym(&self, keycode: u8) -> Option<Keysym> {
        if self.keysyms_per_keycode == 0 || keycode < self.min_keycode {
            return None;
        }
        let base = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode;
        self.keysyms.get(base).copied().filter(|&sym| sym != 0)
    }

    /// All keycodes producing `keysym` in any column.
    pub fn keycodes(&self, keysym: Keysym) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .filter_map(|(i, _)| u8::try_from(i).ok())
            .filter_map(|i| self.min_keycode.checked_add(i))
            .collect()
    }

    /// First keycode producing `keysym`.
    pub fn keycode(&self, keysym: Keysym) -> Option<u8> {
        self.keycodes(keysym).into_iter().next()
    }
}

/// A chord resolved to an X11 keycode and modifier mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub chord: Chord,
    /// X11 modifier mask without lock bits.
    pub modifiers: u16,
    pub keycode: u8,
}

/// Resolve a chord against the current keyboard mapping.
pub fn resolve(chord: Chord, map: &KeyboardMap) -> Result<Binding, PlatformError> {
    let keysym = key_to_keysym(chord.key)
        .ok_or_else(|| PlatformError::Hook(format!("no X11 keysym for {chord}")))?;
    let keycode = map.keycode(keysym).ok_or_else(|| {
        PlatformError::Hook(format!(
            "keysym 0x{keysym:04x} ({chord}) not found in keyboard mapping"
        ))
    })?;
    Ok(Binding {
        chord,
        modifiers: modifiers_to_mask(chord.modifiers),
        keycode,
    })
}

/// Map a neutral key to its X11 keysym.
pub fn key_to_keysym(key: Key) -> Option<Keysym> {
    match key {
        Key::Char(c) if c.is_ascii_graphic() => Some(c.to_ascii_lowercase() as Keysym),
        Key::Char(_) => None,
        Key::Function(n) if (1..=12).contains(&n) => Some(XK_F1 + Keysym::from(n) - 1),
        Key::Function(_) => None,
        Key::Named(named) => NAMED_KEYSYMS
            .iter()
            .find(|(k, _)| *k == named)
            .map(|(_, sym)| *sym),
        Key::Other(sym) => Some(sym),
    }
}

/// Map an X11 keysym to a neutral key. Uppercase letters fold to lowercase.
pub fn keysym_to_key(keysym: Keysym) -> Key {
    if let Some((named, _)) = NAMED_KEYSYMS.iter().find(|(_, sym)| *sym == keysym) {
        return Key::Named(*named);
    }
    if (XK_F1..XK_F1 + 12).contains(&keysym) {
        return Key::Function((keysym - XK_F1 + 1) as u8);
    }
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_graphic() => Key::Char(c.to_ascii_lowercase()),
        _ => Key::Other(keysym),
    }
}

/// Neutral modifier set → X11 modifier mask.
pub fn modifiers_to_mask(modifiers: Modifiers) -> u16 {
    let mut mask = 0u16;
    if modifiers.contains(Modifiers::SHIFT) {
        mask |= u16::from(ModMask::SHIFT);
    }
    if modifiers.contains(Modifiers::CONTROL) {
        mask |= u16::from(ModMask::CONTROL);
    }
    if modifiers.contains(Modifiers::ALT) {
        mask |= u16::from(ModMask::M1);
    }
    if modifiers.contains(Modifiers::SUPER) {
        mask |= u16::from(ModMask::M4);
    }
    mask
}

/// X11 event state → neutral modifier set.
///
/// Lock bits, pointer buttons and unmapped modifiers (Mod2, Mod3, Mod5)
/// are dropped, so CapsLock/NumLock never change what a chord matches.
pub fn mask_to_modifiers(state: u16) -> Modifiers {
    let mut modifiers = Modifiers::NONE;
    if state & u16::from(ModMask::SHIFT) != 0 {
        modifiers = modifiers | Modifiers::SHIFT;
    }
    if state & u16::from(ModMask::CONTROL) != 0 {
        modifiers = modifiers | Modifiers::CONTROL;
    }
    if state & u16::from(ModMask::M1) != 0 {
        modifiers = modifiers | Modifiers::ALT;
    }
    if state & u16::from(ModMask::M4) != 0 {
        modifiers = modifiers | Modifiers::SUPER;
    }
    modifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny mapping: keycode 10 = '1', 19 = '0', 54 = 'c'/'C', 55 = 'v'/'V',
    /// 77 = Num_Lock. Two keysyms per keycode.
    fn sample_map() -> KeyboardMap {
        let min = 8u8;
        let max = 80u8;
        let per = 2usize;
        let mut syms = vec![0; (max - min + 1) as usize * per];
        let mut set = |code: u8, a: Keysym, b: Keysym| {
            let base = (code - min) as usize * per;
            syms[base] = a;
            syms[base + 1] = b;
        };
        set(10, 0x31, 0x21);
        set(19, 0x30, 0x29);
        set(54, 0x63, 0x43);
        set(55, 0x76, 0x56);
        set(77, 0xff7f, 0);
        KeyboardMap::from_raw(min, per, syms)
    }

    #[test]
    fn keysym_lookup_uses_first_column() {
        let map = sample_map();
        assert_eq!(map.keysym(54), Some(0x63));
        assert_eq!(map.keysym(10), Some(0x31));
        assert_eq!(map.keysym(11), None);
        assert_eq!(map.keysym(3), None);
    }

    #[test]
    fn keycode_lookup_searches_all_columns() {
        let map = sample_map();
        assert_eq!(map.keycode(0x63), Some(54));
        assert_eq!(map.keycode(0x43), Some(54));
        assert_eq!(map.keycodes(XK_NUM_LOCK), vec![77]);
        assert_eq!(map.keycode(0x7a), None);
    }

    #[test]
    fn resolve_chord_to_binding() {
        let map = sample_map();
        let chord: Chord = "Control+Alt+V".parse().unwrap();
        let binding = resolve(chord, &map).unwrap();
        assert_eq!(binding.keycode, 55);
        assert_eq!(
            binding.modifiers,
            u16::from(ModMask::CONTROL) | u16::from(ModMask::M1)
        );
    }

    #[test]
    fn resolve_unmapped_key_fails() {
        let map = sample_map();
        let chord: Chord = "Control+Z".parse().unwrap();
        assert!(matches!(resolve(chord, &map), Err(PlatformError::Hook(_))));
    }

    #[test]
    fn keysym_key_tables_agree() {
        let keys = [
            Key::Char('a'),
            Key::Char('7'),
            Key::Char('/'),
            Key::Function(1),
            Key::Function(12),
            Key::Named(NamedKey::Escape),
            Key::Named(NamedKey::Right),
        ];
        for key in keys {
            let sym = key_to_keysym(key).unwrap();
            assert_eq!(keysym_to_key(sym), key, "keysym 0x{sym:04x}");
        }
    }

    #[test]
    fn uppercase_keysym_folds_to_lowercase() {
        assert_eq!(keysym_to_key(0x43), Key::Char('c'));
    }

    #[test]
    fn unknown_keysym_is_other() {
        assert_eq!(keysym_to_key(0xffe3), Key::Other(0xffe3)); // Control_L
        assert_eq!(key_to_keysym(Key::Function(13)), None);
    }

    #[test]
    fn mask_conversion_strips_locks_and_buttons() {
        let numlock = u16::from(ModMask::M2);
        let caps = u16::from(ModMask::LOCK);
        let button1 = 0x100;
        let state = u16::from(ModMask::CONTROL) | numlock | caps | button1;
        assert_eq!(mask_to_modifiers(state), Modifiers::CONTROL);
    }

    #[test]
    fn mask_conversion_round_trips() {
        let all = Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER;
        assert_eq!(mask_to_modifiers(modifiers_to_mask(all)), all);
        assert_eq!(modifiers_to_mask(Modifiers::NONE), 0);
    }
}
