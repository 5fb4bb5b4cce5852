use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Error type for key parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

bitflags! {
    /// Modifier mask carried by shortcuts and key presses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0x01;
        const CTRL = 0x02;
        const ALT = 0x04;
        const META = 0x08;
    }
}

/// A key, either a character or one of the named keys the menu engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Tab,
    Enter,
    KpEnter,
    Escape,
    BackSpace,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

impl Key {
    fn parse(s: &str) -> Result<Self, ParseError> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c.to_ascii_lowercase()));
        }

        let lower = s.to_ascii_lowercase();
        let key = match lower.as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "kpenter" | "kp_enter" => Key::KpEnter,
            "escape" | "esc" => Key::Escape,
            "backspace" => Key::BackSpace,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" => Key::PageUp,
            "pagedown" => Key::PageDown,
            "insert" => Key::Insert,
            "delete" | "del" => Key::Delete,
            "space" => Key::Char(' '),
            "plus" => Key::Char('+'),
            _ => {
                if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if (1..=24).contains(&n) {
                        return Ok(Key::F(n));
                    }
                }
                return Err(ParseError(format!("Unknown key: {s}")));
            }
        };
        Ok(key)
    }

    fn same_key(self, other: Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            _ => self == other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "Space"),
            Key::Char(c) => write!(f, "{}", c.to_uppercase()),
            Key::F(n) => write!(f, "F{n}"),
            Key::BackSpace => write!(f, "BackSpace"),
            Key::KpEnter => write!(f, "KpEnter"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Split `"Ctrl+Shift+S"` into a modifier mask and a key.
fn parse_combo(s: &str) -> Result<(Modifiers, Key), ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError("Empty key combination".to_string()));
    }

    // A trailing "++" names the plus key itself.
    let (head, key_part) = match s.strip_suffix("++") {
        Some(head) => (head, "+"),
        None => match s.rsplit_once('+') {
            Some((head, key)) => (head, key),
            None => ("", s),
        },
    };

    let mut mods = Modifiers::empty();
    for part in head.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => mods |= Modifiers::CTRL,
            "alt" | "option" => mods |= Modifiers::ALT,
            "shift" => mods |= Modifiers::SHIFT,
            "meta" | "super" | "cmd" | "command" | "win" => mods |= Modifiers::META,
            other => return Err(ParseError(format!("Unknown modifier: {other}"))),
        }
    }

    let key_part = key_part.trim();
    if key_part.is_empty() {
        return Err(ParseError(format!("Missing key in '{s}'")));
    }
    Ok((mods, Key::parse(key_part)?))
}

fn modifier_prefix(mods: Modifiers) -> String {
    let mut s = String::new();
    if mods.contains(Modifiers::META) {
        s.push_str("Meta+");
    }
    if mods.contains(Modifiers::CTRL) {
        s.push_str("Ctrl+");
    }
    if mods.contains(Modifiers::ALT) {
        s.push_str("Alt+");
    }
    if mods.contains(Modifiers::SHIFT) {
        s.push_str("Shift+");
    }
    s
}

/// The key combination attached to a menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shortcut {
    pub key: Key,
    pub mods: Modifiers,
}

impl Shortcut {
    pub const fn new(mods: Modifiers, key: Key) -> Self {
        Self { key, mods }
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(Modifiers::CTRL, Key::Char(c))
    }

    /// Whether `press` triggers this shortcut.
    ///
    /// Ctrl, Alt and Meta must match exactly. Shift must match too when the
    /// keys are compared directly; a character shortcut additionally matches
    /// the typed text with Shift ignored.
    pub fn matches(&self, press: &KeyPress) -> bool {
        let mismatch = self.mods ^ press.mods;
        if mismatch.intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META) {
            return false;
        }
        if !mismatch.contains(Modifiers::SHIFT) && self.key.same_key(press.key) {
            return true;
        }
        match (self.key, press.text) {
            (Key::Char(c), Some(t)) => c.to_lowercase().eq(t.to_lowercase()),
            _ => false,
        }
    }

    /// The two halves drawn in a menu's shortcut columns: the right-aligned
    /// modifier text and the left-aligned key text.
    pub fn label_parts(&self) -> (String, String) {
        (modifier_prefix(self.mods), self.key.to_string())
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mods, key) = self.label_parts();
        write!(f, "{mods}{key}")
    }
}

impl FromStr for Shortcut {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mods, key) = parse_combo(s)?;
        Ok(Self::new(mods, key))
    }
}

impl TryFrom<String> for Shortcut {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Shortcut> for String {
    fn from(value: Shortcut) -> Self {
        value.to_string()
    }
}

/// One keyboard event as delivered by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPress {
    pub key: Key,
    pub mods: Modifiers,
    /// Text the key produced, if any.
    pub text: Option<char>,
}

impl KeyPress {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        let text = match key {
            Key::Char(c) if mods.contains(Modifiers::SHIFT) => c.to_uppercase().next(),
            Key::Char(c) => Some(c),
            _ => None,
        };
        Self { key, mods, text }
    }

    pub fn key(key: Key) -> Self {
        Self::new(key, Modifiers::empty())
    }

    pub fn shift(&self) -> bool {
        self.mods.contains(Modifiers::SHIFT)
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", modifier_prefix(self.mods), self.key)
    }
}

impl FromStr for KeyPress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mods, key) = parse_combo(s)?;
        Ok(Self::new(key, mods))
    }
}

impl TryFrom<String> for KeyPress {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyPress> for String {
    fn from(value: KeyPress) -> Self {
        value.to_string()
    }
}

/// The accelerator character of a label: the character after a single `&`.
/// `&&` is a literal ampersand.
pub fn label_accelerator(label: &str) -> Option<char> {
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '&' {
            match chars.next() {
                Some('&') => continue,
                Some(next) => return Some(next),
                None => return None,
            }
        }
    }
    None
}

/// Label text with the accelerator markup removed.
pub fn display_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '&' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `press` selects the item labelled `label` by its accelerator.
///
/// Only Alt (and Shift, which just changes case) may be held; with
/// `require_alt` Alt must be held.
pub fn test_label_accelerator(label: &str, press: &KeyPress, require_alt: bool) -> bool {
    if press
        .mods
        .intersects(!(Modifiers::ALT | Modifiers::SHIFT))
    {
        return false;
    }
    if require_alt && !press.mods.contains(Modifiers::ALT) {
        return false;
    }
    let Some(typed) = press.text else {
        return false;
    };
    let Some(accel) = label_accelerator(label) else {
        return false;
    };
    typed.to_lowercase().eq(accel.to_lowercase())
}
