//! Key identities and the configurable binding table.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Front-end independent key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Char(char),
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c));
        }
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            "enter" | "return" => Ok(Key::Enter),
            "esc" | "escape" => Ok(Key::Escape),
            "backspace" => Ok(Key::Backspace),
            "delete" | "del" => Ok(Key::Delete),
            "tab" => Ok(Key::Tab),
            "space" => Ok(Key::Char(' ')),
            _ => Err(format!("unknown key name `{}`", s)),
        }
    }
}

/// A key press plus whether the selection modifier was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifier: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifier: false,
        }
    }

    pub fn with_modifier(key: Key) -> Self {
        Self {
            key,
            modifier: true,
        }
    }
}

/// Named actions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Delete,
    Cancel,
    Confirm,
    Erase,
    VolumeUp,
    VolumeDown,
    RadiusUp,
    RadiusDown,
    TimingEarlier,
    TimingLater,
    RemoveRecording,
}

const GRID_BINDINGS: &[Binding] = &[
    Binding::MoveUp,
    Binding::MoveDown,
    Binding::MoveLeft,
    Binding::MoveRight,
    Binding::Delete,
    Binding::Cancel,
    Binding::VolumeUp,
    Binding::VolumeDown,
    Binding::RadiusUp,
    Binding::RadiusDown,
    Binding::TimingEarlier,
    Binding::TimingLater,
];

const CHOOSER_BINDINGS: &[Binding] = &[
    Binding::MoveUp,
    Binding::MoveDown,
    Binding::Cancel,
    Binding::Confirm,
    Binding::Erase,
    Binding::RemoveRecording,
];

/// Key table, one list of key names per binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub delete: Vec<String>,
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub erase: Vec<String>,
    pub volume_up: Vec<String>,
    pub volume_down: Vec<String>,
    pub radius_up: Vec<String>,
    pub radius_down: Vec<String>,
    pub timing_earlier: Vec<String>,
    pub timing_later: Vec<String>,
    pub remove_recording: Vec<String>,
}

fn names(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: names(&["Up"]),
            down: names(&["Down"]),
            left: names(&["Left"]),
            right: names(&["Right"]),
            delete: names(&["Delete", "Backspace"]),
            cancel: names(&["Escape"]),
            confirm: names(&["Enter"]),
            erase: names(&["Backspace"]),
            volume_up: names(&["+", "="]),
            volume_down: names(&["-"]),
            radius_up: names(&["]"]),
            radius_down: names(&["["]),
            timing_earlier: names(&[","]),
            timing_later: names(&["."]),
            remove_recording: names(&["Delete"]),
        }
    }
}

impl KeyBindings {
    /// Key names bound to `binding`.
    pub fn keys_for(&self, binding: Binding) -> &[String] {
        match binding {
            Binding::MoveUp => &self.up,
            Binding::MoveDown => &self.down,
            Binding::MoveLeft => &self.left,
            Binding::MoveRight => &self.right,
            Binding::Delete => &self.delete,
            Binding::Cancel => &self.cancel,
            Binding::Confirm => &self.confirm,
            Binding::Erase => &self.erase,
            Binding::VolumeUp => &self.volume_up,
            Binding::VolumeDown => &self.volume_down,
            Binding::RadiusUp => &self.radius_up,
            Binding::RadiusDown => &self.radius_down,
            Binding::TimingEarlier => &self.timing_earlier,
            Binding::TimingLater => &self.timing_later,
            Binding::RemoveRecording => &self.remove_recording,
        }
    }

    /// Binding for `key` while the grid has focus.
    pub fn resolve_grid(&self, key: Key) -> Option<Binding> {
        self.resolve_in(GRID_BINDINGS, key)
    }

    /// Binding for `key` while the recording chooser is open.
    pub fn resolve_chooser(&self, key: Key) -> Option<Binding> {
        self.resolve_in(CHOOSER_BINDINGS, key)
    }

    /// Names in the table that do not parse as keys.
    pub fn invalid_names(&self) -> Vec<String> {
        GRID_BINDINGS
            .iter()
            .chain(CHOOSER_BINDINGS)
            .flat_map(|b| self.keys_for(*b))
            .filter(|name| name.parse::<Key>().is_err())
            .cloned()
            .collect()
    }

    fn resolve_in(&self, table: &[Binding], key: Key) -> Option<Binding> {
        table.iter().copied().find(|binding| {
            self.keys_for(*binding)
                .iter()
                .any(|name| name.parse::<Key>().map(|k| k == key).unwrap_or(false))
        })
    }
}
