use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::document::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable key, stored lowercase.
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Cmd on macOS, Ctrl elsewhere.
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordParseError {
    #[error("empty key chord")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

/// Parses chords written like `mod-shift-z` or `shift-enter`. `mod`, `cmd`,
/// `ctrl` and `secondary` all mean the primary modifier.
impl FromStr for KeyChord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(['-', '+']).collect();
        let Some((key, mods)) = parts.split_last() else {
            return Err(ChordParseError::Empty);
        };
        if key.is_empty() {
            return Err(ChordParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "mod" | "cmd" | "ctrl" | "secondary" => modifiers.primary = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                other => return Err(ChordParseError::UnknownModifier(other.to_owned())),
            }
        }

        let lower = key.to_ascii_lowercase();
        let key = match lower.as_str() {
            "enter" => Key::Enter,
            "backspace" => Key::Backspace,
            "delete" => Key::Delete,
            "tab" => Key::Tab,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(ChordParseError::UnknownKey(key.to_string())),
                }
            }
        };
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.primary {
            f.write_str("mod-")?;
        }
        if self.modifiers.alt {
            f.write_str("alt-")?;
        }
        if self.modifiers.shift {
            f.write_str("shift-")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => f.write_str("enter"),
            Key::Backspace => f.write_str("backspace"),
            Key::Delete => f.write_str("delete"),
            Key::Tab => f.write_str("tab"),
        }
    }
}

/// Keyboard bindings onto commands. Later bindings for the same chord win.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<(KeyChord, Command)>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut keymap = Self::empty();
        let table = [
            ("mod-b", Command::FormatText(Mark::Bold)),
            ("mod-i", Command::FormatText(Mark::Italic)),
            ("mod-u", Command::FormatText(Mark::Underline)),
            ("mod-shift-x", Command::FormatText(Mark::Strikethrough)),
            ("mod-e", Command::FormatText(Mark::Code)),
            ("mod-z", Command::Undo),
            ("mod-shift-z", Command::Redo),
            ("mod-y", Command::Redo),
            ("tab", Command::Indent),
            ("shift-tab", Command::Outdent),
            ("enter", Command::InsertParagraph),
            ("shift-enter", Command::InsertLineBreak),
            ("backspace", Command::DeleteBackward),
            ("delete", Command::DeleteForward),
        ];
        for (chord, command) in table {
            if let Ok(chord) = chord.parse() {
                keymap.bind(chord, command);
            }
        }
        keymap
    }

    pub fn bind(&mut self, chord: KeyChord, command: Command) {
        self.bindings.push((chord, command));
    }

    pub fn bind_str(&mut self, chord: &str, command: Command) -> Result<(), ChordParseError> {
        self.bind(chord.parse()?, command);
        Ok(())
    }

    pub fn lookup(&self, chord: &KeyChord) -> Option<&Command> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == chord)
            .map(|(_, command)| command)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&KeyChord, &Command)> {
        self.bindings.iter().map(|(chord, command)| (chord, command))
    }
}
