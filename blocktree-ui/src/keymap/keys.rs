//! Key combinations and their hotkey-string form (`"ctrl+shift+x"`, `"space+0"`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty hotkey")]
    Empty,

    #[error("hotkey `{0}` has no key")]
    MissingKey(String),

    #[error("hotkey `{0}` has more than a leader and a key")]
    TooManyKeys(String),

    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

/// Keyboard modifiers for key combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub cmd: bool, // Command on macOS, Super/Win on other platforms
}

impl Modifiers {
    pub const NONE: Self = Self { ctrl: false, alt: false, shift: false, cmd: false };
    pub const CTRL: Self = Self { ctrl: true, alt: false, shift: false, cmd: false };

    /// Set the flag named by `token`; false if it is not a modifier.
    fn apply(&mut self, token: &str) -> bool {
        match token {
            "ctrl" | "control" => self.ctrl = true,
            "alt" | "option" => self.alt = true,
            "shift" => self.shift = true,
            "cmd" | "meta" | "command" | "super" => self.cmd = true,
            _ => return false,
        }
        true
    }
}

/// Named (non-character) keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

impl NamedKey {
    fn parse(token: &str) -> Option<Self> {
        let key = match token {
            "esc" | "escape" => NamedKey::Escape,
            "enter" | "return" => NamedKey::Enter,
            "tab" => NamedKey::Tab,
            "backspace" => NamedKey::Backspace,
            "delete" | "del" => NamedKey::Delete,
            "up" | "arrowup" => NamedKey::ArrowUp,
            "down" | "arrowdown" => NamedKey::ArrowDown,
            "left" | "arrowleft" => NamedKey::ArrowLeft,
            "right" | "arrowright" => NamedKey::ArrowRight,
            "space" => NamedKey::Space,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" => NamedKey::PageUp,
            "pagedown" => NamedKey::PageDown,
            _ => {
                let n: u8 = token.strip_prefix('f')?.parse().ok()?;
                return (1..=12).contains(&n).then_some(NamedKey::F(n));
            }
        };
        Some(key)
    }

    fn canonical(&self) -> String {
        match self {
            NamedKey::Escape => "escape".to_string(),
            NamedKey::Enter => "enter".to_string(),
            NamedKey::Tab => "tab".to_string(),
            NamedKey::Backspace => "backspace".to_string(),
            NamedKey::Delete => "delete".to_string(),
            NamedKey::ArrowUp => "arrowup".to_string(),
            NamedKey::ArrowDown => "arrowdown".to_string(),
            NamedKey::ArrowLeft => "arrowleft".to_string(),
            NamedKey::ArrowRight => "arrowright".to_string(),
            NamedKey::Space => "space".to_string(),
            NamedKey::Home => "home".to_string(),
            NamedKey::End => "end".to_string(),
            NamedKey::PageUp => "pageup".to_string(),
            NamedKey::PageDown => "pagedown".to_string(),
            NamedKey::F(n) => format!("f{n}"),
        }
    }
}

/// A key: a character or a named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpec {
    Char(char),
    Named(NamedKey),
}

impl KeySpec {
    pub const fn char(c: char) -> Self {
        Self::Char(c)
    }

    pub const fn named(n: NamedKey) -> Self {
        Self::Named(n)
    }

    fn parse(token: &str) -> Result<Self, KeyParseError> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeySpec::Char(c.to_ascii_lowercase()));
        }
        NamedKey::parse(token)
            .map(KeySpec::Named)
            .ok_or_else(|| KeyParseError::UnknownKey(token.to_string()))
    }

    pub fn display(&self) -> String {
        match self {
            KeySpec::Char(c) => c.to_uppercase().to_string(),
            KeySpec::Named(n) => match n {
                NamedKey::Escape => "Esc".to_string(),
                NamedKey::Enter => "↩".to_string(),
                NamedKey::Tab => "⇥".to_string(),
                NamedKey::Backspace => "⌫".to_string(),
                NamedKey::Delete => "⌦".to_string(),
                NamedKey::ArrowUp => "↑".to_string(),
                NamedKey::ArrowDown => "↓".to_string(),
                NamedKey::ArrowLeft => "←".to_string(),
                NamedKey::ArrowRight => "→".to_string(),
                NamedKey::Space => "Space".to_string(),
                NamedKey::F(n) => format!("F{n}"),
                other => format!("{:?}", other),
            },
        }
    }

    fn canonical(&self) -> String {
        match self {
            KeySpec::Char(c) => c.to_string(),
            KeySpec::Named(n) => n.canonical(),
        }
    }
}

/// A key combination: modifiers, an optional held leader key, and the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    /// Held key of a chord such as `space+0`.
    pub leader: Option<KeySpec>,
    pub key: KeySpec,
}

impl KeyCombo {
    pub const fn new(modifiers: Modifiers, key: KeySpec) -> Self {
        Self {
            modifiers,
            leader: None,
            key,
        }
    }

    pub const fn chord(leader: KeySpec, key: KeySpec) -> Self {
        Self {
            modifiers: Modifiers::NONE,
            leader: Some(leader),
            key,
        }
    }

    /// Format for display (e.g., "Ctrl+C", "Space+0").
    pub fn display(&self) -> String {
        let mut result = String::new();
        if self.modifiers.ctrl { result.push_str("Ctrl+"); }
        if self.modifiers.alt { result.push_str("Alt+"); }
        if self.modifiers.shift { result.push_str("Shift+"); }
        if self.modifiers.cmd { result.push_str("Super+"); }
        if let Some(leader) = &self.leader {
            result.push_str(&leader.display());
            result.push('+');
        }
        result.push_str(&self.key.display());
        result
    }
}

impl FromStr for KeyCombo {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut modifiers = Modifiers::NONE;
        let mut keys = Vec::new();
        for token in normalized.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(KeyParseError::UnknownKey(s.to_string()));
            }
            if !modifiers.apply(token) {
                keys.push(KeySpec::parse(token)?);
            }
        }

        match keys.as_slice() {
            [] => Err(KeyParseError::MissingKey(s.to_string())),
            [key] => Ok(KeyCombo {
                modifiers,
                leader: None,
                key: *key,
            }),
            [leader, key] => Ok(KeyCombo {
                modifiers,
                leader: Some(*leader),
                key: *key,
            }),
            _ => Err(KeyParseError::TooManyKeys(s.to_string())),
        }
    }
}

/// Canonical hotkey-string form; parses back to the same combo.
impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mods = [
            (self.modifiers.ctrl, "ctrl"),
            (self.modifiers.alt, "alt"),
            (self.modifiers.shift, "shift"),
            (self.modifiers.cmd, "cmd"),
        ];
        for (_, name) in mods.iter().filter(|(on, _)| *on) {
            write!(f, "{name}+")?;
        }
        if let Some(leader) = &self.leader {
            write!(f, "{}+", leader.canonical())?;
        }
        f.write_str(&self.key.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(s: &str) -> KeyCombo {
        s.parse().unwrap()
    }

    #[test]
    fn parses_modifiers_in_any_order() {
        assert_eq!(combo("ctrl+shift+x"), combo("Shift+Ctrl+X"));
        assert_eq!(
            combo("ctrl+x"),
            KeyCombo::new(Modifiers::CTRL, KeySpec::char('x'))
        );
    }

    #[test]
    fn parses_named_keys_and_aliases() {
        assert_eq!(combo("esc"), combo("escape"));
        assert_eq!(combo("alt+left"), combo("alt+arrowleft"));
        assert_eq!(
            combo("f5"),
            KeyCombo::new(Modifiers::NONE, KeySpec::named(NamedKey::F(5)))
        );
    }

    #[test]
    fn parses_leader_chords() {
        assert_eq!(
            combo("space+0"),
            KeyCombo::chord(KeySpec::named(NamedKey::Space), KeySpec::char('0'))
        );
    }

    #[test]
    fn rejects_malformed_hotkeys() {
        assert_eq!("".parse::<KeyCombo>(), Err(KeyParseError::Empty));
        assert!(matches!("ctrl".parse::<KeyCombo>(), Err(KeyParseError::MissingKey(_))));
        assert!(matches!("a+b+c".parse::<KeyCombo>(), Err(KeyParseError::TooManyKeys(_))));
        assert!(matches!("ctrl+nope".parse::<KeyCombo>(), Err(KeyParseError::UnknownKey(_))));
        assert!(matches!("f13".parse::<KeyCombo>(), Err(KeyParseError::UnknownKey(_))));
        assert!(matches!("ctrl++".parse::<KeyCombo>(), Err(KeyParseError::UnknownKey(_))));
    }

    #[test]
    fn canonical_form_parses_back() {
        for s in ["ctrl+shift+v", "space+9", "alt+arrowleft", "delete", "cmd+k"] {
            let parsed = combo(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(combo(&parsed.to_string()), parsed);
        }
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(combo("ctrl+x").display(), "Ctrl+X");
        assert_eq!(combo("space+0").display(), "Space+0");
        assert_eq!(combo("alt+arrowleft").display(), "Alt+←");
    }
}
