//! Interaction modes and the sets commands declare them in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The exclusive interaction state gating which commands may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Normal,
    TextEdit,
    ConnectToBlock,
    CutBlock,
    Diagram,
    Chat,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Normal,
        Mode::TextEdit,
        Mode::ConnectToBlock,
        Mode::CutBlock,
        Mode::Diagram,
        Mode::Chat,
    ];

    /// Modes in which a popup may be the active surface.
    pub fn owns_popup(self) -> bool {
        matches!(self, Mode::TextEdit | Mode::Chat)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The modes a command is allowed to run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSet {
    /// The `*` wildcard: every mode.
    Any,
    Only(&'static [Mode]),
}

impl ModeSet {
    pub const NORMAL: Self = ModeSet::Only(&[Mode::Normal]);

    /// Literal membership; the wildcard matches everything.
    pub fn contains(&self, mode: Mode) -> bool {
        match self {
            ModeSet::Any => true,
            ModeSet::Only(modes) => modes.contains(&mode),
        }
    }
}

/// User hotkey overrides, keyed by command id.
pub type HotkeyMap = IndexMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_contains_every_mode() {
        for mode in Mode::ALL {
            assert!(ModeSet::Any.contains(mode));
        }
    }

    #[test]
    fn only_set_is_literal() {
        let set = ModeSet::Only(&[Mode::CutBlock]);
        assert!(set.contains(Mode::CutBlock));
        assert!(!set.contains(Mode::Normal));
        assert!(!ModeSet::Only(&[]).contains(Mode::Normal));
    }

    #[test]
    fn popup_owning_modes() {
        assert!(Mode::TextEdit.owns_popup());
        assert!(Mode::Chat.owns_popup());
        assert!(!Mode::CutBlock.owns_popup());
    }
}
