//! Hotkey parsing and binding.
//!
//! Hotkeys are stored as strings (`"ctrl+x"`) in the user's override map and
//! parsed into [`KeyCombo`]s when bound.

mod binder;
mod keys;

pub use binder::{HotkeyBinder, Trigger};
pub use keys::{KeyCombo, KeyParseError, KeySpec, Modifiers, NamedKey};
