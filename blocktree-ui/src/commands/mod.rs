//! Command registry for the editor.
//!
//! Centralizes all user-invokable commands with metadata for:
//! - Mode gating (which modes a command may run in)
//! - Hotkeys (defaults plus per-user overrides)
//! - UI buttons (with an optional button-only entry point)
//!
//! Commands never perform I/O. They mutate the [`crate::context::Context`]
//! and return an [`Effect`] for the session to apply.

pub mod builtin;
mod registry;
mod types;

pub use registry::{CommandRegistry, RegistryError};
pub use types::{
    Command, CommandContext, CommandId, Effect, ExecuteFn, NavIntent, UiButton, View,
};
