//! Blocktree UI - command and context dispatch for the block editor.
//!
//! This crate turns key presses, clicks and button presses into intents for
//! the API layer. It renders nothing itself; the rendered tree is reached
//! through the [`surface::Surface`] seam.
//!
//! # Module Organization
//!
//! - `constants`: Shared constants (root container id, timings)
//! - `clock`: Injected time source and the key-repeat throttle
//! - `surface`: Renderer seam and the arena used by headless drivers
//! - `mode`, `selection`: Pure mode and cut/connect state transitions
//! - `keymap`: Hotkey parsing and binding
//! - `commands`: Command definitions and the registry
//! - `context`: The session's mutable interaction state
//! - `dispatch`: Mode-gated dispatch and the delayed revert to default
//! - `popup`: Modal popup seam
//! - `config`: Session configuration
//! - `session`: The actor tying everything to the navigator and event bus

// Shared constants (no dependencies)
pub mod constants;

pub mod clock;
pub mod surface;

// Pure state (depends on surface for node handles)
pub mod mode;
pub mod selection;

pub mod keymap;
pub mod popup;

pub mod commands;
pub mod context;
pub mod dispatch;

pub mod config;
pub mod session;

pub use commands::{Command, CommandId, CommandRegistry, Effect};
pub use config::SessionConfig;
pub use context::Context;
pub use session::{spawn, KeyOutcome, Session, SessionError, SessionHandle, SessionInput};
