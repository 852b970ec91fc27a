//! Core types for the command system.

use std::fmt;

use blocktree_api::{BlockId, EditorEvent, Hsl, ModeSet, PathLink, PopupKind, TreeId};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::surface::Surface;

/// Unique identifier for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub &'static str);

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for CommandId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// What a command runs against: the session context and the rendered tree.
pub struct CommandContext<'a> {
    pub ctx: &'a mut Context,
    pub surface: &'a mut dyn Surface,
}

pub type ExecuteFn = fn(&mut CommandContext<'_>) -> Effect;

/// Navigation a command asks the session to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum NavIntent {
    Into {
        block_id: BlockId,
        parent_hsl: Option<Hsl>,
        links: Vec<PathLink>,
    },
    Back,
    ToLevel(usize),
    SwitchTree(TreeId),
    /// 1-based; `0` is the last tree.
    SwitchTreeByIndex(usize),
}

/// Side effects returned by a command, applied by the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Effect {
    #[default]
    None,
    Emit(EditorEvent),
    Navigate(NavIntent),
    /// Ask the UI layer to open a popup.
    Popup {
        kind: PopupKind,
        block_id: Option<BlockId>,
    },
    /// User-facing feedback for a rejected operation.
    Notice(String),
    Batch(Vec<Effect>),
}

impl Effect {
    pub fn none() -> Self {
        Effect::None
    }

    pub fn notice(message: impl fmt::Display) -> Self {
        Effect::Notice(message.to_string())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }
}

/// Placement of a command's UI button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiButton {
    /// Toolbar or panel the button is drawn in.
    pub container: &'static str,
    pub label: &'static str,
    pub icon: &'static [&'static str],
}

/// Which view the registry is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Full,
    /// Read-only view opened from a shared link; editing commands are hidden.
    SharedLink,
}

/// A user-invokable command.
#[derive(Clone)]
pub struct Command {
    pub id: CommandId,
    pub name: &'static str,
    /// Modes the command may execute in.
    pub modes: ModeSet,
    /// Default hotkey; commands without one are never bound.
    pub hotkey: Option<&'static str>,
    pub button: Option<UiButton>,
    pub execute: ExecuteFn,
    /// Extra entry point run when the command is chosen from its button.
    pub alt_execute: Option<ExecuteFn>,
    /// Skip the key-repeat throttle.
    pub throttle_exempt: bool,
    /// Available on the shared-link view.
    pub shared_view: bool,
}

impl Command {
    pub fn run(&self, cx: &mut CommandContext<'_>) -> Effect {
        (self.execute)(cx)
    }

    /// Run the button entry point, if the command has one.
    pub fn run_alt(&self, cx: &mut CommandContext<'_>) -> Option<Effect> {
        self.alt_execute.map(|alt| alt(cx))
    }

    pub fn has_alt_execute(&self) -> bool {
        self.alt_execute.is_some()
    }

    pub fn allowed_in(&self, mode: blocktree_api::Mode) -> bool {
        self.modes.contains(mode)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("modes", &self.modes)
            .field("hotkey", &self.hotkey)
            .field("button", &self.button)
            .field("alt_execute", &self.alt_execute.is_some())
            .field("throttle_exempt", &self.throttle_exempt)
            .field("shared_view", &self.shared_view)
            .finish()
    }
}
