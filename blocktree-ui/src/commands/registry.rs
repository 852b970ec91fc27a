//! Command Registry - central store for all commands and their hotkeys.

use std::collections::HashMap;
use std::time::Duration;

use blocktree_api::{ButtonView, HotkeyMap};
use thiserror::Error;

use crate::constants::HOTKEY_THROTTLE;
use crate::keymap::{HotkeyBinder, KeyCombo, KeyParseError};

use super::types::{Command, CommandId, View};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate command id: {0}")]
    DuplicateId(CommandId),

    #[error("Invalid hotkey `{hotkey}` for {command}: {source}")]
    InvalidHotkey {
        command: CommandId,
        hotkey: String,
        source: KeyParseError,
    },
}

/// How a user override that fails to parse is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overrides {
    /// Warn and bind the default instead.
    Lenient,
    /// Reject the whole map.
    Strict,
}

/// Central registry of all commands.
pub struct CommandRegistry {
    definitions: fn() -> Vec<Command>,
    commands: Vec<Command>,
    by_id: HashMap<&'static str, usize>,
    hotkeys: HotkeyMap,
    binder: HotkeyBinder,
    /// Combo each command was bound with.
    bound: HashMap<&'static str, KeyCombo>,
    view: View,
    throttle_window: Duration,
}

impl CommandRegistry {
    /// Register every definition in order, binding `hotkeys` over the defaults.
    pub fn new(
        definitions: fn() -> Vec<Command>,
        hotkeys: HotkeyMap,
        view: View,
    ) -> Result<Self, RegistryError> {
        Self::with_throttle(definitions, hotkeys, view, HOTKEY_THROTTLE)
    }

    pub fn with_throttle(
        definitions: fn() -> Vec<Command>,
        hotkeys: HotkeyMap,
        view: View,
        throttle_window: Duration,
    ) -> Result<Self, RegistryError> {
        Self::build(definitions, hotkeys, view, throttle_window, Overrides::Lenient)
    }

    fn build(
        definitions: fn() -> Vec<Command>,
        hotkeys: HotkeyMap,
        view: View,
        throttle_window: Duration,
        overrides: Overrides,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self {
            definitions,
            commands: Vec::new(),
            by_id: HashMap::new(),
            hotkeys,
            binder: HotkeyBinder::with_throttle(throttle_window),
            bound: HashMap::new(),
            view,
            throttle_window,
        };
        for command in definitions() {
            registry.register_with(command, overrides)?;
        }
        tracing::debug!(
            commands = registry.commands.len(),
            hotkeys = registry.binder.len(),
            ?view,
            "command registry built"
        );
        Ok(registry)
    }

    /// Register a command.
    ///
    /// Commands hidden on the current view are skipped. A user override that
    /// does not parse is logged and the default hotkey is bound instead.
    pub fn register(&mut self, command: Command) -> Result<(), RegistryError> {
        self.register_with(command, Overrides::Lenient)
    }

    fn register_with(&mut self, command: Command, overrides: Overrides) -> Result<(), RegistryError> {
        if self.view == View::SharedLink && !command.shared_view {
            return Ok(());
        }
        if self.by_id.contains_key(command.id.0) {
            return Err(RegistryError::DuplicateId(command.id));
        }

        if let Some(combo) = self.effective_combo(&command, overrides)? {
            if let Some(previous) = self.binder.bind(combo, command.id, command.throttle_exempt) {
                tracing::debug!(%combo, %previous, command = %command.id, "hotkey rebound");
            }
            self.bound.insert(command.id.0, combo);
        }

        let idx = self.commands.len();
        self.by_id.insert(command.id.0, idx);
        self.commands.push(command);
        Ok(())
    }

    /// `hotkeys[id] ?? default`, parsed. `None` when the command has no
    /// default hotkey.
    fn effective_combo(
        &self,
        command: &Command,
        overrides: Overrides,
    ) -> Result<Option<KeyCombo>, RegistryError> {
        let Some(default) = command.hotkey else {
            return Ok(None);
        };

        if let Some(hotkey) = self.hotkeys.get(command.id.0) {
            match hotkey.parse::<KeyCombo>() {
                Ok(combo) => return Ok(Some(combo)),
                Err(source) if overrides == Overrides::Strict => {
                    return Err(RegistryError::InvalidHotkey {
                        command: command.id,
                        hotkey: hotkey.clone(),
                        source,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        command = %command.id,
                        hotkey = %hotkey,
                        %error,
                        "ignoring invalid hotkey override"
                    );
                }
            }
        }

        default
            .parse::<KeyCombo>()
            .map(Some)
            .map_err(|source| RegistryError::InvalidHotkey {
                command: command.id,
                hotkey: default.to_string(),
                source,
            })
    }

    /// Unbind everything, swap in `hotkeys`, and register every definition
    /// again in order.
    ///
    /// The new map is validated first; on error the registry is unchanged.
    pub fn reset_and_re_register(
        &mut self,
        hotkeys: HotkeyMap,
    ) -> Result<Vec<ButtonView>, RegistryError> {
        let rebuilt = Self::build(
            self.definitions,
            hotkeys,
            self.view,
            self.throttle_window,
            Overrides::Strict,
        )?;
        self.binder.unbind_all();
        *self = rebuilt;
        tracing::info!(hotkeys = self.binder.len(), "hotkeys re-registered");
        Ok(self.buttons())
    }

    /// Get a command by id.
    pub fn get(&self, id: &str) -> Option<&Command> {
        self.by_id.get(id).map(|&idx| &self.commands[idx])
    }

    /// Get all registered commands, in registration order.
    pub fn all(&self) -> &[Command] {
        &self.commands
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn hotkeys(&self) -> &HotkeyMap {
        &self.hotkeys
    }

    /// The combo that currently fires `id`, if any.
    ///
    /// A combo claimed by a later command no longer belongs to `id`.
    pub fn hotkey_for(&self, id: &str) -> Option<KeyCombo> {
        let combo = self.bound.get(id)?;
        (self.binder.bound_command(combo)? == *id).then_some(*combo)
    }

    pub fn binder(&self) -> &HotkeyBinder {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut HotkeyBinder {
        &mut self.binder
    }

    /// Buttons to draw, with their effective hotkeys.
    pub fn buttons(&self) -> Vec<ButtonView> {
        self.commands
            .iter()
            .filter_map(|command| {
                let button = command.button?;
                Some(ButtonView {
                    command_id: command.id.0.to_string(),
                    container: button.container.to_string(),
                    label: button.label.to_string(),
                    icon: button.icon.iter().map(|s| s.to_string()).collect(),
                    hotkey: self.hotkey_for(command.id.0).map(|c| c.display()),
                })
            })
            .collect()
    }
}
