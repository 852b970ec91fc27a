//! Command dispatch with mode gating and the delayed revert to the default
//! command.

use std::time::Duration;

use crate::commands::{CommandContext, CommandRegistry, Effect};
use crate::constants::{ESCAPE_COMMAND, FALLBACK_DELAY};
use crate::context::Context;
use crate::surface::Surface;
use blocktree_api::Mode;

/// A scheduled state-machine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTransition {
    /// Re-arm the default command once `due` is reached.
    RevertToDefault { due: Duration },
}

impl PendingTransition {
    pub fn due(&self) -> Duration {
        match self {
            PendingTransition::RevertToDefault { due } => *due,
        }
    }
}

/// Outcome of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No command with that id; ignored.
    Unknown,
    Executed(Effect),
    /// Not allowed in the current mode; the default command will be re-armed.
    Deferred,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    fallback_delay: Duration,
    pending: Option<PendingTransition>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_fallback_delay(FALLBACK_DELAY)
    }

    pub fn with_fallback_delay(fallback_delay: Duration) -> Self {
        Self {
            fallback_delay,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending
    }

    pub fn dispatch(
        &mut self,
        registry: &CommandRegistry,
        id: &str,
        cx: &mut CommandContext<'_>,
        now: Duration,
    ) -> Dispatch {
        let Some(command) = registry.get(id) else {
            tracing::debug!(command = id, "ignoring unknown command");
            return Dispatch::Unknown;
        };

        let mode = cx.ctx.mode();
        if id == ESCAPE_COMMAND || command.allowed_in(mode) {
            tracing::debug!(command = id, %mode, "executing command");
            return Dispatch::Executed(command.run(cx));
        }

        let due = now + self.fallback_delay;
        tracing::debug!(command = id, %mode, ?due, "command not allowed in mode, reverting to default");
        self.pending = Some(PendingTransition::RevertToDefault { due });
        Dispatch::Deferred
    }

    /// Fire the pending transition if it is due. Returns true if it fired.
    ///
    /// A pending cut or connect is abandoned, since the default command
    /// cannot run while its payload is held.
    pub fn tick(&mut self, now: Duration, ctx: &mut Context, surface: &mut dyn Surface) -> bool {
        match self.pending {
            Some(PendingTransition::RevertToDefault { due }) if due <= now => {
                self.pending = None;
                if matches!(ctx.mode(), Mode::CutBlock | Mode::ConnectToBlock) {
                    tracing::debug!(mode = %ctx.mode(), "abandoning selection on revert");
                    ctx.clear_selection(surface);
                }
                ctx.set_cmd_default();
                tracing::trace!(command = %ctx.cmd_id, "default command re-armed");
                true
            }
            _ => false,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{builtin, CommandId, View};
    use crate::mode::Interaction;
    use crate::selection::CutPayload;
    use crate::surface::{Marker, NodeArena};
    use blocktree_api::{BlockId, HotkeyMap};

    fn registry() -> CommandRegistry {
        CommandRegistry::new(builtin::definitions, HotkeyMap::new(), View::Full).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let registry = registry();
        let mut dispatcher = Dispatcher::new();
        let mut ctx = Context::new();
        let mut arena = NodeArena::new();
        let mut cx = CommandContext {
            ctx: &mut ctx,
            surface: &mut arena,
        };
        assert_eq!(
            dispatcher.dispatch(&registry, "noSuchCommand", &mut cx, ms(0)),
            Dispatch::Unknown
        );
        assert!(dispatcher.pending().is_none());
    }

    #[test]
    fn disallowed_command_reverts_after_delay() {
        let registry = registry();
        let mut dispatcher = Dispatcher::new();
        let mut ctx = Context::new();
        ctx.state.interaction = Interaction::Diagram;
        ctx.cmd_id = CommandId("copyBlock");
        let mut arena = NodeArena::new();

        let mut cx = CommandContext {
            ctx: &mut ctx,
            surface: &mut arena,
        };
        assert_eq!(
            dispatcher.dispatch(&registry, "copyBlock", &mut cx, ms(100)),
            Dispatch::Deferred
        );
        assert_eq!(
            dispatcher.pending(),
            Some(PendingTransition::RevertToDefault { due: ms(150) })
        );

        assert!(!dispatcher.tick(ms(149), &mut ctx, &mut arena));
        assert_eq!(ctx.cmd_id, CommandId("copyBlock"));
        assert!(dispatcher.tick(ms(150), &mut ctx, &mut arena));
        assert_eq!(ctx.cmd_id, CommandId("openBlock"));
        assert_eq!(ctx.mode(), Mode::Diagram);
        assert!(!dispatcher.tick(ms(500), &mut ctx, &mut arena));
    }

    #[test]
    fn a_new_deferral_pushes_the_deadline() {
        let registry = registry();
        let mut dispatcher = Dispatcher::new();
        let mut ctx = Context::new();
        ctx.state.interaction = Interaction::Diagram;
        let mut arena = NodeArena::new();

        let mut cx = CommandContext {
            ctx: &mut ctx,
            surface: &mut arena,
        };
        dispatcher.dispatch(&registry, "copyBlock", &mut cx, ms(0));
        dispatcher.dispatch(&registry, "deleteBlock", &mut cx, ms(40));
        assert_eq!(dispatcher.pending().map(|p| p.due()), Some(ms(90)));
    }

    #[test]
    fn revert_abandons_a_pending_cut() {
        let registry = registry();
        let mut dispatcher = Dispatcher::new();
        let mut arena = NodeArena::new();
        let root = arena.root();
        let b1 = arena.add_block(root, "w*b1");
        let b2 = arena.add_block(b1, "w*b2");
        let mut ctx = Context::new();
        ctx.enter_interaction(
            &mut arena,
            Interaction::CutBlock {
                cut: vec![CutPayload {
                    block_id: BlockId::new("b2"),
                    old_parent_id: BlockId::new("b1"),
                    new_parent_id: None,
                    before: None,
                }],
                source_nodes: vec![b2],
            },
        );
        ctx.cmd_id = CommandId("copyBlock");
        assert!(arena.has_marker(b2, Marker::Selected));

        let mut cx = CommandContext {
            ctx: &mut ctx,
            surface: &mut arena,
        };
        assert_eq!(
            dispatcher.dispatch(&registry, "copyBlock", &mut cx, ms(0)),
            Dispatch::Deferred
        );
        assert!(dispatcher.tick(ms(50), &mut ctx, &mut arena));
        assert_eq!(ctx.mode(), Mode::Normal);
        assert_eq!(ctx.cmd_id, CommandId("openBlock"));
        assert!(ctx.state.cut().is_none());
        assert!(!arena.has_marker(b2, Marker::Selected));
    }

    #[test]
    fn escape_runs_in_every_mode() {
        let registry = registry();
        for interaction in [Interaction::TextEdit, Interaction::Diagram, Interaction::Chat] {
            let mut dispatcher = Dispatcher::new();
            let mut ctx = Context::new();
            ctx.state.interaction = interaction;
            let mut arena = NodeArena::new();
            let mut cx = CommandContext {
                ctx: &mut ctx,
                surface: &mut arena,
            };
            let outcome = dispatcher.dispatch(&registry, "escape", &mut cx, ms(0));
            assert!(matches!(outcome, Dispatch::Executed(_)));
            assert_eq!(ctx.mode(), Mode::Normal);
        }
    }
}
