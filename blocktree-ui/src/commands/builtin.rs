//! Built-in editor commands.
//!
//! Commands that finish in one step re-arm the default command before
//! returning. `cutBlock` and `connectBlock` stay armed while their operation
//! is in flight, so the next click completes it. Pressing the hotkey again
//! arms the default instead, and the dispatcher's revert abandons the
//! operation.

use blocktree_api::{BlockId, EditorEvent, Mode, ModeSet, MoveRequest, PathLink, PopupKind};

use crate::constants::DEFAULT_COMMAND;
use crate::mode::Interaction;
use crate::selection::{
    complete_connect_blocks, complete_cut_block, copy_block_id, extract_block_id,
    extract_parent_id, start_connect_blocks, start_cut_block, Connection, CutPayload,
    SelectionError,
};
use crate::surface::{NodeId, Surface};

use super::types::{Command, CommandContext, CommandId, Effect, ExecuteFn, NavIntent, UiButton};

pub const OPEN_BLOCK: CommandId = CommandId(DEFAULT_COMMAND);
pub const CUT_BLOCK: CommandId = CommandId("cutBlock");
pub const CONNECT_BLOCK: CommandId = CommandId("connectBlock");

const CUT_MODES: ModeSet = ModeSet::Only(&[Mode::Normal, Mode::CutBlock]);
const PASTE_MODES: ModeSet = ModeSet::Only(&[Mode::CutBlock]);
const CONNECT_MODES: ModeSet = ModeSet::Only(&[Mode::Normal, Mode::ConnectToBlock]);
const DIAGRAM_MODES: ModeSet = ModeSet::Only(&[Mode::Normal, Mode::Diagram]);
const CHAT_MODES: ModeSet = ModeSet::Only(&[Mode::Normal, Mode::Chat]);
/// Keyboard navigation also picks targets for in-flight operations.
const NAV_MODES: ModeSet = ModeSet::Only(&[
    Mode::Normal,
    Mode::CutBlock,
    Mode::ConnectToBlock,
    Mode::Diagram,
]);

/// A command with no hotkey, no button, Normal mode only.
const fn command(id: &'static str, name: &'static str, execute: ExecuteFn) -> Command {
    Command {
        id: CommandId(id),
        name,
        modes: ModeSet::NORMAL,
        hotkey: None,
        button: None,
        execute,
        alt_execute: None,
        throttle_exempt: false,
        shared_view: true,
    }
}

/// All built-in commands, in registration order.
pub fn definitions() -> Vec<Command> {
    vec![
        // =====================================================================
        // Navigation
        // =====================================================================
        command("openBlock", "Open Block", action_open_block),
        Command {
            modes: ModeSet::Any,
            hotkey: Some("escape"),
            ..command("escape", "Escape", action_escape)
        },
        Command {
            hotkey: Some("alt+arrowleft"),
            ..command("goBack", "Go Back", action_go_back)
        },
        Command {
            modes: NAV_MODES,
            hotkey: Some("arrowup"),
            throttle_exempt: true,
            ..command("navUp", "Previous Block", action_nav_up)
        },
        Command {
            modes: NAV_MODES,
            hotkey: Some("arrowdown"),
            throttle_exempt: true,
            ..command("navDown", "Next Block", action_nav_down)
        },
        Command {
            modes: NAV_MODES,
            hotkey: Some("arrowleft"),
            throttle_exempt: true,
            ..command("navLeft", "Parent Block", action_nav_left)
        },
        Command {
            modes: NAV_MODES,
            hotkey: Some("arrowright"),
            throttle_exempt: true,
            ..command("navRight", "First Child", action_nav_right)
        },
        switch_tree("switchTree0", "space+0", action_switch_tree::<0>),
        switch_tree("switchTree1", "space+1", action_switch_tree::<1>),
        switch_tree("switchTree2", "space+2", action_switch_tree::<2>),
        switch_tree("switchTree3", "space+3", action_switch_tree::<3>),
        switch_tree("switchTree4", "space+4", action_switch_tree::<4>),
        switch_tree("switchTree5", "space+5", action_switch_tree::<5>),
        switch_tree("switchTree6", "space+6", action_switch_tree::<6>),
        switch_tree("switchTree7", "space+7", action_switch_tree::<7>),
        switch_tree("switchTree8", "space+8", action_switch_tree::<8>),
        switch_tree("switchTree9", "space+9", action_switch_tree::<9>),
        // =====================================================================
        // Editing
        // =====================================================================
        Command {
            hotkey: Some("ctrl+enter"),
            button: Some(UiButton {
                container: "toolbar",
                label: "New",
                icon: &["fa", "fa-plus"],
            }),
            shared_view: false,
            ..command("createBlock", "New Block", action_create_block)
        },
        Command {
            hotkey: Some("ctrl+e"),
            shared_view: false,
            ..command("editTitle", "Edit Title", action_edit_title)
        },
        Command {
            hotkey: Some("ctrl+shift+e"),
            shared_view: false,
            ..command("editText", "Edit Text", action_edit_text)
        },
        Command {
            modes: CUT_MODES,
            hotkey: Some("ctrl+x"),
            button: Some(UiButton {
                container: "toolbar",
                label: "Cut",
                icon: &["fa", "fa-scissors"],
            }),
            shared_view: false,
            ..command("cutBlock", "Cut Block", action_cut_block)
        },
        Command {
            modes: PASTE_MODES,
            hotkey: Some("ctrl+v"),
            shared_view: false,
            ..command("pasteBlock", "Paste Block", action_paste_block)
        },
        Command {
            modes: PASTE_MODES,
            hotkey: Some("ctrl+shift+v"),
            shared_view: false,
            ..command("pasteLink", "Paste as Link", action_paste_link)
        },
        Command {
            hotkey: Some("ctrl+c"),
            button: Some(UiButton {
                container: "toolbar",
                label: "Copy",
                icon: &["fa", "fa-copy"],
            }),
            ..command("copyBlock", "Copy Block", action_copy_block)
        },
        Command {
            hotkey: Some("delete"),
            button: Some(UiButton {
                container: "toolbar",
                label: "Delete",
                icon: &["fa", "fa-trash"],
            }),
            shared_view: false,
            ..command("deleteBlock", "Delete Block", action_delete_block)
        },
        Command {
            modes: CONNECT_MODES,
            hotkey: Some("ctrl+l"),
            button: Some(UiButton {
                container: "toolbar",
                label: "Connect",
                icon: &["fa", "fa-link"],
            }),
            shared_view: false,
            ..command("connectBlock", "Connect Blocks", action_connect_block)
        },
        Command {
            hotkey: Some("ctrl+space"),
            ..command("toggleSelect", "Toggle Selection", action_toggle_select)
        },
        // =====================================================================
        // Views
        // =====================================================================
        Command {
            modes: DIAGRAM_MODES,
            hotkey: Some("ctrl+d"),
            button: Some(UiButton {
                container: "toolbar",
                label: "Diagram",
                icon: &["fa", "fa-project-diagram"],
            }),
            ..command("diagram", "Toggle Diagram", action_diagram)
        },
        Command {
            modes: CHAT_MODES,
            hotkey: Some("ctrl+k"),
            ..command("chat", "Toggle Chat", action_chat)
        },
        Command {
            button: Some(UiButton {
                container: "settings",
                label: "Hotkeys",
                icon: &["fa", "fa-keyboard"],
            }),
            alt_execute: Some(action_open_hotkey_editor),
            shared_view: false,
            ..command("editHotkeys", "Edit Hotkeys", action_rearm)
        },
    ]
}

fn switch_tree(id: &'static str, hotkey: &'static str, execute: ExecuteFn) -> Command {
    Command {
        hotkey: Some(hotkey),
        ..command(id, "Switch Tree", execute)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Re-arm the command that owns the current mode, or the default.
fn rearm(cx: &mut CommandContext<'_>) {
    cx.ctx.cmd_id = match cx.ctx.mode() {
        Mode::CutBlock => CUT_BLOCK,
        Mode::ConnectToBlock => CONNECT_BLOCK,
        _ => cx.ctx.default_command(),
    };
}

/// End a completed or aborted operation: nothing active, nothing selected,
/// default armed.
fn finish(cx: &mut CommandContext<'_>) {
    cx.ctx.clear_selection(cx.surface);
    cx.ctx.clear_multi_selection(cx.surface);
    cx.ctx.set_cmd_default();
}

fn reject(cx: &mut CommandContext<'_>, error: SelectionError) -> Effect {
    tracing::debug!(%error, mode = %cx.ctx.mode(), "command rejected");
    Effect::notice(error)
}

/// Cut payloads for the multi-selection, or for the active element.
fn cut_sources(cx: &CommandContext<'_>) -> Result<(Vec<CutPayload>, Vec<NodeId>), SelectionError> {
    let surface = &*cx.surface;
    let nodes: Vec<NodeId> = if cx.ctx.has_multi_selection() {
        cx.ctx
            .selected_block_ids()
            .iter()
            .map(|id| -> Result<NodeId, SelectionError> {
                let block = surface.find_block(id).ok_or(SelectionError::MissingBlockId)?;
                Ok(surface.link_of(block).unwrap_or(block))
            })
            .collect::<Result<_, SelectionError>>()?
    } else {
        vec![cx.ctx.active_element(surface).ok_or(SelectionError::MissingBlockId)?]
    };

    let cut = nodes
        .iter()
        .map(|&node| -> Result<CutPayload, SelectionError> {
            let info = surface.element(node).ok_or(SelectionError::MissingBlockId)?;
            start_cut_block(Some(&info.dom_id), info.parent_dom_id.as_deref())
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((cut, nodes))
}

/// Destinations for every cut payload. A payload without a hovered
/// destination goes into the active block.
fn resolve_moves(cx: &CommandContext<'_>) -> Result<Vec<MoveRequest>, SelectionError> {
    let cut = cx.ctx.state.cut().ok_or(SelectionError::NoCutInProgress)?;
    let active = cx.ctx.state.block_id.as_ref();
    cut.iter()
        .map(|payload| {
            let new_parent = payload.new_parent_id.as_ref().or(active);
            complete_cut_block(
                Some(payload),
                new_parent.map(BlockId::as_str),
                payload.before.as_ref().map(BlockId::as_str),
            )
        })
        .collect()
}

fn move_active(
    cx: &mut CommandContext<'_>,
    step: fn(&dyn Surface, NodeId) -> Option<NodeId>,
) -> Effect {
    rearm(cx);
    let Some(current) = cx.ctx.active_element(cx.surface) else {
        return Effect::None;
    };
    let Some(next) = step(cx.surface, current).and_then(|n| cx.surface.focusable(n)) else {
        return Effect::None;
    };
    if cx.ctx.mode() == Mode::CutBlock {
        // Same as hovering, so the cut gets a destination.
        cx.ctx.pointer_enter(cx.surface, next);
    } else {
        cx.ctx.focus(cx.surface, next);
    }
    Effect::None
}

// =============================================================================
// Actions
// =============================================================================

fn action_open_block(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    let Some(block) = cx.ctx.state.active_block.or_else(|| cx.surface.first_root_child()) else {
        return Effect::None;
    };
    let block_info = cx.surface.element(block);
    let link_info = cx.ctx.state.active_link.and_then(|l| cx.surface.element(l));
    let Some(block_id) = extract_block_id(block_info.as_ref(), link_info.as_ref()) else {
        return Effect::None;
    };

    let links = link_info
        .and_then(|link| {
            Some(PathLink {
                link_id: BlockId::from_dom_id(&link.dom_id),
                link_source: link.link_target?,
            })
        })
        .into_iter()
        .collect();

    Effect::Navigate(NavIntent::Into {
        block_id,
        parent_hsl: cx.surface.hsl(block),
        links,
    })
}

fn action_escape(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.close_popups(cx.surface);
    cx.ctx.active_button = None;
    finish(cx);
    Effect::None
}

fn action_go_back(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    Effect::Navigate(NavIntent::Back)
}

fn action_nav_up(cx: &mut CommandContext<'_>) -> Effect {
    move_active(cx, |s, node| s.sibling(node, -1))
}

fn action_nav_down(cx: &mut CommandContext<'_>) -> Effect {
    move_active(cx, |s, node| s.sibling(node, 1))
}

fn action_nav_left(cx: &mut CommandContext<'_>) -> Effect {
    move_active(cx, |s, node| s.parent(node).and_then(|p| s.closest_block(p)))
}

fn action_nav_right(cx: &mut CommandContext<'_>) -> Effect {
    move_active(cx, |s, node| {
        let block = s.focusable(node)?;
        s.children(block)
            .iter()
            .copied()
            .find(|&c| s.focusable(c).is_some())
    })
}

fn action_switch_tree<const N: usize>(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    Effect::Navigate(NavIntent::SwitchTreeByIndex(N))
}

fn open_popup(cx: &mut CommandContext<'_>, kind: PopupKind) -> Effect {
    cx.ctx.set_cmd_default();
    Effect::Popup {
        kind,
        block_id: cx.ctx.active_block_id(cx.surface),
    }
}

fn action_create_block(cx: &mut CommandContext<'_>) -> Effect {
    open_popup(cx, PopupKind::NewBlock)
}

fn action_edit_title(cx: &mut CommandContext<'_>) -> Effect {
    open_popup(cx, PopupKind::EditTitle)
}

fn action_edit_text(cx: &mut CommandContext<'_>) -> Effect {
    open_popup(cx, PopupKind::EditText)
}

/// Start a cut, or complete it when one is already in flight.
fn action_cut_block(cx: &mut CommandContext<'_>) -> Effect {
    if cx.ctx.mode() == Mode::CutBlock {
        return action_paste_block(cx);
    }

    match cut_sources(cx) {
        Ok((cut, source_nodes)) => {
            tracing::debug!(blocks = cut.len(), "cut started");
            cx.ctx.clear_multi_selection(cx.surface);
            cx.ctx
                .enter_interaction(cx.surface, Interaction::CutBlock { cut, source_nodes });
            cx.ctx.cmd_id = CUT_BLOCK;
            Effect::None
        }
        Err(error) => {
            cx.ctx.set_cmd_default();
            reject(cx, error)
        }
    }
}

fn action_paste_block(cx: &mut CommandContext<'_>) -> Effect {
    let mut moves = match resolve_moves(cx) {
        Ok(moves) => moves,
        Err(error) => return reject(cx, error),
    };
    finish(cx);

    if moves.len() == 1 {
        let MoveRequest {
            block_id,
            old_parent_id,
            new_parent_id,
            before,
        } = moves.remove(0);
        Effect::Emit(EditorEvent::MoveBlock {
            block_id,
            old_parent_id,
            new_parent_id,
            before,
        })
    } else {
        Effect::Emit(EditorEvent::MoveBlocks { moves })
    }
}

fn action_paste_link(cx: &mut CommandContext<'_>) -> Effect {
    let moves = match resolve_moves(cx) {
        Ok(moves) => moves,
        Err(error) => return reject(cx, error),
    };
    finish(cx);

    Effect::Batch(
        moves
            .into_iter()
            .map(|m| {
                Effect::Emit(EditorEvent::CreateLink {
                    block_id: m.block_id,
                    new_parent_id: m.new_parent_id,
                    before: m.before,
                })
            })
            .collect(),
    )
}

fn action_copy_block(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    let block_ids = if cx.ctx.has_multi_selection() {
        cx.ctx.selected_block_ids()
    } else {
        let info = cx.ctx.active_element_info(cx.surface);
        match copy_block_id(info.as_ref().map(|i| i.dom_id.as_str())) {
            Ok(id) => vec![id],
            Err(error) => return reject(cx, error),
        }
    };
    cx.ctx.clear_multi_selection(cx.surface);
    Effect::Emit(EditorEvent::CopyBlocks { block_ids })
}

fn action_delete_block(cx: &mut CommandContext<'_>) -> Effect {
    if cx.ctx.has_multi_selection() {
        let block_ids = cx.ctx.selected_block_ids();
        finish(cx);
        return Effect::Emit(EditorEvent::DeleteTreeBlocks { block_ids });
    }

    let Some(info) = cx.ctx.active_element_info(cx.surface) else {
        cx.ctx.set_cmd_default();
        return reject(cx, SelectionError::MissingBlockId);
    };
    if extract_parent_id(&info).is_none() {
        cx.ctx.set_cmd_default();
        return Effect::notice("Cannot delete the root block");
    }
    finish(cx);
    Effect::Emit(EditorEvent::DeleteTreeBlock {
        block_id: BlockId::from_dom_id(&info.dom_id),
    })
}

/// Pick the source, or connect it to the active block.
fn action_connect_block(cx: &mut CommandContext<'_>) -> Effect {
    let target = cx.ctx.active_block_id(cx.surface);

    if let Some(source) = cx.ctx.state.connect_source().cloned() {
        return match complete_connect_blocks(
            Some(source.as_str()),
            target.as_ref().map(BlockId::as_str),
        ) {
            Ok(Connection {
                source_id,
                target_id,
            }) => {
                finish(cx);
                Effect::Emit(EditorEvent::ConnectBlocks {
                    source_id,
                    target_id,
                })
            }
            Err(error) => reject(cx, error),
        };
    }

    match start_connect_blocks(target.as_ref().map(BlockId::as_str)) {
        Ok(source_id) => {
            let source_node = cx.ctx.active_element(cx.surface);
            cx.ctx.enter_interaction(
                cx.surface,
                Interaction::ConnectToBlock {
                    source_id,
                    source_node,
                },
            );
            cx.ctx.cmd_id = CONNECT_BLOCK;
            Effect::None
        }
        Err(error) => {
            cx.ctx.set_cmd_default();
            reject(cx, error)
        }
    }
}

fn action_toggle_select(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    if let Some(id) = cx.ctx.active_block_id(cx.surface) {
        cx.ctx.toggle_selected(cx.surface, id);
    }
    Effect::None
}

fn action_diagram(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    let mode = cx.ctx.toggle_mode(cx.surface, Mode::Diagram);
    Effect::Emit(EditorEvent::DiagramToggled {
        block_id: cx.ctx.active_block_id(cx.surface),
        enabled: mode == Mode::Diagram,
    })
}

fn action_chat(cx: &mut CommandContext<'_>) -> Effect {
    cx.ctx.set_cmd_default();
    let mode = cx.ctx.toggle_mode(cx.surface, Mode::Chat);
    Effect::Emit(EditorEvent::ChatToggled {
        block_id: cx.ctx.active_block_id(cx.surface),
        enabled: mode == Mode::Chat,
    })
}

/// Hotkey path of button-only commands.
fn action_rearm(cx: &mut CommandContext<'_>) -> Effect {
    rearm(cx);
    Effect::None
}

fn action_open_hotkey_editor(_cx: &mut CommandContext<'_>) -> Effect {
    Effect::Popup {
        kind: PopupKind::HotkeyEditor,
        block_id: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::context::Context;
    use crate::surface::{Marker, NodeArena};

    /// root
    /// └── b1
    ///     ├── b2
    ///     ├── b3
    ///     └── link*l1 -> b9
    ///         └── b9
    fn arena() -> (NodeArena, [NodeId; 5]) {
        let mut arena = NodeArena::new();
        let root = arena.root();
        let b1 = arena.add_block(root, "w*b1");
        let b2 = arena.add_block(b1, "w*b2");
        let b3 = arena.add_block(b1, "w*b3");
        let l1 = arena.add_link(b1, "link*l1", "b9");
        let b9 = arena.add_block(l1, "lw*b9");
        (arena, [b1, b2, b3, l1, b9])
    }

    fn run(id: &str, ctx: &mut Context, arena: &mut NodeArena) -> Effect {
        let command = definitions().into_iter().find(|c| c.id == *id).unwrap();
        let mut cx = CommandContext {
            ctx,
            surface: arena,
        };
        command.run(&mut cx)
    }

    #[test]
    fn ids_are_unique() {
        let defs = definitions();
        let ids: HashSet<_> = defs.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), defs.len());
    }

    #[test]
    fn every_default_hotkey_parses() {
        for command in definitions() {
            if let Some(hotkey) = command.hotkey {
                assert!(
                    hotkey.parse::<crate::keymap::KeyCombo>().is_ok(),
                    "{} has invalid hotkey {hotkey}",
                    command.id
                );
            }
        }
    }

    #[test]
    fn open_block_through_link_carries_link_chain() {
        let (mut arena, [.., b9]) = arena();
        arena.set_hsl(b9, blocktree_api::Hsl(120.0, 0.5, 0.5));
        let mut ctx = Context::new();
        ctx.pointer_enter(&mut arena, b9);

        let effect = run("openBlock", &mut ctx, &mut arena);
        assert_eq!(
            effect,
            Effect::Navigate(NavIntent::Into {
                block_id: BlockId::new("b9"),
                parent_hsl: Some(blocktree_api::Hsl(120.0, 0.5, 0.5)),
                links: vec![PathLink {
                    link_id: BlockId::new("l1"),
                    link_source: BlockId::new("b9"),
                }],
            })
        );
    }

    #[test]
    fn cut_then_paste_moves_into_hovered_block() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();

        ctx.pointer_enter(&mut arena, b2);
        assert_eq!(run("cutBlock", &mut ctx, &mut arena), Effect::None);
        assert_eq!(ctx.mode(), Mode::CutBlock);
        assert_eq!(ctx.cmd_id, CUT_BLOCK);
        assert!(arena.has_marker(b2, Marker::Selected));

        ctx.pointer_enter(&mut arena, b3);
        let effect = run("pasteBlock", &mut ctx, &mut arena);
        assert_eq!(
            effect,
            Effect::Emit(EditorEvent::MoveBlock {
                block_id: BlockId::new("b2"),
                old_parent_id: BlockId::new("b1"),
                new_parent_id: BlockId::new("b3"),
                before: None,
            })
        );
        assert_eq!(ctx.mode(), Mode::Normal);
        assert!(!arena.has_marker(b2, Marker::Selected));
        assert!(arena.indicators().is_empty());
    }

    #[test]
    fn cutting_the_root_block_is_rejected() {
        let (mut arena, [b1, ..]) = arena();
        let mut ctx = Context::new();
        ctx.pointer_enter(&mut arena, b1);

        let effect = run("cutBlock", &mut ctx, &mut arena);
        assert_eq!(effect, Effect::notice(SelectionError::RootNotCuttable));
        assert_eq!(ctx.mode(), Mode::Normal);
        assert_eq!(ctx.cmd_id, OPEN_BLOCK);
    }

    #[test]
    fn pasting_onto_the_cut_block_keeps_the_cut() {
        let (mut arena, [_, b2, ..]) = arena();
        let mut ctx = Context::new();
        ctx.pointer_enter(&mut arena, b2);
        run("cutBlock", &mut ctx, &mut arena);

        let effect = run("pasteBlock", &mut ctx, &mut arena);
        assert_eq!(effect, Effect::notice(SelectionError::SelfMove));
        assert_eq!(ctx.mode(), Mode::CutBlock);
    }

    #[test]
    fn bulk_cut_emits_one_request_and_clears_selection() {
        let (mut arena, [b1, b2, b3, ..]) = arena();
        let mut ctx = Context::new();
        ctx.toggle_selected(&mut arena, BlockId::new("b2"));
        ctx.toggle_selected(&mut arena, BlockId::new("b3"));

        run("cutBlock", &mut ctx, &mut arena);
        assert!(!ctx.has_multi_selection());
        assert_eq!(ctx.state.cut().map(<[_]>::len), Some(2));
        assert!(arena.has_marker(b2, Marker::Selected));
        assert!(arena.has_marker(b3, Marker::Selected));

        ctx.pointer_enter(&mut arena, b1);
        let Effect::Emit(EditorEvent::MoveBlocks { moves }) = run("cutBlock", &mut ctx, &mut arena)
        else {
            panic!("expected a bulk move");
        };
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|m| m.new_parent_id == BlockId::new("b1")));
        assert_eq!(ctx.mode(), Mode::Normal);
    }

    #[test]
    fn paste_link_creates_links() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();
        ctx.pointer_enter(&mut arena, b2);
        run("cutBlock", &mut ctx, &mut arena);
        ctx.pointer_enter(&mut arena, b3);

        assert_eq!(
            run("pasteLink", &mut ctx, &mut arena),
            Effect::Batch(vec![Effect::Emit(EditorEvent::CreateLink {
                block_id: BlockId::new("b2"),
                new_parent_id: BlockId::new("b3"),
                before: None,
            })])
        );
    }

    #[test]
    fn connect_picks_source_then_target() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();

        ctx.pointer_enter(&mut arena, b2);
        run("connectBlock", &mut ctx, &mut arena);
        assert_eq!(ctx.mode(), Mode::ConnectToBlock);
        assert_eq!(ctx.state.connect_source(), Some(&BlockId::new("b2")));

        let effect = run("connectBlock", &mut ctx, &mut arena);
        assert_eq!(effect, Effect::notice(SelectionError::SelfConnection));
        assert_eq!(ctx.mode(), Mode::ConnectToBlock);

        ctx.pointer_enter(&mut arena, b3);
        let effect = run("connectBlock", &mut ctx, &mut arena);
        assert_eq!(
            effect,
            Effect::Emit(EditorEvent::ConnectBlocks {
                source_id: BlockId::new("b2"),
                target_id: BlockId::new("b3"),
            })
        );
        assert_eq!(ctx.mode(), Mode::Normal);
        assert!(!arena.has_marker(b2, Marker::Selected));
    }

    #[test]
    fn copy_and_delete_branch_on_multi_selection() {
        let (mut arena, [_, b2, ..]) = arena();
        let mut ctx = Context::new();

        ctx.pointer_enter(&mut arena, b2);
        assert_eq!(
            run("copyBlock", &mut ctx, &mut arena),
            Effect::Emit(EditorEvent::CopyBlocks {
                block_ids: vec![BlockId::new("b2")]
            })
        );

        ctx.toggle_selected(&mut arena, BlockId::new("b2"));
        ctx.toggle_selected(&mut arena, BlockId::new("b3"));
        assert_eq!(
            run("deleteBlock", &mut ctx, &mut arena),
            Effect::Emit(EditorEvent::DeleteTreeBlocks {
                block_ids: vec![BlockId::new("b2"), BlockId::new("b3")]
            })
        );
        assert!(!ctx.has_multi_selection());
        assert!(!arena.has_marker(b2, Marker::Selected));
    }

    #[test]
    fn deleting_the_root_block_is_rejected() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();
        assert_eq!(
            run("deleteBlock", &mut ctx, &mut arena),
            Effect::notice("Cannot delete the root block")
        );
    }

    #[test]
    fn arrow_navigation_walks_the_tree() {
        let (mut arena, [b1, b2, b3, l1, b9]) = arena();
        let mut ctx = Context::new();

        run("navRight", &mut ctx, &mut arena);
        assert_eq!(ctx.state.active_block, Some(b2));
        run("navDown", &mut ctx, &mut arena);
        assert_eq!(ctx.state.active_block, Some(b3));
        run("navDown", &mut ctx, &mut arena);
        assert_eq!(ctx.state.active_block, Some(b9));
        assert_eq!(ctx.state.active_link, Some(l1));
        run("navLeft", &mut ctx, &mut arena);
        assert_eq!(ctx.state.active_block, Some(b1));
        assert_eq!(ctx.cmd_id, OPEN_BLOCK);
    }

    #[test]
    fn diagram_toggles_on_and_off() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();

        let on = run("diagram", &mut ctx, &mut arena);
        assert!(matches!(on, Effect::Emit(EditorEvent::DiagramToggled { enabled: true, .. })));
        assert_eq!(ctx.mode(), Mode::Diagram);

        let off = run("diagram", &mut ctx, &mut arena);
        assert!(matches!(off, Effect::Emit(EditorEvent::DiagramToggled { enabled: false, .. })));
        assert_eq!(ctx.mode(), Mode::Normal);
    }

    #[test]
    fn hotkey_editor_opens_only_from_the_button() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();
        let command = definitions()
            .into_iter()
            .find(|c| c.id == CommandId("editHotkeys"))
            .unwrap();

        assert_eq!(run("editHotkeys", &mut ctx, &mut arena), Effect::None);
        let effect = ctx.set_cmd_command(&command, &mut arena);
        assert_eq!(
            effect,
            Effect::Popup {
                kind: PopupKind::HotkeyEditor,
                block_id: None
            }
        );
        assert_eq!(ctx.active_button, Some(CommandId("editHotkeys")));
    }
}
