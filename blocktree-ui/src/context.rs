//! The mutable session object: mode, active element, in-flight operation,
//! multi-selection and popup.
//!
//! The context never owns nodes. It holds [`NodeId`]s into the renderer's
//! [`Surface`] and takes the surface by reference whenever it needs to read
//! or mark them.

use blocktree_api::{BlockId, Mode};
use indexmap::IndexSet;

use crate::commands::{Command, CommandContext, CommandId, Effect};
use crate::constants::DEFAULT_COMMAND;
use crate::keymap::KeyCombo;
use crate::mode::{self, Interaction, SelectionState};
use crate::popup::Popup;
use crate::selection::extract_block_id;
use crate::surface::{ElementInfo, Marker, NodeId, NodeKind, Surface};

/// The raw input that last reached the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyCombo),
    Click,
    Button(CommandId),
    Pointer(NodeId),
}

pub struct Context {
    pub state: SelectionState,
    /// The armed command: what a click dispatches, and what toggle-to-self
    /// compares against.
    pub cmd_id: CommandId,
    default_cmd: CommandId,
    selection: IndexSet<BlockId>,
    active_popup: Option<Box<dyn Popup>>,
    pub active_button: Option<CommandId>,
    pub last_input: Option<InputEvent>,
    /// Block to focus after the next re-render.
    pub pending_focus: Option<BlockId>,
    /// Cut-mode drop indicator currently in the surface.
    indicator: Option<NodeId>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_default_command(CommandId(DEFAULT_COMMAND))
    }

    pub fn with_default_command(default_cmd: CommandId) -> Self {
        Self {
            state: SelectionState::default(),
            cmd_id: default_cmd,
            default_cmd,
            selection: IndexSet::new(),
            active_popup: None,
            active_button: None,
            last_input: None,
            pending_focus: None,
            indicator: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn default_command(&self) -> CommandId {
        self.default_cmd
    }

    // =========================================================================
    // Armed command
    // =========================================================================

    /// Arm `id`. Arming the command that is already armed arms the default
    /// instead.
    pub fn set_cmd(&mut self, id: CommandId) -> CommandId {
        self.cmd_id = if self.cmd_id == id { self.default_cmd } else { id };
        self.cmd_id
    }

    pub fn set_cmd_default(&mut self) {
        self.cmd_id = self.default_cmd;
    }

    /// Arm a command chosen from its button, running its button entry point.
    pub fn set_cmd_command(&mut self, command: &Command, surface: &mut dyn Surface) -> Effect {
        self.set_cmd(command.id);
        self.active_button = Some(command.id);
        let mut cx = CommandContext { ctx: self, surface };
        command.run_alt(&mut cx).unwrap_or_default()
    }

    // =========================================================================
    // Active element
    // =========================================================================

    /// Replace the active block and link, moving the `Active` marker.
    pub fn set_active_element(
        &mut self,
        surface: &mut dyn Surface,
        block: Option<NodeId>,
        link: Option<NodeId>,
    ) {
        for node in [self.state.active_block, self.state.active_link].into_iter().flatten() {
            surface.set_marker(node, Marker::Active, false);
        }
        for node in [block, link].into_iter().flatten() {
            surface.set_marker(node, Marker::Active, true);
        }

        let block_info = block.and_then(|b| surface.element(b));
        let link_info = link.and_then(|l| surface.element(l));
        self.state.active_block = block;
        self.state.active_link = link;
        self.state.block_id = extract_block_id(block_info.as_ref(), link_info.as_ref());
    }

    /// Make the block at or above `node` active. False if there is none.
    pub fn focus(&mut self, surface: &mut dyn Surface, node: NodeId) -> bool {
        let Some(block) = surface.closest_block(node) else {
            return false;
        };
        let link = surface.link_of(block);
        self.set_active_element(surface, Some(block), link);
        true
    }

    /// The link, else the block, else the implicit root block.
    pub fn active_element(&self, surface: &dyn Surface) -> Option<NodeId> {
        self.state
            .active_link
            .or(self.state.active_block)
            .or_else(|| surface.first_root_child())
    }

    /// The block the active element stands for; a link resolves to its target.
    pub fn active_block_id(&self, surface: &dyn Surface) -> Option<BlockId> {
        if let Some(id) = &self.state.block_id {
            return Some(id.clone());
        }
        let root = surface.first_root_child()?;
        extract_block_id(surface.element(root).as_ref(), None)
    }

    pub fn active_element_info(&self, surface: &dyn Surface) -> Option<ElementInfo> {
        surface.element(self.active_element(surface)?)
    }

    // =========================================================================
    // Pointer tracking
    // =========================================================================

    pub fn pointer_enter(&mut self, surface: &mut dyn Surface, node: NodeId) {
        self.last_input = Some(InputEvent::Pointer(node));

        if let Some(NodeKind::Indicator { before }) = surface.kind(node).cloned() {
            self.hover_indicator(surface, before);
            return;
        }
        if self.focus(surface, node) && self.mode() == Mode::CutBlock {
            self.hover_drop_target(surface);
        }
    }

    /// Drop the destination guess when the pointer leaves the drop target,
    /// unless it moved onto the indicator.
    pub fn pointer_leave(
        &mut self,
        surface: &mut dyn Surface,
        node: NodeId,
        related: Option<NodeId>,
    ) {
        let Some(indicator) = self.indicator else {
            return;
        };
        if related == Some(indicator) {
            return;
        }
        let leaving_target =
            node == indicator || surface.closest_block(node) == self.state.active_block;
        if !leaving_target {
            return;
        }

        self.remove_indicator(surface);
        if let Interaction::CutBlock { cut, .. } = &mut self.state.interaction {
            for payload in cut {
                payload.new_parent_id = None;
                payload.before = None;
            }
        }
    }

    /// Pointer is over the indicator: drop into `before`'s parent, just
    /// before it.
    fn hover_indicator(&mut self, surface: &dyn Surface, before: NodeId) {
        let new_parent = surface
            .parent(before)
            .and_then(|p| surface.closest_block(p))
            .and_then(|p| surface.dom_id(p))
            .map(BlockId::from_dom_id);
        let before_id = surface.dom_id(before).map(BlockId::from_dom_id);

        if let Interaction::CutBlock { cut, .. } = &mut self.state.interaction {
            for payload in cut {
                payload.new_parent_id = new_parent.clone();
                payload.before = before_id.clone();
            }
        }
    }

    /// Pointer is over a block while cutting: it becomes the new parent,
    /// with an indicator placed before it.
    fn hover_drop_target(&mut self, surface: &mut dyn Surface) {
        let Some(block) = self.state.active_block else {
            return;
        };
        let Some(candidate) = self.state.block_id.clone() else {
            return;
        };
        let target = self.state.active_link.unwrap_or(block);

        let Interaction::CutBlock { cut, source_nodes } = &self.state.interaction else {
            return;
        };
        let is_source = source_nodes.contains(&block)
            || source_nodes.contains(&target)
            || cut.iter().any(|p| p.block_id == candidate);
        if is_source {
            return;
        }

        self.remove_indicator(surface);
        if surface.parent(target) != Some(surface.root()) {
            self.indicator = surface.insert_indicator_before(target);
        }
        if let Interaction::CutBlock { cut, .. } = &mut self.state.interaction {
            for payload in cut {
                payload.new_parent_id = Some(candidate.clone());
                payload.before = None;
            }
        }
    }

    fn remove_indicator(&mut self, surface: &mut dyn Surface) {
        if let Some(indicator) = self.indicator.take() {
            surface.remove(indicator);
        }
    }

    pub fn indicator(&self) -> Option<NodeId> {
        self.indicator
    }

    // =========================================================================
    // Modes
    // =========================================================================

    /// Enter an interaction, highlighting its source elements.
    pub fn enter_interaction(&mut self, surface: &mut dyn Surface, interaction: Interaction) {
        for node in interaction.source_nodes() {
            surface.set_marker(node, Marker::Selected, true);
        }
        tracing::debug!(from = %self.mode(), to = %interaction.mode(), "mode change");
        self.state.interaction = interaction;
    }

    /// Toggle a payload-free mode; returns the resulting mode.
    pub fn toggle_mode(&mut self, surface: &mut dyn Surface, target: Mode) -> Mode {
        let toggle = mode::toggle_mode(self.mode(), target);
        let Some(interaction) = Interaction::plain(toggle.mode) else {
            tracing::debug!(%target, "mode carries a payload and cannot be toggled");
            return self.mode();
        };
        if !toggle.mode.owns_popup() {
            self.cancel_popup();
        }
        self.clear_sources(surface);
        self.enter_interaction(surface, interaction);
        toggle.mode
    }

    fn clear_sources(&mut self, surface: &mut dyn Surface) {
        self.remove_indicator(surface);
        for node in self.state.interaction.source_nodes() {
            surface.set_marker(node, Marker::Selected, false);
        }
    }

    /// Remove every visual trace of the active element and in-flight
    /// operation, then reset to `Normal`.
    pub fn clear_selection(&mut self, surface: &mut dyn Surface) {
        self.cancel_popup();
        self.clear_sources(surface);
        for node in [self.state.active_block, self.state.active_link].into_iter().flatten() {
            surface.set_marker(node, Marker::Active, false);
        }
        self.state = mode::clear_selection(std::mem::take(&mut self.state));
    }

    // =========================================================================
    // Multi-selection
    // =========================================================================

    /// Add or remove a block; returns whether it is now selected.
    pub fn toggle_selected(&mut self, surface: &mut dyn Surface, id: BlockId) -> bool {
        let selected = if self.selection.shift_remove(&id) {
            false
        } else {
            self.selection.insert(id.clone());
            true
        };
        if let Some(node) = surface.find_block(&id) {
            surface.set_marker(node, Marker::Selected, selected);
        }
        selected
    }

    pub fn has_multi_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Selected ids in selection order.
    pub fn selected_block_ids(&self) -> Vec<BlockId> {
        self.selection.iter().cloned().collect()
    }

    pub fn clear_multi_selection(&mut self, surface: &mut dyn Surface) {
        for id in self.selection.drain(..) {
            if let Some(node) = surface.find_block(&id) {
                surface.set_marker(node, Marker::Selected, false);
            }
        }
    }

    // =========================================================================
    // Popups
    // =========================================================================

    pub fn has_popup(&self) -> bool {
        self.active_popup.is_some()
    }

    /// Make `popup` the active one, cancelling any previous popup.
    pub fn open_popup(&mut self, surface: &mut dyn Surface, popup: Box<dyn Popup>) {
        if !self.mode().owns_popup() {
            self.clear_selection(surface);
            self.enter_interaction(surface, Interaction::TextEdit);
        }
        self.cancel_popup();
        self.active_popup = Some(popup);
    }

    /// Submit the active popup, then reset to `Normal` whether or not one was open.
    pub fn submit_popup(&mut self, surface: &mut dyn Surface) {
        if let Some(mut popup) = self.active_popup.take() {
            popup.handle_submit();
        }
        self.finish_popup(surface);
    }

    /// Cancel the active popup, then reset to `Normal` whether or not one was open.
    pub fn close_popups(&mut self, surface: &mut dyn Surface) {
        self.cancel_popup();
        self.finish_popup(surface);
    }

    fn cancel_popup(&mut self) {
        if let Some(mut popup) = self.active_popup.take() {
            popup.handle_cancel();
        }
    }

    fn finish_popup(&mut self, surface: &mut dyn Surface) {
        match self.state.interaction {
            Interaction::CutBlock { .. } | Interaction::ConnectToBlock { .. } => {
                self.clear_selection(surface);
            }
            _ => self.state.interaction = Interaction::Normal,
        }
        self.active_button = None;
        self.set_cmd_default();
    }

    // =========================================================================
    // Re-render
    // =========================================================================

    /// The renderer finished drawing: focus `active_id`, else the pending
    /// focus, else the implicit root block.
    pub fn on_showed_blocks(
        &mut self,
        surface: &mut dyn Surface,
        active_id: Option<BlockId>,
    ) -> Option<NodeId> {
        let pending = self.pending_focus.take();
        let node = active_id
            .or(pending)
            .and_then(|id| surface.find_block(&id))
            .or_else(|| surface.first_root_child())?;
        self.focus(surface, node).then_some(node)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::selection::CutPayload;
    use crate::surface::NodeArena;

    struct Counting {
        submits: Arc<AtomicUsize>,
        cancels: Arc<AtomicUsize>,
    }

    impl Popup for Counting {
        fn handle_submit(&mut self) {
            self.submits.fetch_add(1, Ordering::SeqCst);
        }

        fn handle_cancel(&mut self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (Box<Counting>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let submits = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));
        let popup = Box::new(Counting {
            submits: submits.clone(),
            cancels: cancels.clone(),
        });
        (popup, submits, cancels)
    }

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

    fn cutting(ctx: &mut Context, arena: &mut NodeArena, source: NodeId) {
        let payload = CutPayload {
            block_id: BlockId::new("b2"),
            old_parent_id: BlockId::new("b1"),
            new_parent_id: None,
            before: None,
        };
        ctx.enter_interaction(
            arena,
            Interaction::CutBlock {
                cut: vec![payload],
                source_nodes: vec![source],
            },
        );
    }

    #[test]
    fn set_cmd_toggles_back_to_default() {
        let mut ctx = Context::new();
        assert_eq!(ctx.set_cmd(CommandId("cutBlock")), CommandId("cutBlock"));
        assert_eq!(ctx.set_cmd(CommandId("cutBlock")), CommandId(DEFAULT_COMMAND));
        assert_eq!(ctx.set_cmd(CommandId("copyBlock")), CommandId("copyBlock"));
    }

    #[test]
    fn pointer_enter_moves_active_marker() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();

        ctx.pointer_enter(&mut arena, b2);
        assert!(arena.has_marker(b2, Marker::Active));
        ctx.pointer_enter(&mut arena, b3);
        assert!(!arena.has_marker(b2, Marker::Active));
        assert!(arena.has_marker(b3, Marker::Active));
        assert_eq!(ctx.state.block_id, Some(BlockId::new("b3")));
    }

    #[test]
    fn pointer_enter_records_link_wrapper() {
        let (mut arena, [.., l1, b9]) = arena();
        let mut ctx = Context::new();

        ctx.pointer_enter(&mut arena, b9);
        assert_eq!(ctx.state.active_block, Some(b9));
        assert_eq!(ctx.state.active_link, Some(l1));
        assert_eq!(ctx.active_element(&arena), Some(l1));
        assert_eq!(ctx.active_block_id(&arena), Some(BlockId::new("b9")));
    }

    #[test]
    fn active_element_falls_back_to_root_block() {
        let (arena, [b1, ..]) = arena();
        let ctx = Context::new();
        assert_eq!(ctx.active_element(&arena), Some(b1));
        assert_eq!(ctx.active_block_id(&arena), Some(BlockId::new("b1")));
    }

    #[test]
    fn cut_hover_places_indicator_and_sets_parent() {
        let (mut arena, [b1, b2, b3, ..]) = arena();
        let mut ctx = Context::new();
        cutting(&mut ctx, &mut arena, b2);

        ctx.pointer_enter(&mut arena, b3);
        let indicator = ctx.indicator().unwrap();
        assert_eq!(&arena.children(b1)[1..3], &[indicator, b3]);
        let cut = &ctx.state.cut().unwrap()[0];
        assert_eq!(cut.new_parent_id, Some(BlockId::new("b3")));
        assert_eq!(cut.before, None);

        ctx.pointer_leave(&mut arena, b3, Some(indicator));
        assert_eq!(ctx.indicator(), Some(indicator));

        ctx.pointer_enter(&mut arena, indicator);
        let cut = &ctx.state.cut().unwrap()[0];
        assert_eq!(cut.new_parent_id, Some(BlockId::new("b1")));
        assert_eq!(cut.before, Some(BlockId::new("b3")));
    }

    #[test]
    fn cut_leave_clears_destination_but_keeps_payload() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();
        cutting(&mut ctx, &mut arena, b2);

        ctx.pointer_enter(&mut arena, b3);
        ctx.pointer_leave(&mut arena, b3, None);

        assert!(arena.indicators().is_empty());
        let cut = &ctx.state.cut().unwrap()[0];
        assert_eq!(cut.block_id, BlockId::new("b2"));
        assert_eq!(cut.new_parent_id, None);
        assert_eq!(ctx.mode(), Mode::CutBlock);
    }

    #[test]
    fn hovering_the_cut_block_is_not_a_target() {
        let (mut arena, [_, b2, ..]) = arena();
        let mut ctx = Context::new();
        cutting(&mut ctx, &mut arena, b2);

        ctx.pointer_enter(&mut arena, b2);
        assert!(ctx.indicator().is_none());
        assert_eq!(ctx.state.cut().unwrap()[0].new_parent_id, None);
    }

    #[test]
    fn clear_selection_removes_markers_and_indicator() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();
        cutting(&mut ctx, &mut arena, b2);
        ctx.pointer_enter(&mut arena, b3);
        assert!(arena.has_marker(b2, Marker::Selected));

        ctx.clear_selection(&mut arena);
        assert!(!arena.has_marker(b2, Marker::Selected));
        assert!(!arena.has_marker(b3, Marker::Active));
        assert!(arena.indicators().is_empty());
        assert_eq!(ctx.mode(), Mode::Normal);
        assert!(ctx.state.cut().is_none());
    }

    #[test]
    fn multi_selection_toggles_markers() {
        let (mut arena, [_, b2, b3, ..]) = arena();
        let mut ctx = Context::new();

        assert!(ctx.toggle_selected(&mut arena, BlockId::new("b2")));
        assert!(ctx.toggle_selected(&mut arena, BlockId::new("b3")));
        assert!(!ctx.toggle_selected(&mut arena, BlockId::new("b2")));
        assert_eq!(ctx.selected_block_ids(), vec![BlockId::new("b3")]);
        assert!(!arena.has_marker(b2, Marker::Selected));

        ctx.clear_multi_selection(&mut arena);
        assert!(!ctx.has_multi_selection());
        assert!(!arena.has_marker(b3, Marker::Selected));
    }

    #[test]
    fn opening_a_popup_cancels_the_previous_one() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();
        let (first, _, first_cancels) = counting();
        let (second, second_submits, _) = counting();

        ctx.open_popup(&mut arena, first);
        assert_eq!(ctx.mode(), Mode::TextEdit);
        ctx.open_popup(&mut arena, second);
        assert_eq!(first_cancels.load(Ordering::SeqCst), 1);

        ctx.submit_popup(&mut arena);
        assert_eq!(second_submits.load(Ordering::SeqCst), 1);
        assert!(!ctx.has_popup());
        assert_eq!(ctx.mode(), Mode::Normal);
    }

    #[test]
    fn close_popups_resets_even_without_popup() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();
        ctx.toggle_mode(&mut arena, Mode::Chat);
        ctx.close_popups(&mut arena);
        assert_eq!(ctx.mode(), Mode::Normal);
    }

    #[test]
    fn toggling_off_a_popup_mode_cancels_its_popup() {
        let (mut arena, _) = arena();
        let mut ctx = Context::new();
        let (popup, _, cancels) = counting();

        ctx.toggle_mode(&mut arena, Mode::Chat);
        ctx.open_popup(&mut arena, popup);
        assert_eq!(ctx.mode(), Mode::Chat);

        assert_eq!(ctx.toggle_mode(&mut arena, Mode::Chat), Mode::Normal);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!ctx.has_popup());
    }

    #[test]
    fn showed_blocks_prefers_explicit_then_pending_focus() {
        let (mut arena, [b1, b2, b3, ..]) = arena();
        let mut ctx = Context::new();

        ctx.pending_focus = Some(BlockId::new("b3"));
        assert_eq!(ctx.on_showed_blocks(&mut arena, Some(BlockId::new("b2"))), Some(b2));
        assert!(ctx.pending_focus.is_none());

        ctx.pending_focus = Some(BlockId::new("b3"));
        assert_eq!(ctx.on_showed_blocks(&mut arena, None), Some(b3));
        assert_eq!(ctx.on_showed_blocks(&mut arena, None), Some(b1));
    }
}
